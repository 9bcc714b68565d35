//! Per-client link addresses.

const CLIENT_PREFIX: &str = "$mqtt.to.";
const PUBREL_PREFIX: &str = "$mqtt.";
const PUBREL_SUFFIX: &str = ".pubrel";

/// Address of the outbound link that delivers messages to `client_id`.
pub fn client_address(client_id: &str) -> String {
    format!("{CLIENT_PREFIX}{client_id}")
}

/// Address of the inbound link carrying `client_id`'s QoS 2 PUBREL messages.
pub fn pubrel_address(client_id: &str) -> String {
    format!("{PUBREL_PREFIX}{client_id}{PUBREL_SUFFIX}")
}

/// Inverse of [`pubrel_address`].
pub fn client_id_from_pubrel_address(address: &str) -> Option<&str> {
    address
        .strip_prefix(PUBREL_PREFIX)
        .and_then(|rest| rest.strip_suffix(PUBREL_SUFFIX))
        .filter(|id| !id.is_empty())
}
