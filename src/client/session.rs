use crate::transport::{LinkReceiver, LinkSender};

/// Links owned on behalf of one MQTT client.
///
/// Both links are filled lazily; the registry opens each the first time it
/// is needed.
pub struct ClientSession {
    /// Client identifier as given in the subscribe request.
    pub id: String,

    /// Outbound link to `$mqtt.to.<id>`.
    pub sender: Option<Box<dyn LinkSender>>,

    /// Inbound link from `$mqtt.<id>.pubrel`.
    pub pubrel_receiver: Option<Box<dyn LinkReceiver>>,
}

impl ClientSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: None,
            pubrel_receiver: None,
        }
    }

    pub fn link_count(&self) -> usize {
        usize::from(self.sender.is_some()) + usize::from(self.pubrel_receiver.is_some())
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("sender", &self.sender.as_ref().map(|s| s.address().to_string()))
            .field(
                "pubrel_receiver",
                &self.pubrel_receiver.as_ref().map(|r| r.address().to_string()),
            )
            .finish()
    }
}
