//! Layered configuration: an optional `config/default.*` file, then
//! `BROKER__`-prefixed environment variables, merged onto defaults.

mod settings;

use config::{Config, Environment, File};

use crate::utils::Result;
use settings::PartialSettings;

pub use settings::{
    BrokerSettings, ConnectionSettings, LoggingSettings, Settings, UnknownUnsubscribePolicy,
    UnroutedPolicy,
};

/// Default configuration file, relative to the working directory, without extension.
pub const DEFAULT_CONFIG_FILE: &str = "config/default";

/// Loads the configuration from the default file and environment variables.
pub fn load_config() -> Result<Settings> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Loads the configuration from `path` (extension optional) and environment variables.
pub fn load_config_from(path: &str) -> Result<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("BROKER")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("broker.topics")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}

#[cfg(test)]
mod tests;
