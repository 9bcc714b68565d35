use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the AMQP connection, the routing engine and logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub broker: BrokerSettings,
    pub logging: LoggingSettings,
}

/// Where the already-established AMQP connection points to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub container_id: String,
}

/// Configuration settings for the routing engine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    /// Topics whose receivers are attached at startup.
    pub topics: Vec<String>,
    pub unknown_unsubscribe: UnknownUnsubscribePolicy,
    pub unrouted: UnroutedPolicy,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

/// What to do when an unsubscribe names a topic the client is not subscribed to.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownUnsubscribePolicy {
    /// Log, keep processing the other topics, then reply with `NotSubscribed`.
    #[default]
    Error,
    /// Log at debug and reply success.
    Ignore,
}

/// What to do with inbound deliveries whose subject is neither `publish` nor `pubrel`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnroutedPolicy {
    /// Leave the delivery unsettled; it is only counted.
    #[default]
    Ignore,
    Accept,
    Reject,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub connection: Option<PartialConnectionSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialConnectionSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub container_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub topics: Option<Vec<String>>,
    pub unknown_unsubscribe: Option<UnknownUnsubscribePolicy>,
    pub unrouted: Option<UnroutedPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings {
                host: "127.0.0.1".to_string(),
                port: 5672,
                container_id: "broker".to_string(),
            },
            broker: BrokerSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            topics: vec!["my_topic".to_string(), "will".to_string()],
            unknown_unsubscribe: UnknownUnsubscribePolicy::default(),
            unrouted: UnroutedPolicy::default(),
        }
    }
}

impl PartialSettings {
    /// Overlay the values present in `self` onto `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let connection = self.connection;
        let broker = self.broker;
        let logging = self.logging;

        Settings {
            connection: ConnectionSettings {
                host: connection
                    .as_ref()
                    .and_then(|c| c.host.clone())
                    .unwrap_or(defaults.connection.host),
                port: connection
                    .as_ref()
                    .and_then(|c| c.port)
                    .unwrap_or(defaults.connection.port),
                container_id: connection
                    .as_ref()
                    .and_then(|c| c.container_id.clone())
                    .unwrap_or(defaults.connection.container_id),
            },
            broker: BrokerSettings {
                topics: broker
                    .as_ref()
                    .and_then(|b| b.topics.clone())
                    .unwrap_or(defaults.broker.topics),
                unknown_unsubscribe: broker
                    .as_ref()
                    .and_then(|b| b.unknown_unsubscribe)
                    .unwrap_or(defaults.broker.unknown_unsubscribe),
                unrouted: broker
                    .as_ref()
                    .and_then(|b| b.unrouted)
                    .unwrap_or(defaults.broker.unrouted),
            },
            logging: LoggingSettings {
                level: logging
                    .as_ref()
                    .and_then(|l| l.level.clone())
                    .unwrap_or(defaults.logging.level),
            },
        }
    }
}
