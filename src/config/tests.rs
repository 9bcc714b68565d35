use super::*;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.connection.host, "127.0.0.1");
    assert_eq!(settings.connection.port, 5672);
    assert_eq!(settings.connection.container_id, "broker");
    assert_eq!(settings.broker.topics, vec!["my_topic", "will"]);
    assert_eq!(
        settings.broker.unknown_unsubscribe,
        UnknownUnsubscribePolicy::Error
    );
    assert_eq!(settings.broker.unrouted, UnroutedPolicy::Ignore);
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn load_config_without_sources_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let missing = tmp.path().join("absent");
    let cfg = load_config_from(missing.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [connection]
        host = "10.0.0.5"
        port = 5673

        [broker]
        topics = ["sensors", "alerts"]
        unknown_unsubscribe = "ignore"
        unrouted = "reject"
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config();
    env::set_current_dir(orig).expect("restore cwd");

    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.connection.host, "10.0.0.5");
    assert_eq!(cfg.connection.port, 5673);
    assert_eq!(cfg.connection.container_id, "broker");
    assert_eq!(cfg.broker.topics, vec!["sensors", "alerts"]);
    assert_eq!(
        cfg.broker.unknown_unsubscribe,
        UnknownUnsubscribePolicy::Ignore
    );
    assert_eq!(cfg.broker.unrouted, UnroutedPolicy::Reject);
    assert_eq!(cfg.logging.level, "info");
}

#[test]
#[serial]
fn environment_overrides_file_and_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("broker.toml");
    fs::write(&path, "[connection]\nport = 6000\n").expect("write config file");
    let base = tmp.path().join("broker");

    temp_env::with_vars(
        [
            ("BROKER__CONNECTION__PORT", Some("7000")),
            ("BROKER__BROKER__TOPICS", Some("a,b,c")),
            ("BROKER__LOGGING__LEVEL", Some("debug")),
        ],
        || {
            let cfg = load_config_from(base.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.connection.port, 7000);
            assert_eq!(cfg.broker.topics, vec!["a", "b", "c"]);
            assert_eq!(cfg.logging.level, "debug");
        },
    );
}
