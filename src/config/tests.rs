use super::load_config_from;
use super::settings::Settings;
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.server.max_connections, 1000);
    assert_eq!(settings.multiplexer.open_timeout(), Duration::from_secs(10));
    assert_eq!(settings.multiplexer.close_timeout(), Duration::from_secs(5));
    assert_eq!(settings.hub.channel_capacity, 256);
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");
    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn test_partial_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        port = 9000

        [multiplexer]
        open_timeout_ms = 250
    "#;
    fs::write(tmp.path().join("submux.toml"), toml).expect("write config file");

    let path = tmp.path().join("submux");
    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.multiplexer.open_timeout_ms, 250);
    assert_eq!(cfg.multiplexer.close_timeout_ms, 5_000);
    assert_eq!(cfg.hub.channel_capacity, 256);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [logging]
        level = "warn"
    "#;
    fs::write(tmp.path().join("submux.toml"), toml).expect("write config file");
    let path = tmp.path().join("submux");

    temp_env::with_vars(
        [
            ("SUBMUX__SERVER__PORT", Some("9100")),
            ("SUBMUX__HUB__CHANNEL_CAPACITY", Some("32")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.host, "0.0.0.0");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.hub.channel_capacity, 32);
            assert_eq!(cfg.logging.level, "warn");
        },
    );
}

#[test]
#[serial]
fn test_zero_max_connections_is_rejected() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    temp_env::with_var("SUBMUX__SERVER__MAX_CONNECTIONS", Some("0"), || {
        let err = load_config_from(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("max_connections"));
    });
}
