//! Manager configuration loading tests.
//!
//! Covers file discovery errors, section defaults, unknown field rejection,
//! port path validation and the sample `rtc.toml` shipped with the manager.

use rtc_common::config::{ConfigError, ConfigLoader, LogLevel, ManagerConfig};
use rtc_common::consts::{DEFAULT_CONFIG_SET, DEFAULT_EXEC_RATE_HZ, MANAGER_SERVICE_NAME};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("rtc.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = ManagerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(err, ConfigError::FileNotFound);
}

#[test]
fn empty_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "");
    let config = ManagerConfig::load(&path).unwrap();

    assert_eq!(config.shared.service_name, MANAGER_SERVICE_NAME);
    assert_eq!(config.shared.log_level, LogLevel::Info);
    assert_eq!(config.exec_cxt.rate, DEFAULT_EXEC_RATE_HZ);
    assert!(config.components.is_empty());
    assert!(config.connections.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn component_defaults_applied() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[components]]
implementation_id = "RobotControllerTest"
"#,
    );
    let config = ManagerConfig::load(&path).unwrap();
    let comp = &config.components[0];
    assert!(comp.activate);
    assert_eq!(comp.active_set, DEFAULT_CONFIG_SET);
    assert!(comp.conf.is_empty());
}

#[test]
fn unknown_fields_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[exec_cxt]
rate = 10.0
priority = 99
"#,
    );
    assert!(matches!(
        ManagerConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn invalid_toml_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "[shared\nservice_name = ");
    assert!(matches!(
        ManagerConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn validation_catches_bad_rate_and_paths() {
    let dir = TempDir::new().unwrap();

    let path = write_config(dir.path(), "[exec_cxt]\nrate = 0.0\n");
    let config = ManagerConfig::load(&path).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(_))
    ));

    let path = write_config(
        dir.path(),
        r#"
[[connections]]
from = "RobotControllerTest0"
to = "Sink0.vel"
"#,
    );
    let config = ManagerConfig::load(&path).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn sample_manager_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../rtc_manager/config/rtc.toml");
    let config = ManagerConfig::load(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.exec_cxt.rate, 100.0);
    let comp = &config.components[0];
    assert_eq!(comp.implementation_id, "RobotControllerTest");
    assert_eq!(comp.active_set, "cautious");
    assert_eq!(comp.conf["cautious"]["speed_x"], "0.3");
    assert_eq!(comp.conf["fast"]["stop_d"], "20");
}
