//! Configuration loading traits and types.
//!
//! This module provides the TOML loading path shared by all RTC binaries and
//! the manager configuration (`rtc.toml`).
//!
//! # Usage
//!
//! ```rust,no_run
//! use rtc_common::config::{ConfigError, ConfigLoader, ManagerConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = ManagerConfig::load(Path::new("rtc.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_CONFIG_SET, DEFAULT_EXEC_RATE_HZ, MANAGER_SERVICE_NAME, MIN_EXEC_RATE_HZ,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading and configuration variables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// No configuration variable with this name.
    #[error("Unknown configuration variable: {0}")]
    UnknownParameter(String),

    /// No configuration set with this id.
    #[error("Unknown configuration set: {0}")]
    UnknownSet(String),

    /// Value cannot be converted to the variable's type.
    #[error("Invalid value '{value}' for '{name}'")]
    InvalidValue {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
    },

    /// Value is outside the declared constraint.
    #[error("Value '{value}' for '{name}' violates constraint '{constraint}'")]
    ConstraintViolation {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
        /// Constraint text
        constraint: String,
    },

    /// Bound variable type differs from the declared `__type__`.
    #[error("Type mismatch for '{name}': declared {declared}, bound {bound}")]
    TypeMismatch {
        /// Variable name
        name: String,
        /// Type from the module profile
        declared: String,
        /// Rust type of the bound variable
        bound: String,
    },
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn default_service_name() -> String {
    MANAGER_SERVICE_NAME.to_string()
}

/// Common configuration fields shared across all RTC binaries.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "rtcd-robot-01"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_rate() -> f64 {
    DEFAULT_EXEC_RATE_HZ
}

fn default_true() -> bool {
    true
}

fn default_set() -> String {
    DEFAULT_CONFIG_SET.to_string()
}

/// Execution context section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecContextConfig {
    /// Periodic execution rate in Hz.
    #[serde(default = "default_rate")]
    pub rate: f64,
}

impl Default for ExecContextConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
        }
    }
}

/// One component to create at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    /// Implementation id of a registered module.
    pub implementation_id: String,

    /// Activate the instance once the execution context starts.
    #[serde(default = "default_true")]
    pub activate: bool,

    /// Configuration set to activate.
    #[serde(default = "default_set")]
    pub active_set: String,

    /// Configuration sets: set id → variable name → value string.
    #[serde(default)]
    pub conf: BTreeMap<String, BTreeMap<String, String>>,
}

/// One port connection, `<instance>.<port>` on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// OutPort path
    pub from: String,
    /// InPort path
    pub to: String,
}

/// Manager configuration loaded from `rtc.toml`.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "rtcd"
///
/// [exec_cxt]
/// rate = 100.0
///
/// [[components]]
/// implementation_id = "RobotControllerTest"
/// active_set = "slow"
///
/// [components.conf.slow]
/// speed_x = "0.2"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Common fields.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Execution context settings.
    #[serde(default)]
    pub exec_cxt: ExecContextConfig,

    /// Components created at startup, in order.
    #[serde(default)]
    pub components: Vec<ComponentConfig>,

    /// Port connections established after creation.
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

impl ManagerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - the execution rate is not a finite positive number
    /// - a component has an empty implementation id
    /// - a connection path is not of the form `<instance>.<port>`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if !(self.exec_cxt.rate.is_finite() && self.exec_cxt.rate >= MIN_EXEC_RATE_HZ) {
            return Err(ConfigError::ValidationError(format!(
                "exec_cxt.rate must be >= {MIN_EXEC_RATE_HZ}, got {}",
                self.exec_cxt.rate
            )));
        }

        for (idx, comp) in self.components.iter().enumerate() {
            if comp.implementation_id.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "components[{idx}]: implementation_id cannot be empty"
                )));
            }
        }

        for conn in &self.connections {
            for path in [&conn.from, &conn.to] {
                if split_port_path(path).is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "invalid port path '{path}', expected <instance>.<port>"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Split `<instance>.<port>` at the last dot. Both halves must be non-empty.
pub fn split_port_path(path: &str) -> Option<(&str, &str)> {
    let (instance, port) = path.rsplit_once('.')?;
    if instance.is_empty() || port.is_empty() {
        return None;
    }
    Some((instance, port))
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
