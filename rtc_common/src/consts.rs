//! System-wide constants.

/// Canonical manager service name (used for logging).
pub const MANAGER_SERVICE_NAME: &str = "rtcd";

/// Default execution rate of the periodic execution context in Hz.
pub const DEFAULT_EXEC_RATE_HZ: f64 = 1000.0;

/// Lowest accepted execution rate in Hz (one cycle per 1000 s).
pub const MIN_EXEC_RATE_HZ: f64 = 0.001;

/// Default InPort ring buffer length.
pub const DEFAULT_BUFFER_LENGTH: usize = 8;

/// Name of the configuration set created from `conf.default.*`.
pub const DEFAULT_CONFIG_SET: &str = "default";
