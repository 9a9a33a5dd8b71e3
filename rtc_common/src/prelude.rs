//! Prelude module for common re-exports.
//!
//! ```rust
//! use rtc_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, ManagerConfig, SharedConfig};

// ─── Component contract ─────────────────────────────────────────────
pub use crate::component::{
    Component, ComponentBase, ComponentError, ComponentFactory, ExecContextId,
};
pub use crate::lifecycle::LifeCycleState;
pub use crate::profile::{ModuleProfile, Properties};

// ─── Data & ports ───────────────────────────────────────────────────
pub use crate::conf::{ConfigAdmin, Param};
pub use crate::data::{DataType, Time, TimedLong, TimedShortSeq, TimedVelocity2D, Velocity2D};
pub use crate::port::{InPort, OutPort, PortDirection, PortError};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_BUFFER_LENGTH, DEFAULT_CONFIG_SET, DEFAULT_EXEC_RATE_HZ};
