//! Manager error types.

use rtc_common::component::ComponentError;
use rtc_common::config::ConfigError;
use rtc_common::lifecycle::LifeCycleState;
use rtc_common::port::PortError;
use rtc_common::profile::ProfileError;
use thiserror::Error;

/// Error types for manager operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManagerError {
    /// No factory registered under this implementation id
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// A factory with this implementation id already exists
    #[error("Module already registered: {0}")]
    AlreadyRegistered(String),

    /// `max_instance` live instances already exist
    #[error("Maximum instance count ({max}) reached for {implementation_id}")]
    MaxInstanceReached {
        /// Module id
        implementation_id: String,
        /// Declared limit
        max: u32,
    },

    /// No component instance with this name
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// Requested lifecycle transition is not legal from the current state
    #[error("Illegal transition for {name}: {from} -> {to}")]
    IllegalTransition {
        /// Instance name
        name: String,
        /// Current state
        from: LifeCycleState,
        /// Requested state
        to: LifeCycleState,
    },

    /// A component callback failed
    #[error("{name}: {source}")]
    Callback {
        /// Instance name
        name: String,
        /// Callback error
        source: ComponentError,
    },

    /// Invalid module profile
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Port error
    #[error(transparent)]
    Port(#[from] PortError),

    /// Execution context error
    #[error("Execution context: {0}")]
    ExecutionContext(String),
}
