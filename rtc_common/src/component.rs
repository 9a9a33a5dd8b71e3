//! Component trait and error types.
//!
//! This module defines:
//! - `Component` trait - Lifecycle callbacks driven by the execution context
//! - `ComponentBase` - Framework bookkeeping (ports, configuration) handed to `on_initialize`
//! - `ComponentError` enum - Callback failure codes
//! - `ComponentFactory` type alias - Factory function type

use crate::conf::{ConfigAdmin, Param, ParamValue};
use crate::config::ConfigError;
use crate::data::DataType;
use crate::port::{InPort, OutPort, PortAdmin, PortError};
use crate::profile::ModuleProfile;
use thiserror::Error;

/// Execution context identifier passed to callbacks.
pub type ExecContextId = u32;

/// Failure codes returned by component callbacks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComponentError {
    /// Generic failure
    #[error("Component error: {0}")]
    Error(String),

    /// Illegal argument
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    /// Operation not supported
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Resource exhausted
    #[error("Out of resources: {0}")]
    OutOfResources(String),

    /// Called in the wrong state
    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),

    /// Port registration failed
    #[error(transparent)]
    Port(#[from] PortError),

    /// Parameter binding failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Factory function type for creating component instances.
pub type ComponentFactory = fn() -> Box<dyn Component>;

/// Framework-side state of one component instance.
///
/// Components register their ports and bind their configuration variables
/// through this during `on_initialize`.
#[derive(Debug)]
pub struct ComponentBase {
    instance_name: String,
    ports: PortAdmin,
    config: ConfigAdmin,
}

impl ComponentBase {
    /// Create the base for an instance of `profile`.
    pub fn new(instance_name: &str, profile: &ModuleProfile) -> Self {
        Self {
            instance_name: instance_name.to_string(),
            ports: PortAdmin::new(),
            config: ConfigAdmin::new(&profile.params),
        }
    }

    /// Instance name, e.g. `RobotControllerTest0`.
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Register an InPort.
    pub fn add_in_port<T: DataType>(&mut self, port: &InPort<T>) -> Result<(), ComponentError> {
        Ok(self.ports.add_in_port(port)?)
    }

    /// Register an OutPort.
    pub fn add_out_port<T: DataType>(&mut self, port: &OutPort<T>) -> Result<(), ComponentError> {
        Ok(self.ports.add_out_port(port)?)
    }

    /// Bind a configuration variable.
    pub fn bind_parameter<T: ParamValue>(
        &mut self,
        name: &str,
        param: &Param<T>,
        default: &str,
    ) -> Result<(), ComponentError> {
        Ok(self.config.bind_parameter(name, param, default)?)
    }

    /// Port registry.
    pub fn ports(&self) -> &PortAdmin {
        &self.ports
    }

    /// Configuration admin.
    pub fn config(&self) -> &ConfigAdmin {
        &self.config
    }

    /// Mutable configuration admin.
    pub fn config_mut(&mut self) -> &mut ConfigAdmin {
        &mut self.config
    }
}

/// Lifecycle callbacks of a data-flow component.
///
/// # Lifecycle
///
/// 1. `on_initialize()` - once after construction; register ports, bind parameters
/// 2. `on_startup()` / `on_shutdown()` - when the execution context starts / stops
/// 3. `on_activated()` / `on_deactivated()` - on entering / leaving Active
/// 4. `on_execute()` then `on_state_update()` - every period while Active
/// 5. `on_aborting()` - once on entering Error; `on_error()` every period while in Error
/// 6. `on_reset()` - to leave Error
/// 7. `on_finalize()` - before destruction
///
/// Every callback defaults to success, so a component only overrides what it uses.
pub trait Component: Send {
    /// Called once after construction.
    fn on_initialize(&mut self, _base: &mut ComponentBase) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called once before destruction.
    fn on_finalize(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Execution context started.
    fn on_startup(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Execution context stopped.
    fn on_shutdown(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Entered Active.
    fn on_activated(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Left Active.
    fn on_deactivated(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Periodic work.
    fn on_execute(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Entering Error.
    fn on_aborting(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Every period while in Error.
    fn on_error(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Recovery attempt out of Error.
    fn on_reset(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// After each successful `on_execute`.
    fn on_state_update(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Execution rate changed.
    fn on_rate_changed(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }
}
