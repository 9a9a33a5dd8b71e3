//! Built-in component modules.
//!
//! - [`robot_controller`] - Robot Controller component shell
//!
//! # Adding New Components
//!
//! 1. Create a new submodule under `components/`
//! 2. Implement the `Component` trait from `rtc_common::component`
//! 3. Provide a module init function and load it in `register_all_components()`

pub mod robot_controller;

use crate::error::ManagerError;
use crate::manager::Manager;

/// Load every built-in module into the manager.
///
/// Call once at startup before any component is created.
pub fn register_all_components(manager: &mut Manager) -> Result<(), ManagerError> {
    manager.load_module(robot_controller::robot_controller_init)?;
    Ok(())
}
