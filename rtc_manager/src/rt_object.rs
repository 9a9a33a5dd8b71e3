//! Lifecycle driver for a single component instance.
//!
//! `RtObject` owns the component, its `ComponentBase` and its current
//! `LifeCycleState`, and is the only place callbacks are invoked from.

use crate::error::ManagerError;
use rtc_common::component::{Component, ComponentBase, ComponentError, ExecContextId};
use rtc_common::lifecycle::LifeCycleState;
use rtc_common::profile::ModuleProfile;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A component instance plus its framework state.
pub struct RtObject {
    base: ComponentBase,
    component: Box<dyn Component>,
    profile: Arc<ModuleProfile>,
    state: LifeCycleState,
}

impl RtObject {
    /// Wrap a freshly created component. State is `Created`.
    pub fn new(name: &str, profile: Arc<ModuleProfile>, component: Box<dyn Component>) -> Self {
        Self {
            base: ComponentBase::new(name, &profile),
            component,
            profile,
            state: LifeCycleState::Created,
        }
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        self.base.instance_name()
    }

    /// Module profile.
    pub fn profile(&self) -> &ModuleProfile {
        &self.profile
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifeCycleState {
        self.state
    }

    /// Framework state (ports, configuration).
    pub fn base(&self) -> &ComponentBase {
        &self.base
    }

    /// Mutable framework state.
    pub fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn callback_err(&self, source: ComponentError) -> ManagerError {
        ManagerError::Callback {
            name: self.name().to_string(),
            source,
        }
    }

    fn check_transition(&self, to: LifeCycleState) -> Result<(), ManagerError> {
        if self.state.can_transition(to) {
            Ok(())
        } else {
            Err(ManagerError::IllegalTransition {
                name: self.name().to_string(),
                from: self.state,
                to,
            })
        }
    }

    /// Run `on_initialize` and apply the active configuration set.
    ///
    /// On failure the object stays `Created`.
    pub fn initialize(&mut self) -> Result<(), ManagerError> {
        self.check_transition(LifeCycleState::Inactive)?;
        self.component
            .on_initialize(&mut self.base)
            .map_err(|e| self.callback_err(e))?;
        if let Err(e) = self.base.config_mut().update() {
            warn!("{}: initial configuration partially rejected: {}", self.name(), e);
        }
        self.state = LifeCycleState::Inactive;
        info!(
            "{} initialized ({} ports, {} parameters)",
            self.name(),
            self.base.ports().len(),
            self.base.config().bound_names().len()
        );
        Ok(())
    }

    /// Deactivate if needed, then run `on_finalize`.
    pub fn finalize(&mut self, ec_id: ExecContextId) -> Result<(), ManagerError> {
        if self.state == LifeCycleState::Active {
            self.deactivate(ec_id)?;
        }
        self.base.ports().disconnect_all();
        self.component
            .on_finalize()
            .map_err(|e| self.callback_err(e))?;
        info!("{} finalized", self.name());
        Ok(())
    }

    /// Inactive → Active. A failing `on_activated` moves to Error.
    pub fn activate(&mut self, ec_id: ExecContextId) -> Result<(), ManagerError> {
        self.check_transition(LifeCycleState::Active)?;
        match self.component.on_activated(ec_id) {
            Ok(()) => {
                self.state = LifeCycleState::Active;
                info!("{} activated", self.name());
                Ok(())
            }
            Err(e) => {
                self.enter_error(ec_id, "on_activated", &e);
                Err(self.callback_err(e))
            }
        }
    }

    /// Active → Inactive. A failing `on_deactivated` moves to Error.
    pub fn deactivate(&mut self, ec_id: ExecContextId) -> Result<(), ManagerError> {
        if self.state != LifeCycleState::Active {
            return Err(ManagerError::IllegalTransition {
                name: self.name().to_string(),
                from: self.state,
                to: LifeCycleState::Inactive,
            });
        }
        match self.component.on_deactivated(ec_id) {
            Ok(()) => {
                self.state = LifeCycleState::Inactive;
                info!("{} deactivated", self.name());
                Ok(())
            }
            Err(e) => {
                self.enter_error(ec_id, "on_deactivated", &e);
                Err(self.callback_err(e))
            }
        }
    }

    /// Error → Inactive. A failing `on_reset` keeps Error.
    pub fn reset(&mut self, ec_id: ExecContextId) -> Result<(), ManagerError> {
        if self.state != LifeCycleState::Error {
            return Err(ManagerError::IllegalTransition {
                name: self.name().to_string(),
                from: self.state,
                to: LifeCycleState::Inactive,
            });
        }
        self.component
            .on_reset(ec_id)
            .map_err(|e| self.callback_err(e))?;
        self.state = LifeCycleState::Inactive;
        info!("{} reset", self.name());
        Ok(())
    }

    /// One execution-context cycle.
    pub fn execute(&mut self, ec_id: ExecContextId) {
        match self.state {
            LifeCycleState::Active => {
                if let Err(e) = self.base.config_mut().update_if_changed() {
                    warn!("{}: configuration update: {}", self.name(), e);
                }
                let result = self
                    .component
                    .on_execute(ec_id)
                    .and_then(|()| self.component.on_state_update(ec_id));
                if let Err(e) = result {
                    self.enter_error(ec_id, "on_execute", &e);
                }
            }
            LifeCycleState::Error => {
                if let Err(e) = self.component.on_error(ec_id) {
                    debug!("{}: on_error failed: {}", self.name(), e);
                }
            }
            LifeCycleState::Created | LifeCycleState::Inactive => {}
        }
    }

    /// Execution context started.
    pub fn startup(&mut self, ec_id: ExecContextId) -> Result<(), ManagerError> {
        self.component
            .on_startup(ec_id)
            .map_err(|e| self.callback_err(e))
    }

    /// Execution context stopped.
    pub fn shutdown(&mut self, ec_id: ExecContextId) -> Result<(), ManagerError> {
        self.component
            .on_shutdown(ec_id)
            .map_err(|e| self.callback_err(e))
    }

    /// Execution rate changed.
    pub fn rate_changed(&mut self, ec_id: ExecContextId) -> Result<(), ManagerError> {
        self.component
            .on_rate_changed(ec_id)
            .map_err(|e| self.callback_err(e))
    }

    fn enter_error(&mut self, ec_id: ExecContextId, during: &str, cause: &ComponentError) {
        error!("{}: {} failed: {}", self.name(), during, cause);
        self.state = LifeCycleState::Error;
        if let Err(e) = self.component.on_aborting(ec_id) {
            warn!("{}: on_aborting failed: {}", self.name(), e);
        }
    }
}

impl std::fmt::Debug for RtObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtObject")
            .field("name", &self.name())
            .field("state", &self.state)
            .finish()
    }
}
