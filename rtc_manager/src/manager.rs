//! Component manager.
//!
//! The `Manager` owns the factory registry and the periodic execution
//! context. Modules register themselves through an init function; the
//! manager then creates, configures, connects and activates instances,
//! either programmatically or from a `ManagerConfig`.

use crate::error::ManagerError;
use crate::execution_context::PeriodicExecutionContext;
use crate::factory_registry::FactoryRegistry;
use crate::rt_object::RtObject;
use rtc_common::component::ComponentFactory;
use rtc_common::config::{ConfigError, ManagerConfig, split_port_path};
use rtc_common::lifecycle::LifeCycleState;
use rtc_common::profile::ModuleProfile;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

/// Module init entry point, called once when a module is loaded.
pub type ModuleInitFn = fn(&mut Manager) -> Result<(), ManagerError>;

/// Hosts component modules and their instances.
pub struct Manager {
    config: ManagerConfig,
    registry: FactoryRegistry,
    ec: PeriodicExecutionContext,
    /// Instances to activate when the execution context starts
    autostart: Vec<String>,
}

impl Manager {
    /// Create a manager from a configuration.
    ///
    /// # Errors
    /// Returns error if configuration validation fails.
    pub fn new(config: ManagerConfig) -> Result<Self, ManagerError> {
        config.validate()?;
        let ec = PeriodicExecutionContext::new(0, config.exec_cxt.rate)?;
        info!(
            "Manager '{}' created (rate={} Hz)",
            config.shared.service_name, config.exec_cxt.rate
        );
        Ok(Self {
            config,
            registry: FactoryRegistry::new(),
            ec,
            autostart: Vec::new(),
        })
    }

    /// Manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Run a module init function.
    pub fn load_module(&mut self, init: ModuleInitFn) -> Result<(), ManagerError> {
        init(self)
    }

    /// Register a component factory.
    pub fn register_factory(
        &mut self,
        profile: ModuleProfile,
        factory: ComponentFactory,
    ) -> Result<(), ManagerError> {
        self.registry.register(profile, factory)
    }

    /// Factory registry.
    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    /// Execution context.
    pub fn execution_context(&self) -> &PeriodicExecutionContext {
        &self.ec
    }

    /// Mutable execution context.
    pub fn execution_context_mut(&mut self) -> &mut PeriodicExecutionContext {
        &mut self.ec
    }

    /// Create and initialize an instance, attaching it to the execution context.
    ///
    /// Returns the instance name.
    pub fn create_component(&mut self, implementation_id: &str) -> Result<String, ManagerError> {
        let instance = self.registry.create(implementation_id)?;
        let name = instance.name.clone();
        let mut obj = RtObject::new(&instance.name, instance.profile, instance.component);

        let attached = obj.initialize().and_then(|()| self.ec.add_component(obj));
        if let Err(e) = attached {
            self.registry.release(implementation_id)?;
            return Err(e);
        }
        info!("Component {} created", name);
        Ok(name)
    }

    /// Finalize and destroy an instance, dropping every connection into it.
    pub fn delete_component(&mut self, name: &str) -> Result<(), ManagerError> {
        let mut obj = self.ec.remove_component(name)?;
        for other in self.ec.components() {
            other.base().ports().disconnect_from(obj.base().ports());
        }
        self.autostart.retain(|n| n != name);

        let finalized = obj.finalize(self.ec.id());
        let implementation_id = obj.profile().implementation_id.clone();
        drop(obj);
        self.registry.release(&implementation_id)?;
        info!("Component {} deleted", name);
        finalized
    }

    fn object(&self, name: &str) -> Result<&RtObject, ManagerError> {
        self.ec
            .component(name)
            .ok_or_else(|| ManagerError::ComponentNotFound(name.to_string()))
    }

    fn object_mut(&mut self, name: &str) -> Result<&mut RtObject, ManagerError> {
        self.ec
            .component_mut(name)
            .ok_or_else(|| ManagerError::ComponentNotFound(name.to_string()))
    }

    /// Names of all instances in creation order.
    pub fn component_names(&self) -> Vec<String> {
        self.ec
            .components()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Lifecycle state of an instance.
    pub fn component_state(&self, name: &str) -> Result<LifeCycleState, ManagerError> {
        Ok(self.object(name)?.state())
    }

    /// Instance by name.
    pub fn component(&self, name: &str) -> Result<&RtObject, ManagerError> {
        self.object(name)
    }

    /// Add or replace a configuration set on an instance.
    pub fn configure(
        &mut self,
        name: &str,
        set_id: &str,
        values: BTreeMap<String, String>,
    ) -> Result<(), ManagerError> {
        self.object_mut(name)?
            .base_mut()
            .config_mut()
            .add_configuration_set(set_id, values);
        Ok(())
    }

    /// Change one value of a configuration set on an instance.
    pub fn set_parameter(
        &mut self,
        name: &str,
        set_id: &str,
        param: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        self.object_mut(name)?
            .base_mut()
            .config_mut()
            .set_value(set_id, param, value)?;
        Ok(())
    }

    /// Activate a configuration set on an instance and apply it immediately.
    pub fn activate_configuration_set(
        &mut self,
        name: &str,
        set_id: &str,
    ) -> Result<(), ManagerError> {
        let config = self.object_mut(name)?.base_mut().config_mut();
        config.activate_configuration_set(set_id)?;
        config.update()?;
        Ok(())
    }

    /// Connect `<instance>.<outport>` to `<instance>.<inport>`.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<(), ManagerError> {
        let bad_path = |p: &str| {
            ConfigError::ValidationError(format!(
                "invalid port path '{p}', expected <instance>.<port>"
            ))
        };
        let (out_name, out_port) = split_port_path(from).ok_or_else(|| bad_path(from))?;
        let (in_name, in_port) = split_port_path(to).ok_or_else(|| bad_path(to))?;

        let out_obj = self.object(out_name)?;
        let in_obj = self.object(in_name)?;
        out_obj.base().ports().connect(
            out_port,
            in_obj.base().ports(),
            in_port,
            &format!("{from} -> {to}"),
        )?;
        info!("Connected {} -> {}", from, to);
        Ok(())
    }

    /// Activate an instance.
    pub fn activate(&mut self, name: &str) -> Result<(), ManagerError> {
        self.ec.activate_component(name)
    }

    /// Deactivate an instance.
    pub fn deactivate(&mut self, name: &str) -> Result<(), ManagerError> {
        self.ec.deactivate_component(name)
    }

    /// Reset an instance out of Error.
    pub fn reset(&mut self, name: &str) -> Result<(), ManagerError> {
        self.ec.reset_component(name)
    }

    /// Create, configure and connect everything listed in the configuration.
    ///
    /// Instances marked `activate` are activated by [`Manager::start`].
    /// Rejected configuration values are logged and leave defaults in place.
    pub fn apply_config(&mut self) -> Result<Vec<String>, ManagerError> {
        let components = self.config.components.clone();
        let mut created = Vec::with_capacity(components.len());

        for comp in &components {
            let name = self.create_component(&comp.implementation_id)?;
            for (set_id, values) in &comp.conf {
                self.configure(&name, set_id, values.clone())?;
            }
            match self.activate_configuration_set(&name, &comp.active_set) {
                Ok(()) => {}
                Err(ManagerError::Config(ConfigError::ValidationError(msg))) => {
                    warn!("{}: {}", name, msg);
                }
                Err(e) => return Err(e),
            }
            if comp.activate {
                self.autostart.push(name.clone());
            }
            created.push(name);
        }

        for conn in self.config.connections.clone() {
            self.connect(&conn.from, &conn.to)?;
        }
        Ok(created)
    }

    /// Start the execution context and activate autostart instances.
    pub fn start(&mut self) -> Result<(), ManagerError> {
        self.ec.start()?;
        for name in std::mem::take(&mut self.autostart) {
            if let Err(e) = self.ec.activate_component(&name) {
                warn!("Failed to activate {}: {}", name, e);
            }
        }
        Ok(())
    }

    /// Run the periodic loop. See [`PeriodicExecutionContext::run`].
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<(), ManagerError> {
        self.ec.run(max_cycles)
    }

    /// Running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.ec.running_flag()
    }

    /// Stop the execution context and delete every instance.
    pub fn shutdown(&mut self) -> Result<(), ManagerError> {
        info!("Shutdown requested");
        self.ec.stop()?;
        for name in self.component_names().into_iter().rev() {
            if let Err(e) = self.delete_component(&name) {
                warn!("Failed to delete {}: {}", name, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtc_common::component::{Component, ComponentBase, ComponentError};
    use rtc_common::data::TimedLong;
    use rtc_common::port::{InPort, OutPort};

    struct Source {
        out: OutPort<TimedLong>,
    }

    impl Component for Source {
        fn on_initialize(&mut self, base: &mut ComponentBase) -> Result<(), ComponentError> {
            base.add_out_port(&self.out)
        }
    }

    struct Sink {
        inp: InPort<TimedLong>,
    }

    impl Component for Sink {
        fn on_initialize(&mut self, base: &mut ComponentBase) -> Result<(), ComponentError> {
            base.add_in_port(&self.inp)
        }
    }

    struct Broken;

    impl Component for Broken {
        fn on_initialize(&mut self, _base: &mut ComponentBase) -> Result<(), ComponentError> {
            Err(ComponentError::OutOfResources("no memory".to_string()))
        }
    }

    fn source_init(m: &mut Manager) -> Result<(), ManagerError> {
        let profile =
            ModuleProfile::from_spec(&[("implementation_id", "Src"), ("type_name", "Src")])?;
        m.register_factory(profile, create_source)
    }

    fn create_source() -> Box<dyn Component> {
        Box::new(Source {
            out: OutPort::new("value"),
        })
    }

    fn create_sink() -> Box<dyn Component> {
        Box::new(Sink {
            inp: InPort::new("value"),
        })
    }

    fn create_broken() -> Box<dyn Component> {
        Box::new(Broken)
    }

    fn sink_init(m: &mut Manager) -> Result<(), ManagerError> {
        let profile = ModuleProfile::from_spec(&[
            ("implementation_id", "Snk"),
            ("type_name", "Snk"),
            ("max_instance", "1"),
        ])?;
        m.register_factory(profile, create_sink)
    }

    fn manager() -> Manager {
        let mut m = Manager::new(ManagerConfig::default()).unwrap();
        m.load_module(source_init).unwrap();
        m.load_module(sink_init).unwrap();
        m
    }

    #[test]
    fn test_create_and_delete() {
        let mut m = manager();
        let name = m.create_component("Snk").unwrap();
        assert_eq!(name, "Snk0");
        assert_eq!(m.component_state("Snk0").unwrap(), LifeCycleState::Inactive);
        assert!(matches!(
            m.create_component("Snk"),
            Err(ManagerError::MaxInstanceReached { .. })
        ));

        m.delete_component("Snk0").unwrap();
        assert!(m.component_names().is_empty());
        assert_eq!(m.create_component("Snk").unwrap(), "Snk1");
    }

    #[test]
    fn test_failed_initialize_releases_slot() {
        let mut m = manager();
        let profile = ModuleProfile::from_spec(&[
            ("implementation_id", "Broken"),
            ("type_name", "Broken"),
            ("max_instance", "1"),
        ])
        .unwrap();
        m.register_factory(profile, create_broken).unwrap();

        assert!(matches!(
            m.create_component("Broken"),
            Err(ManagerError::Callback { .. })
        ));
        assert_eq!(m.registry().live_instances("Broken"), 0);
        assert!(m.component_names().is_empty());
    }

    #[test]
    fn test_connect_paths() {
        let mut m = manager();
        m.create_component("Src").unwrap();
        m.create_component("Snk").unwrap();

        m.connect("Src0.value", "Snk0.value").unwrap();
        assert!(matches!(
            m.connect("Src0.value", "Snk0.value"),
            Err(ManagerError::Port(_))
        ));
        assert!(matches!(
            m.connect("Nobody0.value", "Snk0.value"),
            Err(ManagerError::ComponentNotFound(_))
        ));
        assert!(matches!(
            m.connect("Src0", "Snk0.value"),
            Err(ManagerError::Config(_))
        ));
    }

    #[test]
    fn test_delete_drops_inbound_connections() {
        let mut m = manager();
        m.create_component("Src").unwrap();
        m.create_component("Snk").unwrap();
        m.connect("Src0.value", "Snk0.value").unwrap();

        m.delete_component("Snk0").unwrap();
        m.create_component("Snk").unwrap();
        // The new sink is a different buffer, so reconnecting succeeds.
        m.connect("Src0.value", "Snk1.value").unwrap();
    }

    #[test]
    fn test_unknown_module() {
        let mut m = manager();
        assert!(matches!(
            m.create_component("Nope"),
            Err(ManagerError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_rate_without_period_rejected() {
        let mut config = ManagerConfig::default();
        config.exec_cxt.rate = 1e-20;
        assert!(matches!(
            Manager::new(config),
            Err(ManagerError::Config(ConfigError::ValidationError(_)))
        ));
    }

    #[test]
    fn test_start_and_shutdown() {
        let mut m = manager();
        m.create_component("Src").unwrap();
        m.start().unwrap();
        m.activate("Src0").unwrap();
        m.run(Some(2)).unwrap();
        assert_eq!(m.execution_context().stats().cycle_count, 2);
        m.shutdown().unwrap();
        assert!(m.component_names().is_empty());
        assert_eq!(m.registry().live_instances("Src"), 0);
    }
}
