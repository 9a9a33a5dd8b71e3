//! Factory registry for component modules.
//!
//! Provides a `FactoryRegistry` struct for registering component factories
//! together with their module profile, and creating / releasing instances.
//! Uses constructor-injection rather than global state.

use crate::error::ManagerError;
use rtc_common::component::{Component, ComponentFactory};
use rtc_common::profile::ModuleProfile;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

struct FactoryEntry {
    profile: Arc<ModuleProfile>,
    factory: ComponentFactory,
    /// Live instances
    live: u32,
    /// Next instance number
    next_number: u32,
}

/// A freshly created, not yet initialized instance.
pub struct NewInstance {
    /// Instance name (`<type_name><n>`)
    pub name: String,
    /// Module profile
    pub profile: Arc<ModuleProfile>,
    /// The component
    pub component: Box<dyn Component>,
}

/// Registry of available component modules.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, FactoryEntry>,
}

impl FactoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component factory.
    ///
    /// # Errors
    /// Returns `ManagerError::AlreadyRegistered` if a factory with the same
    /// implementation id exists.
    pub fn register(
        &mut self,
        profile: ModuleProfile,
        factory: ComponentFactory,
    ) -> Result<(), ManagerError> {
        let id = profile.implementation_id.clone();
        if self.factories.contains_key(&id) {
            return Err(ManagerError::AlreadyRegistered(id));
        }
        info!("Registered module {} v{} ({})", id, profile.version, profile.category);
        self.factories.insert(
            id,
            FactoryEntry {
                profile: Arc::new(profile),
                factory,
                live: 0,
                next_number: 0,
            },
        );
        Ok(())
    }

    /// Create a component instance.
    ///
    /// # Errors
    /// - `ModuleNotFound` if no module with this id is registered
    /// - `MaxInstanceReached` if the module's instance limit is exhausted
    pub fn create(&mut self, implementation_id: &str) -> Result<NewInstance, ManagerError> {
        let entry = self
            .factories
            .get_mut(implementation_id)
            .ok_or_else(|| ManagerError::ModuleNotFound(implementation_id.to_string()))?;

        let max = entry.profile.max_instance;
        if max > 0 && entry.live >= max {
            return Err(ManagerError::MaxInstanceReached {
                implementation_id: implementation_id.to_string(),
                max,
            });
        }

        let name = format!("{}{}", entry.profile.type_name, entry.next_number);
        entry.next_number += 1;
        entry.live += 1;
        debug!("Created instance {} ({} live)", name, entry.live);

        Ok(NewInstance {
            name,
            profile: Arc::clone(&entry.profile),
            component: (entry.factory)(),
        })
    }

    /// Release one instance slot of a module.
    pub fn release(&mut self, implementation_id: &str) -> Result<(), ManagerError> {
        let entry = self
            .factories
            .get_mut(implementation_id)
            .ok_or_else(|| ManagerError::ModuleNotFound(implementation_id.to_string()))?;
        entry.live = entry.live.saturating_sub(1);
        debug!("Released instance of {} ({} live)", implementation_id, entry.live);
        Ok(())
    }

    /// Profile of a registered module.
    pub fn profile(&self, implementation_id: &str) -> Option<Arc<ModuleProfile>> {
        self.factories
            .get(implementation_id)
            .map(|e| Arc::clone(&e.profile))
    }

    /// Number of live instances of a module.
    pub fn live_instances(&self, implementation_id: &str) -> u32 {
        self.factories.get(implementation_id).map_or(0, |e| e.live)
    }

    /// All registered implementation ids, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }
}
