//! # RTC Manager Library
//!
//! Component manager with a periodic execution context and the built-in
//! component modules.
//!
//! # Module Structure
//!
//! - [`manager`] - Manager: module loading, instance creation, connections
//! - [`factory_registry`] - Component factory registration
//! - [`rt_object`] - Lifecycle driver for one instance
//! - [`execution_context`] - Periodic loop and timing statistics
//! - [`components`] - Built-in components
//! - [`error`] - Manager error types
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        rtc_manager                            │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │
//! │  │   Manager    │──►│  Factory     │◄──│ module init fns  │   │
//! │  │              │   │  Registry    │   │ (components/)    │   │
//! │  └──────┬───────┘   └──────────────┘   └──────────────────┘   │
//! │         ▼                                                     │
//! │  ┌──────────────────────┐      ┌───────────────────────┐      │
//! │  │ PeriodicExecution    │─────►│ RtObject              │      │
//! │  │ Context (loop)       │      │ (lifecycle + ports +  │      │
//! │  └──────────────────────┘      │  configuration)       │      │
//! │                                └───────────────────────┘      │
//! └───────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod components;
pub mod error;
pub mod execution_context;
pub mod factory_registry;
pub mod manager;
pub mod rt_object;

// Re-export key types for convenience
pub use crate::components::register_all_components;
pub use crate::error::ManagerError;
pub use crate::execution_context::PeriodicExecutionContext;
pub use crate::factory_registry::FactoryRegistry;
pub use crate::manager::Manager;
