//! RTC Common Library
//!
//! This crate provides the shared building blocks of the component runtime:
//! timestamped data types, typed data ports, configuration variables,
//! module profiles and the `Component` contract that the manager drives.
//!
//! # Module Structure
//!
//! - [`data`] - Timestamped data types carried by ports
//! - [`port`] - InPort / OutPort and per-component port registry
//! - [`conf`] - Configuration variables, sets, constraints and widgets
//! - [`profile`] - Module profile (static metadata table)
//! - [`component`] - `Component` trait, `ComponentBase` and error codes
//! - [`lifecycle`] - Component lifecycle states
//! - [`config`] - Manager configuration loading
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rtc_common::prelude::*;
//! ```

pub mod component;
pub mod conf;
pub mod config;
pub mod consts;
pub mod data;
pub mod lifecycle;
pub mod port;
pub mod prelude;
pub mod profile;
