//! # Kernel
//!
//! Brings a hooklift process from nothing to a fully initialized [`Instance`].
//!
//! A load runs four phases through a [`graph::TaskGraph`]:
//!
//! 1. `config` layers the settings sources and the override into [`Settings`](hooklift_domain::settings::Settings).
//! 2. `hooks` resolves the active [`resolver::HookSet`] and initializes every hook concurrently.
//! 3. `registry` waits on the [`readiness::ReadinessBarrier`] and files each hook's middleware.
//! 4. `routing` binds the configured routes against the registry.
//!
//! Everything is created per load; there is no global state. Lifecycle
//! signals from [`hooklift_domain::signals`] are published on the load's
//! [`EventBus`](hooklift_event_bus::EventBus).
//!
//! ```rust
//! use hooklift_kernel::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), BootstrapError> {
//! let instance = Bootstrap::new()
//!     .config_source(StaticConfigSource::new(json!({ "hooks": false })))
//!     .load()
//!     .await?;
//! assert!(instance.registry.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod graph;
pub mod hook;
pub mod initializer;
pub mod middleware;
pub mod prelude;
pub mod readiness;
pub mod registry;
pub mod resolver;
pub mod routing;

pub use crate::bootstrap::{Bootstrap, Expose, Instance};
pub use crate::error::{BootstrapError, BootstrapErrorExt};
pub use async_trait::async_trait;
pub use hooklift_domain as domain;
pub use hooklift_event_bus as events;
