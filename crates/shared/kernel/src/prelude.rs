//! Everything a hook author or an embedder usually needs.

pub use crate::bootstrap::{Bootstrap, Expose, Instance};
pub use crate::config::{ConfigSource, FileConfigSource, StaticConfigSource};
pub use crate::error::BootstrapError;
pub use crate::hook::{FnHook, Hook, HookContext, HookError};
pub use crate::middleware::{Flow, Handler, Middleware, Request, Response};
pub use crate::readiness::ReadyHandle;
pub use crate::registry::Registry;
pub use crate::resolver::{DisableReason, HookSet, HookState};
pub use crate::routing::RouteTable;
pub use async_trait::async_trait;
pub use hooklift_domain::settings::Settings;
pub use hooklift_domain::signals::{HookReady, HooksInitialized, Ready, RegistryPopulated};
pub use hooklift_event_bus::{EventBus, EventReceiverExt};
