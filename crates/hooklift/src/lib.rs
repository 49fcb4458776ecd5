//! Facade crate for hooklift.
//! Re-exports the kernel and wires the built-in hooks enabled by cargo features.
//! Keep this crate thin: it composes other crates and holds no orchestration logic.
//!
//! ## Usage
//! - Add `hooklift` with the desired hook features (`session`, `policies`, `cors`, or `full`).
//! - Call [`load`] for the common case, or start from [`bootstrap`] to add hooks,
//!   overrides or a custom config source before loading.

pub use hooklift_domain as domain;
pub use hooklift_event_bus as events;
pub use hooklift_kernel as kernel;
pub use hooklift_kernel::prelude;
pub use hooklift_kernel::{Bootstrap, BootstrapError, Expose, Instance};

use hooklift_kernel::hook::Hook;
use serde_json::Value;
use std::sync::Arc;

/// Built-in hooks, each behind its cargo feature.
pub mod hooks {
    #[cfg(feature = "cors")]
    pub use hooklift_cors as cors;
    #[cfg(feature = "policies")]
    pub use hooklift_policies as policies;
    #[cfg(feature = "session")]
    pub use hooklift_session as session;

    /// Hook ids compiled into this build.
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "session")]
        hooklift_domain::constants::SESSION,
        #[cfg(feature = "policies")]
        hooklift_domain::constants::POLICIES,
        #[cfg(feature = "cors")]
        hooklift_domain::constants::CORS,
    ];

    #[must_use]
    pub fn is_enabled(id: &str) -> bool {
        ENABLED.contains(&id)
    }
}

/// Definitions of every built-in hook compiled into this build.
#[must_use]
pub fn default_hooks() -> Vec<Arc<dyn Hook>> {
    let mut defaults: Vec<Arc<dyn Hook>> = Vec::new();

    #[cfg(feature = "session")]
    defaults.push(hooks::session::hook());

    #[cfg(feature = "policies")]
    defaults.push(hooks::policies::hook());

    #[cfg(feature = "cors")]
    defaults.push(hooks::cors::hook());

    defaults
}

/// A [`Bootstrap`] with the built-in hooks registered as defaults.
#[must_use]
pub fn bootstrap() -> Bootstrap {
    Bootstrap::new().default_hooks(default_hooks())
}

/// Loads an instance from the default settings sources, merging `config_override` on top.
///
/// # Errors
/// Returns the first [`BootstrapError`] of the load.
pub async fn load(config_override: Option<Value>) -> Result<Instance, BootstrapError> {
    let mut builder = bootstrap();
    if let Some(config_override) = config_override {
        builder = builder.config_override(config_override);
    }
    builder.load().await
}
