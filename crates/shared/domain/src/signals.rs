//! Lifecycle signals published on the per-load event bus.
//!
//! Milestones ([`HooksInitialized`], [`RegistryPopulated`], [`Ready`]) are
//! published as latest values, so an observer that subscribes late still sees
//! them. [`HookReady`] is broadcast once per hook as it signals readiness.

use serde::Serialize;

/// Every active hook's `initialize` returned successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HooksInitialized {
    pub hooks: Vec<String>,
}

/// The registry was built; `namespaces` lists its keys in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryPopulated {
    pub namespaces: Vec<String>,
}

/// The load finished: barrier passed, routes bound, globals exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ready {
    pub hooks: Vec<String>,
    pub elapsed_ms: u64,
}

/// A single hook signaled readiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookReady {
    pub id: String,
}
