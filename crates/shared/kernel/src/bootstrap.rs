//! The `load` entry point and the instance it produces.

use crate::config::{ConfigSource, FileConfigSource, settings_from};
use crate::error::BootstrapError;
use crate::graph::{PhaseResults, TaskGraph};
use crate::hook::Hook;
use crate::initializer::{Initialized, initialize_all};
use crate::readiness::ReadinessBarrier;
use crate::registry::Registry;
use crate::resolver::{HookOverride, HookSet, resolve};
use crate::routing::RouteTable;
use hooklift_domain::constants::{PHASE_CONFIG, PHASE_HOOKS, PHASE_REGISTRY, PHASE_ROUTING};
use hooklift_domain::settings::Settings;
use hooklift_domain::signals::{Ready, RegistryPopulated};
use hooklift_event_bus::EventBus;
use serde_json::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Process-wide side effect run once a load succeeded, e.g. publishing the
/// instance to a global slot. Closures taking `&Instance` implement it.
pub trait Expose: Send {
    fn expose(self: Box<Self>, instance: &Instance);
}

impl<F> Expose for F
where
    F: FnOnce(&Instance) + Send,
{
    fn expose(self: Box<Self>, instance: &Instance) {
        (*self)(instance);
    }
}

/// Fully initialized state of one load.
#[derive(Debug)]
pub struct InstanceInner {
    pub settings: Arc<Settings>,
    pub hooks: Arc<HookSet>,
    pub registry: Arc<Registry>,
    pub routes: Arc<RouteTable>,
    pub events: EventBus,
}

/// Cheap-to-clone handle over [`InstanceInner`].
#[derive(Debug, Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

impl Deref for Instance {
    type Target = InstanceInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Clone)]
enum PhaseOutput {
    Settings(Arc<Settings>),
    Hooks(Arc<Initialized>),
    Registry(Arc<Registry>),
    Routes(Arc<RouteTable>),
}

/// Builder for a single load.
///
/// Every call to [`Bootstrap::load`] consumes the builder; nothing survives
/// between loads.
///
/// ```rust
/// use hooklift_kernel::prelude::*;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), BootstrapError> {
/// let instance = Bootstrap::new()
///     .config_source(StaticConfigSource::new(json!({ "host": "example.com" })))
///     .default_hook(FnHook::new("ping", |_ctx| async {
///         let pong = |_req: &mut Request| Flow::Respond(Response::ok(json!("pong")));
///         Ok(Middleware::new().with("pong", pong))
///     }))
///     .load()
///     .await?;
///
/// assert_eq!(instance.settings.explicit_host.as_deref(), Some("example.com"));
/// assert!(instance.registry.handler("ping.pong").is_some());
/// # Ok(())
/// # }
/// ```
pub struct Bootstrap {
    defaults: Vec<Arc<dyn Hook>>,
    overrides: Vec<(String, HookOverride)>,
    source: Box<dyn ConfigSource>,
    config_override: Option<Value>,
    expose: Option<Box<dyn Expose>>,
    events: EventBus,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self {
            defaults: Vec::new(),
            overrides: Vec::new(),
            source: Box::new(FileConfigSource::default()),
            config_override: None,
            expose: None,
            events: EventBus::new(),
        }
    }
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("defaults", &self.defaults.iter().map(|h| h.id()).collect::<Vec<_>>())
            .field("overrides", &self.overrides.len())
            .field("source", &self.source)
            .field("config_override", &self.config_override)
            .field("expose", &self.expose.is_some())
            .finish_non_exhaustive()
    }
}

impl Bootstrap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a known hook. Overrides and settings may still replace or disable it.
    #[must_use]
    pub fn default_hook(mut self, hook: impl Hook) -> Self {
        self.defaults.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn default_hooks<I>(mut self, hooks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Hook>>,
    {
        self.defaults.extend(hooks);
        self
    }

    /// Defines `hook`, replacing a default with the same id.
    #[must_use]
    pub fn hook(mut self, hook: impl Hook) -> Self {
        let hook: Arc<dyn Hook> = Arc::new(hook);
        self.overrides.push((hook.id().to_owned(), HookOverride::Define(hook)));
        self
    }

    /// Disables the hook `id`, whether or not it is defined.
    #[must_use]
    pub fn disable(mut self, id: impl Into<String>) -> Self {
        self.overrides.push((id.into(), HookOverride::Disable));
        self
    }

    #[must_use]
    pub fn config_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Settings merged over whatever the config source produced.
    #[must_use]
    pub fn config_override(mut self, config_override: Value) -> Self {
        self.config_override = Some(config_override);
        self
    }

    #[must_use]
    pub fn expose(mut self, expose: impl Expose + 'static) -> Self {
        self.expose = Some(Box::new(expose));
        self
    }

    /// The bus this load will publish on, for subscribing before [`Bootstrap::load`].
    #[must_use]
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Runs `config → hooks → registry → routing`, then exposes the instance.
    ///
    /// # Errors
    /// Returns the first error of any phase; see [`BootstrapError`].
    /// A readiness timeout is returned like any other error; the caller decides
    /// whether it is fatal.
    pub async fn load(self) -> Result<Instance, BootstrapError> {
        let started = Instant::now();
        let Self { defaults, overrides, source, config_override, expose, events } = self;

        let hook_events = events.clone();
        let registry_events = events.clone();

        let mut results = TaskGraph::new()
            .phase(PHASE_CONFIG, &[], move |_| async move {
                let settings = settings_from(source.load()?, config_override)?;
                Ok(PhaseOutput::Settings(Arc::new(settings)))
            })
            .phase(PHASE_HOOKS, &[PHASE_CONFIG], move |deps| async move {
                let settings = settings_of(&deps)?;
                let barrier = ReadinessBarrier::start(&settings.readiness);

                let hooks = if settings.hooks_disabled() {
                    info!("Hook loading disabled");
                    HookSet::empty()
                } else {
                    let overrides = overrides.into_iter().chain(
                        settings
                            .hooks
                            .disabled()
                            .map(|id| (id.to_owned(), HookOverride::Disable))
                            .collect::<Vec<_>>(),
                    );
                    resolve(defaults, overrides, settings.load_hooks.as_ref())?
                };

                let initialized = initialize_all(hooks, settings, hook_events, barrier).await?;
                Ok(PhaseOutput::Hooks(Arc::new(initialized)))
            })
            .phase(PHASE_REGISTRY, &[PHASE_HOOKS], move |deps| async move {
                let settings = settings_of(&deps)?;
                let initialized = initialized_of(&deps)?;

                if settings.hooks_disabled() {
                    debug!("Skipping readiness barrier");
                } else {
                    initialized.barrier.wait(&initialized.latch).await?;
                }

                let registry = Registry::build(initialized.middleware.iter().cloned());
                let namespaces: Vec<String> = registry.namespaces().map(str::to_owned).collect();
                info!(namespaces = ?namespaces, "Registry populated");
                if let Err(err) = registry_events.publish_latest(RegistryPopulated { namespaces }) {
                    warn!(error = %err, "Failed to publish registry populated signal");
                }
                Ok(PhaseOutput::Registry(Arc::new(registry)))
            })
            .phase(PHASE_ROUTING, &[PHASE_REGISTRY], |deps| async move {
                let settings = settings_of(&deps)?;
                let registry = registry_of(&deps)?;
                let routes = RouteTable::bind(&settings.routes, &registry)?;
                Ok(PhaseOutput::Routes(Arc::new(routes)))
            })
            .run()
            .await?;

        let settings = settings_of(&results)?;
        let registry = registry_of(&results)?;
        let routes = match results.remove(PHASE_ROUTING) {
            Some(PhaseOutput::Routes(routes)) => routes,
            _ => return Err(missing(PHASE_ROUTING)),
        };
        let hooks = match results.remove(PHASE_HOOKS) {
            Some(PhaseOutput::Hooks(initialized)) => Arc::new(initialized.hooks.clone()),
            _ => return Err(missing(PHASE_HOOKS)),
        };

        let instance = Instance {
            inner: Arc::new(InstanceInner { settings, hooks, registry, routes, events }),
        };

        if let Some(expose) = expose {
            debug!("Exposing instance");
            expose.expose(&instance);
        }

        let ready = Ready {
            hooks: instance.hooks.active_ids(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(hooks = ?ready.hooks, elapsed_ms = ready.elapsed_ms, "Bootstrap ready");
        if let Err(err) = instance.events.publish_latest(ready) {
            warn!(error = %err, "Failed to publish ready signal");
        }

        Ok(instance)
    }
}

fn settings_of(results: &PhaseResults<PhaseOutput>) -> Result<Arc<Settings>, BootstrapError> {
    match results.get(PHASE_CONFIG) {
        Some(PhaseOutput::Settings(settings)) => Ok(Arc::clone(settings)),
        _ => Err(missing(PHASE_CONFIG)),
    }
}

fn initialized_of(results: &PhaseResults<PhaseOutput>) -> Result<Arc<Initialized>, BootstrapError> {
    match results.get(PHASE_HOOKS) {
        Some(PhaseOutput::Hooks(initialized)) => Ok(Arc::clone(initialized)),
        _ => Err(missing(PHASE_HOOKS)),
    }
}

fn registry_of(results: &PhaseResults<PhaseOutput>) -> Result<Arc<Registry>, BootstrapError> {
    match results.get(PHASE_REGISTRY) {
        Some(PhaseOutput::Registry(registry)) => Ok(Arc::clone(registry)),
        _ => Err(missing(PHASE_REGISTRY)),
    }
}

fn missing(phase: &str) -> BootstrapError {
    BootstrapError::graph(format!("result of phase `{phase}` is unavailable"))
}
