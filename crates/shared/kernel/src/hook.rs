use crate::middleware::Middleware;
use crate::readiness::ReadyHandle;
use async_trait::async_trait;
use hooklift_domain::settings::Settings;
use hooklift_event_bus::EventBus;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Errors a hook reports from [`Hook::initialize`].
#[hooklift_derive::hooklift_error]
pub enum HookError {
    #[error("Hook failed{}: {message}", format_context(.context))]
    Failed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The options table under `hooks.<id>` does not fit the hook's options type.
    #[error("Invalid hook options{}: {source}", format_context(.context))]
    Options { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal hook error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl HookError {
    pub fn failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Failed { message: message.into(), context: None }
    }
}

/// A pluggable unit brought up during a load.
///
/// `initialize` runs concurrently with every other active hook. It returns the
/// hook's middleware, which the registry files under [`Hook::id`]. A hook counts
/// as ready as soon as `initialize` returns `Ok`, unless it called
/// [`HookContext::defer_readiness`], in which case it is ready once it signals
/// the returned [`ReadyHandle`].
///
/// ```rust
/// use hooklift_kernel::prelude::*;
///
/// #[derive(Debug)]
/// struct Greeter;
///
/// #[async_trait]
/// impl Hook for Greeter {
///     fn id(&self) -> &str {
///         "greeter"
///     }
///
///     async fn initialize(&self, _ctx: HookContext) -> Result<Middleware, HookError> {
///         Ok(Middleware::new().with("hello", |_req: &mut Request| {
///             Flow::Respond(Response::ok(serde_json::json!("hello")))
///         }))
///     }
/// }
/// ```
#[async_trait]
pub trait Hook: fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Hooks whose readiness must precede this hook's `initialize`.
    fn depends_on(&self) -> &[&'static str] {
        &[]
    }

    async fn initialize(&self, ctx: HookContext) -> Result<Middleware, HookError>;
}

/// Everything a hook gets to see while it initializes.
#[derive(Debug, Clone)]
pub struct HookContext {
    id: Arc<str>,
    options: Value,
    settings: Arc<Settings>,
    events: EventBus,
    ready: ReadyHandle,
    deferred: Arc<AtomicBool>,
}

impl HookContext {
    pub(crate) fn new(
        id: &str,
        settings: Arc<Settings>,
        events: EventBus,
        ready: ReadyHandle,
    ) -> Self {
        let options = settings
            .hook_options(id)
            .map_or_else(|| Value::Object(serde_json::Map::new()), |o| Value::Object(o.clone()));

        Self { id: id.into(), options, settings, events, ready, deferred: Arc::default() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw options table from `hooks.<id>`; an empty object when none is configured.
    #[must_use]
    pub const fn options(&self) -> &Value {
        &self.options
    }

    /// Decodes the options table into `T`.
    ///
    /// # Errors
    /// Returns [`HookError::Options`] when the table does not fit `T`.
    pub fn options_as<T: DeserializeOwned>(&self) -> Result<T, HookError> {
        serde_json::from_value(self.options.clone())
            .map_err(|source| HookError::Options { source, context: Some(self.id.to_string().into()) })
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The event bus of the current load, shared by every hook.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Opts out of being marked ready when `initialize` returns.
    ///
    /// The hook must call [`ReadyHandle::signal`] later, or the readiness
    /// watchdog reports it as pending.
    #[must_use = "a deferred hook is only ready once the handle is signaled"]
    pub fn defer_readiness(&self) -> ReadyHandle {
        self.deferred.store(true, Ordering::Release);
        self.ready.clone()
    }

    pub(crate) fn is_deferred(&self) -> bool {
        self.deferred.load(Ordering::Acquire)
    }

    pub(crate) fn ready_handle(&self) -> ReadyHandle {
        self.ready.clone()
    }
}

pub type HookFuture = Pin<Box<dyn Future<Output = Result<Middleware, HookError>> + Send + 'static>>;

type InitFn = Arc<dyn Fn(HookContext) -> HookFuture + Send + Sync>;

/// A hook built from a closure, for embedders and tests.
///
/// ```rust
/// use hooklift_kernel::prelude::*;
///
/// let hook = FnHook::new("metrics", |_ctx| async { Ok(Middleware::new()) })
///     .after(&["session"]);
/// assert_eq!(hook.depends_on(), ["session"]);
/// ```
#[derive(Clone)]
pub struct FnHook {
    id: String,
    depends_on: Vec<&'static str>,
    init: InitFn,
}

impl FnHook {
    pub fn new<F, Fut>(id: impl Into<String>, init: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Middleware, HookError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            init: Arc::new(move |ctx| -> HookFuture { Box::pin(init(ctx)) }),
        }
    }

    /// Declares the hooks this one waits for.
    #[must_use]
    pub fn after(mut self, dependencies: &[&'static str]) -> Self {
        self.depends_on.extend_from_slice(dependencies);
        self
    }
}

impl fmt::Debug for FnHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHook")
            .field("id", &self.id)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Hook for FnHook {
    fn id(&self) -> &str {
        &self.id
    }

    fn depends_on(&self) -> &[&'static str] {
        &self.depends_on
    }

    async fn initialize(&self, ctx: HookContext) -> Result<Middleware, HookError> {
        (self.init)(ctx).await
    }
}
