use crate::hook::HookError;
use std::borrow::Cow;

/// Errors surfaced by a bootstrap run.
///
/// Phase errors travel through the phase graph unchanged; the first one wins.
#[hooklift_derive::hooklift_error]
pub enum BootstrapError {
    /// Malformed settings the bootstrap consumes (allow-list, hook table, dependencies).
    #[error("Configuration error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The layered settings sources could not be read.
    #[error("Settings source error{}: {source}", format_context(.context))]
    Settings { source: config::ConfigError, context: Option<Cow<'static, str>> },

    /// The merged settings tree does not match the settings model.
    #[error("Settings decode error{}: {source}", format_context(.context))]
    Decode { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// A hook reported failure from `initialize`.
    #[error("Hook initialization failed{}: {source}", format_context(.context))]
    HookInit { source: HookError, context: Option<Cow<'static, str>> },

    /// The watchdog fired before every active hook signaled readiness.
    #[error("Readiness timeout{}: {message}", format_context(.context))]
    ReadinessTimeout {
        message: Cow<'static, str>,
        pending: Vec<String>,
        context: Option<Cow<'static, str>>,
    },

    /// The phase graph is malformed: duplicate phase, unknown dependency or cycle.
    #[error("Phase graph error{}: {message}", format_context(.context))]
    Graph { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A route points at a handler the registry does not hold.
    #[error("Routing error{}: {message}", format_context(.context))]
    Routing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal bootstrap error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl BootstrapError {
    pub(crate) fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Config { message: message.into(), context: None }
    }

    pub(crate) fn graph(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Graph { message: message.into(), context: None }
    }

    pub(crate) fn routing(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Routing { message: message.into(), context: None }
    }

    /// Hook ids still pending when the watchdog fired, empty for other kinds.
    #[must_use]
    pub fn pending_hooks(&self) -> &[String] {
        match self {
            Self::ReadinessTimeout { pending, .. } => pending,
            _ => &[],
        }
    }

    #[must_use]
    pub const fn is_readiness_timeout(&self) -> bool {
        matches!(self, Self::ReadinessTimeout { .. })
    }
}
