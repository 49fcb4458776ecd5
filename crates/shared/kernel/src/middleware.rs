//! Handler model shared by hooks, the registry and the routing phase.

use fxhash::FxHashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A named middleware function. Returns [`Flow::Next`] to pass the request on.
pub type Handler = Arc<dyn Fn(&mut Request) -> Flow + Send + Sync>;

/// Outcome of a single handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Next,
    Respond(Response),
}

/// Minimal request passed down a route's handler chain.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Header names are stored lower-cased.
    pub headers: FxHashMap<String, String>,
    /// Scratch space for handlers further down the chain.
    pub locals: Map<String, Value>,
    /// Headers copied onto whatever response ends the chain.
    pub response_headers: FxHashMap<String, String>,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), path: path.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: FxHashMap<String, String>,
    pub body: Value,
}

impl Response {
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, headers: FxHashMap::default(), body }
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204, Value::Null)
    }

    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::new(status, serde_json::json!({ "error": message }))
    }
}

/// Handlers a hook exposes, ordered by name.
#[derive(Clone, Default)]
pub struct Middleware {
    handlers: BTreeMap<String, Handler>,
}

impl Middleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Request) -> Flow + Send + Sync + 'static,
    {
        self.insert(name, handler);
        self
    }

    /// Adds or replaces the handler called `name`.
    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut Request) -> Flow + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
