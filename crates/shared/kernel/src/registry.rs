//! Namespaced middleware collected after the readiness barrier.

use crate::middleware::{Handler, Middleware};
use std::collections::BTreeMap;
use tracing::debug;

/// Middleware of every active hook, namespaced by hook id.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    namespaces: BTreeMap<String, Middleware>,
}

impl Registry {
    /// Files each entry under its id. A repeated id overwrites the earlier entry.
    ///
    /// ```rust
    /// use hooklift_kernel::middleware::{Flow, Middleware};
    /// use hooklift_kernel::registry::Registry;
    ///
    /// let first = Middleware::new().with("a", |_| Flow::Next);
    /// let second = Middleware::new().with("b", |_| Flow::Next);
    /// let registry = Registry::build([("x".to_owned(), first), ("x".to_owned(), second)]);
    ///
    /// assert!(registry.handler("x.b").is_some());
    /// assert!(registry.handler("x.a").is_none());
    /// ```
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Middleware)>,
    {
        let mut namespaces = BTreeMap::new();
        for (id, middleware) in entries {
            if namespaces.contains_key(&id) {
                debug!(hook = %id, "Registry namespace overwritten by a later entry");
            }
            namespaces.insert(id, middleware);
        }
        Self { namespaces }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Middleware> {
        self.namespaces.get(id)
    }

    /// Looks up a `"hook.handler"` target.
    #[must_use]
    pub fn handler(&self, target: &str) -> Option<&Handler> {
        let (id, name) = target.split_once('.')?;
        self.namespaces.get(id)?.get(name)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Middleware)> {
        self.namespaces.iter().map(|(id, middleware)| (id.as_str(), middleware))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}
