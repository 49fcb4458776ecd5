//! Route binding for the `routing` phase and request dispatch.

use crate::error::BootstrapError;
use crate::middleware::{Flow, Handler, Request, Response};
use crate::registry::Registry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A route bound to the handlers its chain names.
#[derive(Clone)]
pub struct Route {
    method: String,
    path: String,
    chain: Vec<(String, Handler)>,
}

impl Route {
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `"hook.handler"` targets in execution order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.chain.iter().map(|(target, _)| target.as_str())
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("chain", &self.targets().collect::<Vec<_>>())
            .finish()
    }
}

/// Routes resolved against the registry, keyed by method and path.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<(String, String), Route>,
}

impl RouteTable {
    /// Binds every `"METHOD /path"` entry to the handlers it names.
    ///
    /// # Errors
    /// Returns [`BootstrapError::Routing`] for a key without a method and path,
    /// or for a target the registry does not hold.
    pub fn bind(
        routes: &BTreeMap<String, Vec<String>>,
        registry: &Registry,
    ) -> Result<Self, BootstrapError> {
        let mut table = BTreeMap::new();

        for (key, targets) in routes {
            let Some((method, path)) = key.trim().split_once(char::is_whitespace) else {
                return Err(BootstrapError::routing(format!(
                    "route `{key}` must look like `METHOD /path`"
                )));
            };
            let (method, path) = (method.to_ascii_uppercase(), path.trim().to_owned());

            let mut chain = Vec::with_capacity(targets.len());
            for target in targets {
                let handler = registry.handler(target).ok_or_else(|| {
                    BootstrapError::routing(format!(
                        "route `{key}` references unknown handler `{target}`"
                    ))
                })?;
                chain.push((target.clone(), Arc::clone(handler)));
            }

            debug!(method = %method, path = %path, handlers = chain.len(), "Route bound");
            table.insert((method.clone(), path.clone()), Route { method, path, chain });
        }

        Ok(Self { routes: table })
    }

    #[must_use]
    pub fn get(&self, method: &str, path: &str) -> Option<&Route> {
        self.routes.get(&(method.to_ascii_uppercase(), path.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the matching route's chain until a handler responds.
    ///
    /// An unknown route yields `404`, an exhausted chain `204`. Headers the
    /// handlers queued on the request are copied onto the response.
    pub fn dispatch(&self, request: &mut Request) -> Response {
        let Some(route) = self.get(&request.method, &request.path) else {
            trace!(method = %request.method, path = %request.path, "No route");
            return Response::error(404, "no route");
        };

        let mut response = route
            .chain
            .iter()
            .find_map(|(target, handler)| match handler(request) {
                Flow::Next => None,
                Flow::Respond(response) => {
                    trace!(handler = %target, status = response.status, "Handler responded");
                    Some(response)
                },
            })
            .unwrap_or_else(Response::no_content);

        for (name, value) in request.response_headers.drain() {
            response.headers.entry(name).or_insert(value);
        }
        response
    }
}
