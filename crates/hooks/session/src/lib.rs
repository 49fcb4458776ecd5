//! Session hook: reads the caller's session id from a request header.
//!
//! Middleware:
//! * `load` stores `{ "id": .. }` under the `session` local when the header is present.
//! * `require` answers `401` unless `load` found a session.

use hooklift_domain::constants::SESSION;
use hooklift_kernel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Request local written by `load`.
pub const SESSION_LOCAL: &str = "session";

pub const DEFAULT_HEADER: &str = "x-session-id";

/// Options read from `hooks.session`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub header: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { header: DEFAULT_HEADER.to_owned() }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SessionHook;

/// The hook as registered by default.
#[must_use]
pub fn hook() -> Arc<dyn Hook> {
    Arc::new(SessionHook)
}

/// Session id recorded on `request` by the `load` middleware, if any.
#[must_use]
pub fn session_id(request: &Request) -> Option<&str> {
    request.locals.get(SESSION_LOCAL)?.get("id")?.as_str()
}

#[async_trait]
impl Hook for SessionHook {
    fn id(&self) -> &str {
        SESSION
    }

    async fn initialize(&self, ctx: HookContext) -> Result<Middleware, HookError> {
        let options: SessionOptions = ctx.options_as()?;
        if options.header.trim().is_empty() {
            return Err(HookError::failed("session header name must not be empty"));
        }
        tracing::info!(header = %options.header, "Session hook initialized");

        let header = options.header;
        Ok(Middleware::new()
            .with("load", move |req: &mut Request| {
                if let Some(id) = req.header(&header).filter(|id| !id.is_empty()).map(str::to_owned) {
                    let session = json!({ "id": id });
                    req.locals.insert(SESSION_LOCAL.to_owned(), session);
                }
                Flow::Next
            })
            .with("require", |req: &mut Request| {
                if session_id(req).is_some() {
                    Flow::Next
                } else {
                    Flow::Respond(Response::error(401, "session required"))
                }
            }))
    }
}
