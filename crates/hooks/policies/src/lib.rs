//! Access policies built on top of the session hook.

use hooklift_domain::constants::{POLICIES, SESSION};
use hooklift_kernel::prelude::*;
use hooklift_session::session_id;
use serde::Deserialize;
use std::sync::Arc;

/// Options read from `hooks.policies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyOptions {
    /// Body message of the `deny` handler.
    pub deny_message: String,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self { deny_message: "forbidden".to_owned() }
    }
}

/// Needs the session hook ready before it initializes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PoliciesHook;

#[must_use]
pub fn hook() -> Arc<dyn Hook> {
    Arc::new(PoliciesHook)
}

#[async_trait]
impl Hook for PoliciesHook {
    fn id(&self) -> &str {
        POLICIES
    }

    fn depends_on(&self) -> &[&'static str] {
        &[SESSION]
    }

    async fn initialize(&self, ctx: HookContext) -> Result<Middleware, HookError> {
        let PolicyOptions { deny_message } = ctx.options_as()?;
        tracing::info!("Policies hook initialized");

        Ok(Middleware::new()
            .with("authenticated", |req: &mut Request| match session_id(req) {
                Some(_) => Flow::Next,
                None => Flow::Respond(Response::error(401, "authentication required")),
            })
            .with("deny", move |_req: &mut Request| {
                Flow::Respond(Response::error(403, &deny_message))
            }))
    }
}
