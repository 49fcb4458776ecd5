//! CORS hook.
//!
//! `preflight` answers `OPTIONS` requests with `204` and the allow headers;
//! `headers` queues `access-control-allow-origin` on whatever response ends the chain.

mod error;

pub use crate::error::CorsError;

use crate::error::CorsErrorExt;
use hooklift_domain::constants::CORS;
use hooklift_kernel::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
pub const ALLOW_METHODS: &str = "access-control-allow-methods";
pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
pub const MAX_AGE: &str = "access-control-max-age";

/// Options read from `hooks.cors`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsOptions {
    pub allow_origin: String,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub max_age_secs: Option<u64>,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_owned(),
            allow_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"].map(str::to_owned).to_vec(),
            allow_headers: Vec::new(),
            max_age_secs: None,
        }
    }
}

impl CorsOptions {
    /// Decodes and checks the raw `hooks.cors` table.
    ///
    /// # Errors
    /// Returns [`CorsError::Config`] for an empty origin or method list, or a table that does not decode.
    pub fn from_value(value: Value) -> Result<Self, CorsError> {
        let options: Self = serde_json::from_value(value)
            .map_err(|err| CorsError::config(err.to_string()))
            .context("hooks.cors")?;

        if options.allow_origin.trim().is_empty() {
            return Err(CorsError::config("allow_origin must not be empty"));
        }
        if options.allow_methods.is_empty() {
            return Err(CorsError::config("allow_methods must name at least one method"));
        }
        Ok(options)
    }

    fn preflight_response(&self) -> Response {
        let mut response = Response::no_content();
        let headers = &mut response.headers;
        headers.insert(ALLOW_ORIGIN.to_owned(), self.allow_origin.clone());
        headers.insert(ALLOW_METHODS.to_owned(), self.allow_methods.join(", ").to_ascii_uppercase());
        if !self.allow_headers.is_empty() {
            headers.insert(ALLOW_HEADERS.to_owned(), self.allow_headers.join(", "));
        }
        if let Some(max_age) = self.max_age_secs {
            headers.insert(MAX_AGE.to_owned(), max_age.to_string());
        }
        response
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CorsHook;

#[must_use]
pub fn hook() -> Arc<dyn Hook> {
    Arc::new(CorsHook)
}

#[async_trait]
impl Hook for CorsHook {
    fn id(&self) -> &str {
        CORS
    }

    async fn initialize(&self, ctx: HookContext) -> Result<Middleware, HookError> {
        let options = CorsOptions::from_value(ctx.options().clone())?;
        tracing::info!(allow_origin = %options.allow_origin, "CORS hook initialized");

        let preflight = options.preflight_response();
        let origin = options.allow_origin;

        Ok(Middleware::new()
            .with("preflight", move |req: &mut Request| {
                if req.method == "OPTIONS" {
                    Flow::Respond(preflight.clone())
                } else {
                    Flow::Next
                }
            })
            .with("headers", move |req: &mut Request| {
                req.response_headers.insert(ALLOW_ORIGIN.to_owned(), origin.clone());
                Flow::Next
            }))
    }
}
