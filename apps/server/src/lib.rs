//! # Hooklift Server
//!
//! Loads a hooklift instance with the built-in hooks and keeps it alive until
//! the process is asked to stop.
//!
//! ## Example
//! ```no_run
//! use hooklift_server::Server;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder().build().await?.run().await
//! }
//! ```

use anyhow::{Context, Result};
use hooklift::domain::settings::LogSettings;
use hooklift::kernel::config::{ConfigSource, FileConfigSource};
use hooklift::prelude::Instance;
use hooklift_logger::{LevelFilter, Logger, LoggerBuilder, Named};
use serde_json::Value;
use std::str::FromStr;
use tokio::signal;
use tracing::{error, info};

/// A fluent builder for configuring and loading the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    source: Option<Box<dyn ConfigSource>>,
    config_override: Option<Value>,
}

impl ServerBuilder {
    /// Replaces the default `hooklift.*` file plus `HOOKLIFT__*` environment source.
    pub fn config_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn config_override(mut self, config_override: Value) -> Self {
        self.config_override = Some(config_override);
        self
    }

    /// Consumes the builder and loads the instance.
    ///
    /// # Errors
    /// Returns the load failure wrapped with context; the underlying
    /// [`hooklift::BootstrapError`] stays reachable through `downcast_ref`.
    pub async fn build(self) -> Result<Server> {
        let mut bootstrap = hooklift::bootstrap();
        if let Some(source) = self.source {
            bootstrap = bootstrap.config_source(BoxedSource(source));
        }
        if let Some(config_override) = self.config_override {
            bootstrap = bootstrap.config_override(config_override);
        }

        let instance = bootstrap.load().await.context("Hooklift bootstrap failed")?;

        for (id, middleware) in instance.registry.iter() {
            info!(hook = %id, handlers = ?middleware.names().collect::<Vec<_>>(), "Hook registered");
        }
        for route in instance.routes.iter() {
            let chain: Vec<&str> = route.targets().collect();
            info!(method = %route.method(), path = %route.path(), chain = ?chain, "Route bound");
        }

        Ok(Server { instance })
    }
}

#[derive(Debug)]
struct BoxedSource(Box<dyn ConfigSource>);

impl ConfigSource for BoxedSource {
    fn load(&self) -> Result<Value, hooklift::BootstrapError> {
        self.0.load()
    }
}

/// A loaded instance waiting for a shutdown signal.
#[must_use = "call .run().await to keep the instance alive"]
#[derive(Debug)]
pub struct Server {
    instance: Instance,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    #[must_use]
    pub const fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Runs until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    /// Returns an error if the signal handlers cannot be installed.
    pub async fn run(self) -> Result<()> {
        info!(hooks = ?self.instance.hooks.active_ids(), "Hooklift server running");

        if let Err(err) = shutdown_signal().await {
            error!("Error while waiting for shutdown signal: {err}");
            return Err(err);
        }

        info!("Shutdown signal received, releasing instance");
        drop(self.instance);
        Ok(())
    }
}

/// Maps the `log` settings section onto a logger builder named `name`.
///
/// # Errors
/// Returns an error when `settings.level` is not a tracing level.
pub fn logger(name: &str, settings: &LogSettings) -> Result<LoggerBuilder<Named>> {
    let level = LevelFilter::from_str(&settings.level)
        .with_context(|| format!("Invalid log level `{}`", settings.level))?;

    let mut builder =
        Logger::builder().name(name).level(level).console(settings.console).json(settings.json);
    if let Some(filter) = &settings.filter {
        builder = builder.env_filter(filter.clone());
    }
    if let Some(directory) = &settings.directory {
        builder = builder.directory(directory.clone());
    }
    Ok(builder)
}

/// Settings as the default source sees them, read before the logger exists.
///
/// # Errors
/// Returns an error when the source cannot be read or decoded.
pub fn preload_settings() -> Result<hooklift::domain::settings::Settings> {
    let raw = FileConfigSource::default().load().context("Failed to read settings")?;
    hooklift::kernel::config::settings_from(raw, None).context("Settings are malformed")
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_is_rejected() {
        let settings = LogSettings { level: "chatty".to_owned(), ..LogSettings::default() };
        let err = logger("test", &settings).unwrap_err();
        assert!(err.to_string().contains("chatty"));
    }

    #[test]
    fn known_levels_map_onto_the_builder() {
        for level in ["trace", "DEBUG", "info", "warn", "error", "off"] {
            let settings = LogSettings { level: level.to_owned(), ..LogSettings::default() };
            assert!(logger("test", &settings).is_ok(), "{level}");
        }
    }
}
