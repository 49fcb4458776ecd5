//! # Logger
//!
//! Installs the process-wide `tracing` subscriber for hooklift binaries.
//!
//! Console output is compact and colored; an optional directory adds a
//! daily-rolled file sink (plain or JSON) written through a non-blocking
//! worker. `RUST_LOG` always wins over the programmatic filter.
//!
//! ## Example
//!
//! ```rust
//! # use hooklift_logger::{Logger, LevelFilter};
//! let _logger = Logger::builder()
//!     .name("hooklift-doc")
//!     .level(LevelFilter::DEBUG)
//!     .env_filter("hooklift_kernel=trace")
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const DEFAULT_MAX_FILES: usize = 7;
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where and how log records are written.
#[derive(Debug)]
struct Sinks {
    console: bool,
    directory: Option<PathBuf>,
    rotation: Rotation,
    max_files: usize,
    json: bool,
}

impl Default for Sinks {
    fn default() -> Self {
        Self {
            console: true,
            directory: None,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
        }
    }
}

/// Builder state before a logger name was supplied.
#[derive(Debug)]
pub struct Unnamed;

/// Builder state once a logger name was supplied.
#[derive(Debug)]
pub struct Named(String);

/// Configures the global subscriber. `init` is only available once named.
#[derive(Debug)]
pub struct LoggerBuilder<N = Unnamed> {
    name: N,
    level: LevelFilter,
    env_filter: Option<String>,
    sinks: Sinks,
}

impl LoggerBuilder<Unnamed> {
    /// Names the logger. The name prefixes rolled log files.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<Named> {
        LoggerBuilder {
            name: Named(name.into()),
            level: self.level,
            env_filter: self.env_filter,
            sinks: self.sinks,
        }
    }
}

impl<N> LoggerBuilder<N> {
    /// Minimum level used when neither `RUST_LOG` nor [`Self::env_filter`] says otherwise.
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Programmatic filter directives, e.g. `hooklift_kernel=debug`.
    #[must_use]
    pub fn env_filter(mut self, directives: impl Into<String>) -> Self {
        self.env_filter = Some(directives.into());
        self
    }

    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.sinks.console = enabled;
        self
    }

    /// Writes rolled log files into `directory`, creating it on init.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.sinks.directory = Some(directory.into());
        self
    }

    #[must_use]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.sinks.rotation = rotation;
        self
    }

    #[must_use]
    pub const fn max_files(mut self, max_files: usize) -> Self {
        self.sinks.max_files = max_files;
        self
    }

    /// Emits JSON records in the file sink.
    #[must_use]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.sinks.json = enabled;
        self
    }
}

impl LoggerBuilder<Named> {
    /// Installs the global subscriber.
    ///
    /// Keep the returned [`Logger`] alive; dropping it stops the file worker.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`,
    ///   an unparsable filter, or when every sink is disabled.
    /// * [`LoggerError::Subscriber`] when a global subscriber already exists.
    /// * [`LoggerError::Appender`] when the log directory cannot host rolled files.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let name = self.name.0.trim();
        if name.is_empty() {
            return Err(invalid("logger name cannot be empty"));
        }
        if self.sinks.directory.is_some() && self.sinks.max_files == 0 {
            return Err(invalid("max_files must be greater than zero"));
        }

        let filter = build_filter(self.level, self.env_filter.as_deref())?;
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if self.sinks.console {
            layers.push(fmt::layer().compact().with_ansi(true).boxed());
        }

        let guard = match &self.sinks.directory {
            Some(directory) => {
                let (layer, guard) = file_layer(name, directory, &self.sinks)?;
                layers.push(layer);
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(invalid("no sink enabled, turn on the console or set a directory"));
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .context("installing global subscriber")?;

        Ok(Logger { guard })
    }
}

/// Handle to the installed subscriber; owns the file worker guard, if any.
#[must_use = "Dropping this handle stops the background log writer."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Starts a [`LoggerBuilder`] with console output at `INFO`.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder {
            name: Unnamed,
            level: LevelFilter::INFO,
            env_filter: None,
            sinks: Sinks::default(),
        }
    }

    /// Whether a file sink is active.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::debug!("Flushing log files");
        }
    }
}

fn file_layer(
    name: &str,
    directory: &Path,
    sinks: &Sinks,
) -> Result<(BoxedLayer, WorkerGuard), LoggerError> {
    fs::create_dir_all(directory).map_err(|e| LoggerError::Internal {
        message: e.to_string().into(),
        context: Some(format!("creating {}", directory.display()).into()),
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(sinks.rotation.clone())
        .filename_prefix(name)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(sinks.max_files)
        .build(directory)
        .context("building rolling appender")?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer().with_writer(writer).with_ansi(false);
    let layer = if sinks.json { layer.json().boxed() } else { layer.boxed() };

    Ok((layer, guard))
}

fn build_filter(level: LevelFilter, directives: Option<&str>) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    match directives {
        None => Ok(builder.from_env_lossy()),
        Some(directives) => builder.parse(directives).map_err(|e| LoggerError::InvalidConfiguration {
            message: format!("invalid filter `{directives}`: {e}").into(),
            context: None,
        }),
    }
}

fn invalid(message: &'static str) -> LoggerError {
    LoggerError::InvalidConfiguration { message: message.into(), context: None }
}
