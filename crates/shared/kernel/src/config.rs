//! Settings loading for the `config` phase.
//!
//! A [`ConfigSource`] yields a raw JSON tree. [`settings_from`] deep-merges the
//! programmatic override into it, records `host` as `explicit_host` and
//! decodes the result into [`Settings`].

use crate::error::{BootstrapError, BootstrapErrorExt};
use config::{Config, Environment, File};
use hooklift_domain::constants::{DEFAULT_SETTINGS_FILE, ENV_PREFIX, ENV_SEPARATOR};
use hooklift_domain::settings::Settings;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::{debug, info};

/// Produces the raw settings tree before the override is applied.
pub trait ConfigSource: Debug + Send + Sync {
    /// # Errors
    /// Returns an error when the underlying source cannot be read.
    fn load(&self) -> Result<Value, BootstrapError>;
}

/// Layered source: a settings file overlaid with `HOOKLIFT__*` environment variables.
///
/// Nested keys use a double underscore, so `HOOKLIFT__READINESS__TIMEOUT_MS=500`
/// sets `readiness.timeout_ms`. Values such as `false` or `500` are parsed.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
    required: bool,
    env_prefix: String,
}

impl Default for FileConfigSource {
    /// Optional `hooklift.*` file in the working directory.
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SETTINGS_FILE),
            required: false,
            env_prefix: ENV_PREFIX.to_owned(),
        }
    }
}

impl FileConfigSource {
    /// A source whose file must exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), required: true, ..Self::default() }
    }

    /// A source that silently skips a missing file.
    pub fn optional(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), required: false, ..Self::default() }
    }

    #[must_use]
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<Value, BootstrapError> {
        info!(path = %self.path.display(), required = self.required, "Loading settings");

        Config::builder()
            .add_source(File::from(self.path.as_path()).required(self.required))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build layered settings")?
            .try_deserialize::<Value>()
            .context("Failed to read layered settings")
    }
}

/// In-memory source, mostly for tests and embedders that own their settings.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource(Value);

impl StaticConfigSource {
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }
}

impl ConfigSource for StaticConfigSource {
    fn load(&self) -> Result<Value, BootstrapError> {
        Ok(self.0.clone())
    }
}

/// Applies `config_override` on top of `base` and decodes the result.
///
/// # Errors
/// * [`BootstrapError::Config`] when the merged tree is not a table.
/// * [`BootstrapError::Decode`] when it does not fit [`Settings`].
pub fn settings_from(base: Value, config_override: Option<Value>) -> Result<Settings, BootstrapError> {
    let mut tree = match base {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    if let Some(config_override) = config_override.filter(|o| !o.is_null()) {
        merge(&mut tree, config_override);
    }

    let Some(table) = tree.as_object_mut() else {
        return Err(BootstrapError::config(format!("settings must be a table, got {tree}")));
    };
    if let Some(host) = table.get("host").filter(|host| !host.is_null()).cloned() {
        debug!(host = %host, "Recording explicit host");
        table.insert("explicit_host".to_owned(), host);
    }

    serde_json::from_value(tree).context("Failed to decode settings")
}

/// Deep-merges `overlay` into `base`. Tables merge key by key; anything else replaces.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}
