use crate::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Decoded settings for one load.
///
/// Produced by layering a settings file, `HOOKLIFT__*` environment variables and
/// the programmatic override. Keys the bootstrap does not know are kept in
/// [`Settings::extra`] so hooks can read their own top-level sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hooks: HooksSetting,
    /// Allow-list of hook ids. Kept raw so a malformed value can be reported verbatim.
    pub load_hooks: Option<Value>,
    pub host: Option<String>,
    /// Copy of `host` made while loading, for the networking layer.
    pub explicit_host: Option<String>,
    pub readiness: ReadinessSettings,
    /// `"METHOD /path"` to an ordered chain of `"hook.handler"` targets.
    pub routes: BTreeMap<String, Vec<String>>,
    pub log: LogSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Whether hook loading as a whole is switched off (`hooks = false`).
    #[must_use]
    pub const fn hooks_disabled(&self) -> bool {
        matches!(self.hooks, HooksSetting::Toggle(false))
    }

    /// Options table configured for `id`, if any.
    #[must_use]
    pub fn hook_options(&self, id: &str) -> Option<&Map<String, Value>> {
        match self.hooks.entry(id)? {
            HookEntry::Options(options) => Some(options),
            HookEntry::Toggle(_) => None,
        }
    }
}

/// The `hooks` key: either a global switch or a per-hook table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HooksSetting {
    Toggle(bool),
    Table(BTreeMap<String, HookEntry>),
}

impl Default for HooksSetting {
    fn default() -> Self {
        Self::Table(BTreeMap::new())
    }
}

impl HooksSetting {
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&HookEntry> {
        match self {
            Self::Table(table) => table.get(id),
            Self::Toggle(_) => None,
        }
    }

    /// Ids explicitly set to `false` in the table, in key order.
    pub fn disabled(&self) -> impl Iterator<Item = &str> {
        let table = match self {
            Self::Table(table) => Some(table),
            Self::Toggle(_) => None,
        };
        table
            .into_iter()
            .flatten()
            .filter(|(_, entry)| matches!(entry, HookEntry::Toggle(false)))
            .map(|(id, _)| id.as_str())
    }
}

/// One entry of the `hooks` table: `false` disables the hook, a table configures it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookEntry {
    Toggle(bool),
    Options(Map<String, Value>),
}

/// Readiness barrier tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    /// Cadence at which still-pending hooks are reported.
    pub poll_interval_ms: u64,
    /// Watchdog deadline for every active hook to signal readiness.
    pub timeout_ms: u64,
}

impl ReadinessSettings {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self { poll_interval_ms: DEFAULT_POLL_INTERVAL_MS, timeout_ms: DEFAULT_TIMEOUT_MS }
    }
}

/// The `log` section, applied by binaries when they install the logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub filter: Option<String>,
    pub console: bool,
    pub directory: Option<PathBuf>,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".to_owned(), filter: None, console: true, directory: None, json: false }
    }
}
