/// Prefix of environment overrides, e.g. `HOOKLIFT__READINESS__TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "HOOKLIFT";
/// Separator between nested keys in environment overrides.
pub const ENV_SEPARATOR: &str = "__";
/// Settings file looked up when no path is given (any extension the `config` crate knows).
pub const DEFAULT_SETTINGS_FILE: &str = "hooklift";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 150;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

// Bootstrap phases, in dependency order.
pub const PHASE_CONFIG: &str = "config";
pub const PHASE_HOOKS: &str = "hooks";
pub const PHASE_REGISTRY: &str = "registry";
pub const PHASE_ROUTING: &str = "routing";

// Built-in hook ids.
pub const SESSION: &str = "session";
pub const POLICIES: &str = "policies";
pub const CORS: &str = "cors";
