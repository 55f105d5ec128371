//! Runtime configuration.
//!
//! Values come from the environment (which the binary seeds from a `.env`
//! file) and can be overridden by CLI flags.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "http://localhost:3000";
pub const DEFAULT_STATE_DIR: &str = ".license_dash";

pub const ENV_API_BASE: &str = "LICENSE_API_BASE";
pub const ENV_STATE_DIR: &str = "LICENSE_DASH_STATE_DIR";
pub const ENV_EXPORT_DIR: &str = "LICENSE_DASH_EXPORT_DIR";
pub const ENV_TIMEOUT: &str = "LICENSE_DASH_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix of every API path. May be empty only for same-origin proxies,
    /// which a terminal client never has, so it defaults to localhost.
    pub api_base: String,
    /// Where the persisted session lives.
    pub state_dir: PathBuf,
    /// Where spreadsheet exports are written.
    pub export_dir: PathBuf,
    /// Request timeout in seconds. `None` leaves it to the network stack.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            export_dir: PathBuf::from("."),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Read the configuration from the process environment. Loading `.env`
    /// is left to the binary.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_base: lookup(ENV_API_BASE).unwrap_or(defaults.api_base),
            state_dir: lookup(ENV_STATE_DIR).map(PathBuf::from).unwrap_or(defaults.state_dir),
            export_dir: lookup(ENV_EXPORT_DIR).map(PathBuf::from).unwrap_or(defaults.export_dir),
            timeout_secs: lookup(ENV_TIMEOUT).and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}
