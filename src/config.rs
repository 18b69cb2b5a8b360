//! Layered configuration.
//!
//! Sources, lowest to highest priority:
//! - Default values
//! - TOML file (`.tickline/settings.toml`, searched upward from the current directory)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TICKLINE_` and use double
//! underscores to separate nested levels:
//! - `TICKLINE_PROGRESS__DELAY_MS=50` sets `progress.delay_ms`
//! - `TICKLINE_PROGRESS__DISPLAY=log` sets `progress.display`
//! - `TICKLINE_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

const CONFIG_DIR: &str = ".tickline";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "TICKLINE_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Progress line behaviour
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where rendered progress lines go.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Terminal line on a TTY, log events otherwise.
    #[default]
    Auto,
    Terminal,
    Log,
    None,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProgressConfig {
    /// Milliseconds between two renders of the ticker
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Decimal digits of the percentage
    #[serde(default)]
    pub percent_digits: usize,

    /// How long to wait for the ticker thread to exit
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    #[serde(default)]
    pub display: DisplayMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `tickline::ticker = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_delay_ms() -> u64 {
    100
}
fn default_stop_timeout_ms() -> u64 {
    5_000
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            progress: ProgressConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            percent_digits: 0,
            stop_timeout_ms: default_stop_timeout_ms(),
            display: DisplayMode::Auto,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl ProgressConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> ConfigResult<Self> {
        let config_path =
            Self::find_workspace_config().unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting, single underscore stays in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Find `.tickline/settings.toml` from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let toml_string = self.to_toml()?;
        std::fs::write(path, toml_string).map_err(write_err)
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
