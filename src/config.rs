//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! - Built-in defaults
//! - `modreload.toml`, searched from the current directory upwards
//! - Environment variables
//!
//! # Environment Variables
//!
//! Variables are prefixed with `MODRELOAD_` and use double underscores to
//! separate nested levels:
//! - `MODRELOAD_MONITOR__MODE=events` sets `monitor.mode`
//! - `MODRELOAD_MONITOR__INTERVAL_MS=250` sets `monitor.interval_ms`
//! - `MODRELOAD_LOGGING__DEFAULT=debug` sets `logging.default`
//!
//! # Example
//!
//! ```toml
//! [reload]
//! blacklist = ["vendor", "settings"]
//!
//! [monitor]
//! mode = "poll"
//! interval_ms = 1000
//!
//! [manifest]
//! search_paths = ["modules", "plugins"]
//!
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! modreload = "debug"
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::runtime::ManifestLoader;

/// File name looked up in the current directory and its ancestors.
pub const CONFIG_FILE_NAME: &str = "modreload.toml";

const ENV_PREFIX: &str = "MODRELOAD_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub reload: ReloadConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ReloadConfig {
    /// Modules (and their dotted descendants) that are never reloaded
    #[serde(default)]
    pub blacklist: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Compare modification times at a fixed interval
    #[default]
    Poll,
    /// Subscribe to file system events
    Events,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonitorConfig {
    #[serde(default)]
    pub mode: MonitorMode,

    /// Scan interval for the polling monitor
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Quiet period before an event-reported change is delivered
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ManifestConfig {
    /// Roots searched in order when resolving manifest modules
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,

    /// Manifest file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for everything not listed in `modules`
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `modreload = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_interval_ms() -> u64 {
    1000
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_search_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("modules")]
}
fn default_extension() -> String {
    "toml".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            reload: ReloadConfig::default(),
            monitor: MonitorConfig::default(),
            manifest: ManifestConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: MonitorMode::default(),
            interval_ms: default_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            extension: default_extension(),
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

impl ManifestConfig {
    /// Build a manifest loader over the configured roots.
    pub fn loader(&self) -> ManifestLoader {
        ManifestLoader::new(self.search_paths.iter().cloned()).with_extension(&self.extension)
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive string, e.g. `warn,modreload=debug`.
    pub fn filter_directive(&self) -> String {
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();

        let mut directive = self.default.clone();
        for (module, level) in modules {
            directive.push_str(&format!(",{module}={level}"));
        }
        directive
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = std::env::current_dir()
            .ok()
            .and_then(|dir| Self::find_config_from(&dir))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        Self::load_from(config_path)
    }

    /// Load configuration using a specific file in place of the lookup.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `modreload.toml` in `start` or its closest ancestor.
    pub fn find_config_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}
