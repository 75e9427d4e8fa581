//! CLI configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use letterbox_client::DEFAULT_BASE_URL;
use letterbox_core::DEFAULT_REFRESH_INTERVAL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "LETTERBOX_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// IANA timezone used for schedules. Falls back to `TZ`, then the OS zone.
    #[serde(default)]
    pub timezone: Option<String>,

    /// Per-request timeout in seconds. `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask the backend for a refresh cookie that outlives the session.
    #[serde(default)]
    pub persistent_login: bool,

    /// Background refresh period while signed in.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Logging level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timezone: None,
            timeout_secs: default_timeout_secs(),
            persistent_login: false,
            refresh_interval_secs: default_refresh_interval_secs(),
            log_level: default_log_level(),
            config_path: PathBuf::new(),
        }
    }
}

impl CliConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn refresh_interval(&self) -> Duration {
        if self.refresh_interval_secs == 0 {
            DEFAULT_REFRESH_INTERVAL
        } else {
            Duration::from_secs(self.refresh_interval_secs)
        }
    }
}

/// Load configuration from `LETTERBOX_CONFIG`, the default location, or
/// fall back to defaults.
pub fn load_config() -> Result<CliConfig> {
    let config_path = match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None => default_config_path(),
    };
    load_config_from(&config_path)
}

/// Load configuration from `path`. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<CliConfig> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?
    } else {
        CliConfig::default()
    };

    config.config_path = path.to_path_buf();
    Ok(config)
}

fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("letterbox.toml"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "letterbox", "letterbox")
}
