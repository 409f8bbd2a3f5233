use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ModelKind;
use crate::constants::{
    DEFAULT_API_URL, ENV_PREFIX, HEALTH_PROBE_INTERVAL_SECS, HEALTH_PROBE_TIMEOUT_SECS,
    HTTP_REQUEST_TIMEOUT_SECS,
};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the analysis service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Liveness monitor configuration
    #[serde(default)]
    pub health: HealthConfig,

    /// Analysis request configuration
    #[serde(default)]
    pub requests: RequestConfig,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            health: HealthConfig::default(),
            requests: RequestConfig::default(),
        }
    }
}

/// Liveness monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Seconds between probes
    pub interval_secs: u64,
    /// Upper bound on a single probe
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: HEALTH_PROBE_INTERVAL_SECS,
            timeout_secs: HEALTH_PROBE_TIMEOUT_SECS,
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Analysis request settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Upper bound on a single analysis call
    pub timeout_secs: u64,
    /// Model used for single-review sentiment analysis
    pub default_model: ModelKind,
    /// Model used for batch analysis
    pub batch_model: ModelKind,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
            default_model: ModelKind::Roberta,
            batch_model: ModelKind::Vader,
        }
    }
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let global_config = get_config_dir()?.join("config.toml");
    let local_config = PathBuf::from(".sentiscope/config.toml");

    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if global_config.exists() {
        figment = figment.merge(Toml::file(&global_config));
    }

    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    extract(figment)
}

/// Load configuration from one explicit file, still honoring environment overrides
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path));
    extract(figment)
}

fn extract(figment: Figment) -> Result<Config> {
    // SENTISCOPE_API_URL, SENTISCOPE_HEALTH__INTERVAL_SECS, ...
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Failed to load configuration")
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "sentiscope") {
        Ok(proj_dirs.config_dir().to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        Ok(PathBuf::from(home).join(".config").join("sentiscope"))
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => get_config_dir()?.join("config.toml"),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
///
/// Returns the path of the file and whether it was newly written.
pub fn init_config() -> Result<(PathBuf, bool)> {
    let config_file = get_config_dir()?.join("config.toml");

    if config_file.exists() {
        return Ok((config_file, false));
    }

    save_config(&Config::default(), Some(config_file.clone()))?;
    Ok((config_file, true))
}
