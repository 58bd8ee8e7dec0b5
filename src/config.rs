use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::client::{
    config::{ClientConfig, RequestConfig, DEFAULT_BASE_URL},
    error::{ClientError, Result},
};

/// On-disk client settings, stored as TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerBiConfig {
    /// Power BI API host, e.g. `https://api.powerbi.com`
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for PowerBiConfig {
    fn default() -> Self {
        let request = RequestConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: request.timeout.as_secs(),
            max_retries: request.max_retries,
            initial_backoff_ms: request.initial_backoff.as_millis() as u64,
            max_backoff_ms: request.max_backoff.as_millis() as u64,
        }
    }
}

impl PowerBiConfig {
    /// Client configuration for these settings, validated
    pub fn to_client_config(&self) -> Result<ClientConfig> {
        let config = ClientConfig::with_optional_base_url(Some(self.base_url.trim()))
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_retries(self.max_retries)
            .with_backoff(
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            );

        config.validate()?;
        Ok(config)
    }
}

impl TryFrom<PowerBiConfig> for ClientConfig {
    type Error = ClientError;

    fn try_from(config: PowerBiConfig) -> Result<Self> {
        config.to_client_config()
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join("powerbi-client.toml")
    } else {
        PathBuf::from("powerbi-client.toml")
    }
}

/// Settings from `config_file`; defaults when the file does not exist
pub fn load_config(config_file: &Path) -> Result<PowerBiConfig> {
    if !config_file.exists() {
        return Ok(PowerBiConfig::default());
    }

    confy::load_path(config_file)
        .map_err(|e| ClientError::config(format!("{}: {e}", config_file.display())))
}

pub fn save_config(config_file: &Path, config: &PowerBiConfig) -> Result<()> {
    confy::store_path(config_file, config)
        .map_err(|e| ClientError::config(format!("{}: {e}", config_file.display())))?;

    Ok(())
}
