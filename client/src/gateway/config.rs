//! Gateway configuration file support.
//!
//! This module reads the gateway configuration from a TOML file and from
//! environment variables.
//!
//! ```toml
//! [gateway]
//! type = "http"
//!
//! [http]
//! base_url = "http://localhost:8282/api/v1"
//! timeout_secs = 20
//! page_size = 10
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::factory::GatewayType;

/// Environment variable holding the service base URL.
pub const API_URL_ENV: &str = "SCHEDULER_API_URL";
/// Environment variable holding the request timeout, in seconds.
pub const API_TIMEOUT_ENV: &str = "SCHEDULER_API_TIMEOUT";

/// Error raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No gateway.toml found in standard locations")]
    NotFound,

    #[error("Invalid gateway configuration: {0}")]
    Invalid(String),
}

/// Gateway configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub http: HttpSettings,
}

/// Gateway type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(rename = "type")]
    pub gateway_type: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            gateway_type: "local".to_string(),
        }
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_base_url() -> String {
    "http://localhost:8282/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_page_size() -> u32 {
    10
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

impl HttpSettings {
    /// Read settings from `SCHEDULER_API_URL` and `SCHEDULER_API_TIMEOUT`,
    /// falling back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                settings.base_url = url.trim().to_string();
            }
        }
        if let Ok(raw) = std::env::var(API_TIMEOUT_ENV) {
            match raw.trim().parse() {
                Ok(secs) => settings.timeout_secs = secs,
                Err(_) => log::warn!("Ignoring invalid {}='{}'", API_TIMEOUT_ENV, raw),
            }
        }
        settings
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without a trailing slash.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl GatewayConfig {
    /// Load gateway configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(GatewayConfig)` if successful
    /// * `Err(ConfigError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load gateway configuration from the default location.
    ///
    /// Searches for `gateway.toml` in:
    /// 1. Current directory
    /// 2. `client/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let search_paths = [
            PathBuf::from("gateway.toml"),
            PathBuf::from("client/gateway.toml"),
            PathBuf::from("../gateway.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ConfigError::NotFound)
    }

    /// Get the gateway type from configuration.
    pub fn gateway_type(&self) -> Result<GatewayType, ConfigError> {
        GatewayType::from_str(&self.gateway.gateway_type).map_err(ConfigError::Invalid)
    }
}
