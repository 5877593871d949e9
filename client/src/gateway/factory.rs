//! Gateway factory for dependency injection.
//!
//! This module creates gateway instances from runtime configuration.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::config::{ConfigError, GatewayConfig, HttpSettings, API_URL_ENV};
#[cfg(feature = "http-gateway")]
use super::http::HttpGateway;
#[cfg(feature = "local-gateway")]
use super::local::LocalGateway;
use super::traits::ScheduleGateway;

/// Environment variable selecting the gateway implementation.
pub const GATEWAY_TYPE_ENV: &str = "GATEWAY_TYPE";

/// Gateway type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayType {
    /// REST client for the remote scheduling service
    Http,
    /// In-memory local gateway
    Local,
}

impl FromStr for GatewayType {
    type Err = String;

    /// Parse gateway type from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("http", "rest", "local", "memory")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" | "rest" => Ok(Self::Http),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown gateway type: {}", s)),
        }
    }
}

impl GatewayType {
    /// Get gateway type from environment variables.
    ///
    /// Reads `GATEWAY_TYPE`. Without it, defaults to HTTP if
    /// `SCHEDULER_API_URL` is set, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var(GATEWAY_TYPE_ENV) {
            return val.parse().unwrap_or_else(|e| {
                log::warn!("{}; falling back to local gateway", e);
                Self::Local
            });
        }

        if std::env::var(API_URL_ENV).is_ok() {
            Self::Http
        } else {
            Self::Local
        }
    }
}

/// Gateway factory for creating gateway instances.
///
/// # Example
/// ```ignore
/// use event_scheduler::gateway::{GatewayFactory, GatewayType, HttpSettings};
///
/// let gateway = GatewayFactory::create(GatewayType::Http, &HttpSettings::from_env())?;
/// ```
pub struct GatewayFactory;

impl GatewayFactory {
    /// Create a gateway instance based on type.
    ///
    /// # Arguments
    /// * `gateway_type` - Type of gateway to create
    /// * `http` - Settings used by the HTTP gateway
    ///
    /// # Returns
    /// * `Ok(Arc<dyn ScheduleGateway>)` - Gateway instance
    /// * `Err(ConfigError)` - If the type is not compiled in or the client cannot be built
    pub fn create(
        gateway_type: GatewayType,
        http: &HttpSettings,
    ) -> Result<Arc<dyn ScheduleGateway>, ConfigError> {
        match gateway_type {
            GatewayType::Http => {
                #[cfg(feature = "http-gateway")]
                {
                    let gateway = HttpGateway::new(http)
                        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                    log::info!("Using HTTP gateway at {}", gateway.base_url());
                    Ok(Arc::new(gateway))
                }
                #[cfg(not(feature = "http-gateway"))]
                {
                    let _ = http;
                    Err(ConfigError::Invalid(
                        "HTTP gateway feature not enabled".to_string(),
                    ))
                }
            }
            GatewayType::Local => {
                #[cfg(feature = "local-gateway")]
                {
                    log::info!("Using in-memory local gateway");
                    Ok(Arc::new(LocalGateway::new()))
                }
                #[cfg(not(feature = "local-gateway"))]
                {
                    Err(ConfigError::Invalid(
                        "Local gateway feature not enabled".to_string(),
                    ))
                }
            }
        }
    }

    /// Create a gateway from environment variables.
    pub fn from_env() -> Result<Arc<dyn ScheduleGateway>, ConfigError> {
        Self::create(GatewayType::from_env(), &HttpSettings::from_env())
    }

    /// Create a gateway from a loaded configuration.
    pub fn from_gateway_config(
        config: &GatewayConfig,
    ) -> Result<Arc<dyn ScheduleGateway>, ConfigError> {
        Self::create(config.gateway_type()?, &config.http)
    }

    /// Create a gateway from a TOML configuration file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the gateway.toml configuration file
    pub fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> Result<Arc<dyn ScheduleGateway>, ConfigError> {
        let config = GatewayConfig::from_file(config_path)?;
        Self::from_gateway_config(&config)
    }

    /// Create a gateway from `gateway.toml` in a default location, or from
    /// the environment if no such file exists.
    pub fn from_default_config() -> Result<Arc<dyn ScheduleGateway>, ConfigError> {
        match GatewayConfig::from_default_location() {
            Ok(config) => Self::from_gateway_config(&config),
            Err(ConfigError::NotFound) => Self::from_env(),
            Err(e) => Err(e),
        }
    }
}
