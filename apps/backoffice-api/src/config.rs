//! Back-office API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

use multas_core::validation::validate_uuid;
use multas_core::{ViabilityPolicy, DEFAULT_TENANT_ID};

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue("MULTAS_ENVIRONMENT".to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

/// Back-office API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub db_path: String,

    pub environment: Environment,

    /// Accept charges below the minimum (flagged instead of rejected).
    /// Never allowed in production.
    pub allow_below_minimum: bool,

    /// Tenant served by this deployment
    pub tenant_id: String,

    /// Upper bound for `limit` on list endpoints
    pub max_page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8080,
            db_path: "./multas.db".to_string(),
            environment: Environment::Development,
            allow_below_minimum: false,
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            max_page_size: 200,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the process environment
    /// in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            http_port: lookup("MULTAS_HTTP_PORT")
                .map(|v| v.trim().parse::<u16>())
                .transpose()
                .map_err(|_| ConfigError::InvalidValue("MULTAS_HTTP_PORT".to_string()))?
                .unwrap_or(defaults.http_port),

            db_path: lookup("MULTAS_DB_PATH")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.db_path),

            environment: lookup("MULTAS_ENVIRONMENT")
                .map(|v| v.parse::<Environment>())
                .transpose()?
                .unwrap_or(defaults.environment),

            allow_below_minimum: lookup("MULTAS_ALLOW_BELOW_MINIMUM")
                .map(|v| parse_bool(&v))
                .transpose()
                .map_err(|_| ConfigError::InvalidValue("MULTAS_ALLOW_BELOW_MINIMUM".to_string()))?
                .unwrap_or(defaults.allow_below_minimum),

            tenant_id: lookup("MULTAS_TENANT_ID")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.tenant_id),

            max_page_size: lookup("MULTAS_MAX_PAGE_SIZE")
                .map(|v| v.trim().parse::<u32>())
                .transpose()
                .map_err(|_| ConfigError::InvalidValue("MULTAS_MAX_PAGE_SIZE".to_string()))?
                .unwrap_or(defaults.max_page_size),
        };

        if validate_uuid(&config.tenant_id).is_err() {
            return Err(ConfigError::InvalidValue("MULTAS_TENANT_ID".to_string()));
        }

        if config.max_page_size == 0 {
            return Err(ConfigError::InvalidValue("MULTAS_MAX_PAGE_SIZE".to_string()));
        }

        if config.allow_below_minimum && config.environment == Environment::Production {
            return Err(ConfigError::BelowMinimumInProduction);
        }

        Ok(config)
    }

    /// What charge creation does with an amount below the minimum.
    pub fn viability_policy(&self) -> ViabilityPolicy {
        if self.allow_below_minimum {
            ViabilityPolicy::Advisory
        } else {
            ViabilityPolicy::Enforce
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.http_port)
    }

    /// Clamps a requested page size to `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<u32>, default: u32) -> u32 {
        requested.unwrap_or(default).clamp(1, self.max_page_size)
    }
}

fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(()),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("MULTAS_ALLOW_BELOW_MINIMUM cannot be enabled in production")]
    BelowMinimumInProduction,
}
