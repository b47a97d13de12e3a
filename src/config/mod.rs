//! Configuration Module
//!
//! Centralized configuration management for the registry service: runtime
//! mode, HTTP server settings and the MongoDB connection.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use crate::database::DatabaseConfig;

/// Errors raised while loading configuration
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },

    #[error("{key} must be a valid URL: {reason}")]
    InvalidUrl { key: &'static str, reason: String },

    #[error("{0}")]
    Rejected(String),
}

/// Environment variable helpers
pub mod env {
    use std::env;
    use std::str::FromStr;

    use super::ConfigError;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get environment variable if it is set and not blank
    pub fn get_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    /// Get required environment variable
    pub fn get_required(key: &str) -> Result<String, ConfigError> {
        get_optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Parse environment variable, falling back to `default` when unset
    pub fn get_parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
        match get_optional(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value,
            }),
        }
    }
}

/// Deployment mode selected through `APP_ENV`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeMode {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl RuntimeMode {
    /// Whether error diagnostics are written to the log
    pub fn emits_diagnostics(self) -> bool {
        self != RuntimeMode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Test => "test",
            RuntimeMode::Staging => "staging",
            RuntimeMode::Production => "production",
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(RuntimeMode::Development),
            "test" => Ok(RuntimeMode::Test),
            "staging" => Ok(RuntimeMode::Staging),
            "production" => Ok(RuntimeMode::Production),
            _ => Err(ConfigError::Invalid {
                key: "APP_ENV".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub mode: RuntimeMode,
    /// Origins allowed to make cross-origin requests
    pub cors_origins: Vec<String>,
    pub frontend_base_url: String,
    /// Request body cap in bytes
    pub max_request_size: usize,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            mode: RuntimeMode::Development,
            cors_origins: Vec::new(),
            frontend_base_url: "http://localhost:5173".to_string(),
            max_request_size: 1024 * 1024, // 1MB
            bcrypt_cost: 10,
        }
    }
}

/// Splits a comma-separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match env::get_optional("APP_ENV") {
            Some(value) => value.parse()?,
            None => RuntimeMode::default(),
        };

        let frontend_base_url = env::get_required("FRONTEND_BASE_URL")?;
        url::Url::parse(&frontend_base_url).map_err(|e| ConfigError::InvalidUrl {
            key: "FRONTEND_BASE_URL",
            reason: e.to_string(),
        })?;

        Ok(Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port: env::get_parsed("PORT", 3000)?,
            log_level: env::get_string("LOG_LEVEL", "info"),
            mode,
            cors_origins: parse_origins(&env::get_required("CORS_ORIGINS")?),
            frontend_base_url,
            max_request_size: env::get_parsed("MAX_REQUEST_SIZE", 1024 * 1024)?,
            bcrypt_cost: env::get_parsed("BCRYPT_COST", 10)?,
        })
    }

    /// Socket address string the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load complete application configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Rejected(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.server.cors_origins.is_empty() {
            return Err(ConfigError::Rejected(
                "CORS_ORIGINS must list at least one origin".to_string(),
            ));
        }

        if self.server.max_request_size == 0 {
            return Err(ConfigError::Rejected(
                "MAX_REQUEST_SIZE must be greater than 0".to_string(),
            ));
        }

        // bcrypt accepts costs 4 through 31
        if !(4..=31).contains(&self.server.bcrypt_cost) {
            return Err(ConfigError::Rejected(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                self.server.bcrypt_cost
            )));
        }

        if self.database.max_pool_size == 0 {
            return Err(ConfigError::Rejected(
                "MONGO_MAX_POOL_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
