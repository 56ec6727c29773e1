//! # Configuration Settings
//!
//! Defines the configuration structure for the taskplane backend. Configuration
//! is assembled once at startup from environment variables and validated before
//! any component is constructed.

use crate::errors::{Result, TaskplaneError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Build the full configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
            auth: AuthConfig::from_env()?,
        };
        config.validate_all()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        // Use validator crate for basic validation
        Validate::validate(self).map_err(TaskplaneError::from)?;

        // Custom validation logic
        self.validate_custom()?;

        Ok(())
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite://") {
            return Err(TaskplaneError::validation(
                "Database URL must start with 'sqlite://'",
            ));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(TaskplaneError::validation(
                "JWT secret must be at least 32 characters long",
            ));
        }

        if self.auth.refresh_token_pepper.len() < 32 {
            return Err(TaskplaneError::validation(
                "Refresh token pepper must be at least 32 characters long",
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Request timeout in seconds
    #[validate(range(
        min = 1,
        max = 300,
        message = "Timeout must be between 1 and 300 seconds"
    ))]
    pub timeout_seconds: u64,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, timeout_seconds: 30, enable_cors: true }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Create ServerConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("TASKPLANE_HOST").unwrap_or(defaults.host);

        let port = std::env::var("TASKPLANE_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let timeout_seconds = std::env::var("TASKPLANE_REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.timeout_seconds);

        let enable_cors = std::env::var("TASKPLANE_ENABLE_CORS")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(defaults.enable_cors);

        Self { host, port, timeout_seconds, enable_cors }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(
        min = 1,
        max = 100,
        message = "Max connections must be between 1 and 100"
    ))]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/taskplane.db".to_string(),
            max_connections: 10,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Create DatabaseConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let url = std::env::var("DATABASE_URL").unwrap_or(defaults.url);

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.max_connections);

        let connect_timeout_seconds = std::env::var("DATABASE_CONNECT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.connect_timeout_seconds);

        let idle_timeout_seconds = std::env::var("DATABASE_IDLE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.idle_timeout_seconds);

        let auto_migrate = std::env::var("DATABASE_AUTO_MIGRATE")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(defaults.auto_migrate);

        Self { url, max_connections, connect_timeout_seconds, idle_timeout_seconds, auto_migrate }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Tracing service name
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { service_name: "taskplane".to_string(), log_level: "info".to_string(), json_logging: false }
    }
}

impl ObservabilityConfig {
    /// Create ObservabilityConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let service_name = std::env::var("TASKPLANE_SERVICE_NAME").unwrap_or(defaults.service_name);

        let log_level = std::env::var("TASKPLANE_LOG_LEVEL").unwrap_or(defaults.log_level);

        let json_logging = std::env::var("TASKPLANE_JSON_LOGGING")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(defaults.json_logging);

        Self { service_name, log_level, json_logging }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// JWT secret for token signing/verification
    #[validate(length(min = 1, message = "JWT secret cannot be empty"))]
    pub jwt_secret: String,

    /// JWT issuer
    #[validate(length(min = 1, message = "JWT issuer cannot be empty"))]
    pub jwt_issuer: String,

    /// JWT audience
    #[validate(length(min = 1, message = "JWT audience cannot be empty"))]
    pub jwt_audience: String,

    /// Access token lifetime in minutes
    #[validate(range(
        min = 1,
        max = 1440,
        message = "Access token TTL must be between 1 minute and 24 hours"
    ))]
    pub access_token_ttl_minutes: u64,

    /// Refresh token lifetime in minutes
    #[validate(range(
        min = 60,
        max = 131_400,
        message = "Refresh token TTL must be between 1 hour and 90 days"
    ))]
    pub refresh_token_ttl_minutes: u64,

    /// Server-held key for the refresh-token digest
    #[validate(length(min = 1, message = "Refresh token pepper cannot be empty"))]
    pub refresh_token_pepper: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "taskplane".to_string(),
            jwt_audience: "taskplane-api".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_minutes: 7 * 24 * 60,
            refresh_token_pepper: String::new(),
        }
    }
}

impl AuthConfig {
    /// Get access token lifetime as Duration
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_minutes * 60)
    }

    /// Get refresh token lifetime as Duration
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_minutes * 60)
    }

    /// Create AuthConfig from environment variables. The signing secret and the
    /// refresh-token pepper have no defaults; startup fails without them.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let jwt_secret = std::env::var("TASKPLANE_JWT_SECRET").map_err(|_| {
            TaskplaneError::config("TASKPLANE_JWT_SECRET environment variable is required")
        })?;

        let refresh_token_pepper = std::env::var("TASKPLANE_REFRESH_TOKEN_PEPPER").map_err(|_| {
            TaskplaneError::config("TASKPLANE_REFRESH_TOKEN_PEPPER environment variable is required")
        })?;

        let jwt_issuer = std::env::var("TASKPLANE_JWT_ISSUER").unwrap_or(defaults.jwt_issuer);

        let jwt_audience = std::env::var("TASKPLANE_JWT_AUDIENCE").unwrap_or(defaults.jwt_audience);

        let access_token_ttl_minutes = std::env::var("TASKPLANE_ACCESS_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.access_token_ttl_minutes);

        let refresh_token_ttl_minutes = std::env::var("TASKPLANE_REFRESH_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.refresh_token_ttl_minutes);

        Ok(Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_ttl_minutes,
            refresh_token_ttl_minutes,
            refresh_token_pepper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                refresh_token_pepper: "fedcba9876543210fedcba9876543210".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(valid_config().validate_all().is_ok());
    }

    #[test]
    fn test_server_config_bind_address() {
        let config = ServerConfig { host: "0.0.0.0".to_string(), port: 8080, ..Default::default() };
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_database_config_timeouts() {
        let config = DatabaseConfig {
            connect_timeout_seconds: 15,
            idle_timeout_seconds: 300,
            ..Default::default()
        };
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(300)));

        let config_no_idle = DatabaseConfig { idle_timeout_seconds: 0, ..Default::default() };
        assert_eq!(config_no_idle.idle_timeout(), None);
    }

    #[test]
    fn test_auth_config_ttls() {
        let config = AuthConfig {
            access_token_ttl_minutes: 15,
            refresh_token_ttl_minutes: 60,
            ..Default::default()
        };
        assert_eq!(config.access_token_ttl(), Duration::from_secs(900));
        assert_eq!(config.refresh_token_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_config_validation_errors() {
        // Short JWT secret
        let mut config = valid_config();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate_all().is_err());

        // Short pepper
        let mut config = valid_config();
        config.auth.refresh_token_pepper = "short".to_string();
        assert!(config.validate_all().is_err());

        // Non-sqlite database URL
        let mut config = valid_config();
        config.database.url = "postgresql://localhost/test".to_string();
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_config_validation_ranges() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(config.validate_all().is_err());

        let mut config = valid_config();
        config.database.max_connections = 0;
        assert!(config.validate_all().is_err());

        let mut config = valid_config();
        config.auth.access_token_ttl_minutes = 0;
        assert!(config.validate_all().is_err());
    }
}
