//! Layered configuration.
//!
//! Sources, highest priority first:
//! 1. `GRC_*` environment variables, `__` separating sections (`GRC_SERVER__PORT=9000`)
//! 2. the TOML file named by `GRC_CONFIG`, or `grcserver.toml` in the working directory
//! 3. built-in defaults

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "grcserver.toml";
pub const DEV_JWT_SECRET: &str = "dev-secret-key-change-in-production-minimum-32-chars";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for evidence file uploads.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "grcserver.db".to_string(),
            pool_size: 8,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_seconds: 8 * 60 * 60,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// An empty JWT secret is replaced by [`DEV_JWT_SECRET`]; callers check
    /// [`AppConfig::uses_dev_secret`] once logging is up.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config: Self = Self::figment().extract()?;
        config.validate()?;
        if config.auth.jwt_secret.is_empty() {
            config.auth.jwt_secret = DEV_JWT_SECRET.to_string();
        }
        Ok(config)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }

    pub fn figment() -> Figment {
        let path = std::env::var("GRC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("GRC_").split("__").ignore(&["config"]))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.pool_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_upload_bytes".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.auth.token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "auth.token_ttl_seconds".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "server.host".to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.pool_size, 8);
        assert!(config.auth.jwt_secret.is_empty());
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                log_level = "debug"
                [server]
                host = "0.0.0.0"
                port = 7000
                "#,
            )?;
            jail.set_env("GRC_SERVER__PORT", "9000");
            jail.set_env("GRC_AUTH__JWT_SECRET", "from-env");

            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.auth.jwt_secret, "from-env");
            assert!(!config.uses_dev_secret());
            Ok(())
        });
    }

    #[test]
    fn test_missing_secret_falls_back() {
        Jail::expect_with(|_jail| {
            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
            assert!(config.uses_dev_secret());
            Ok(())
        });
    }

    #[test]
    fn test_zero_pool_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("GRC_DATABASE__POOL_SIZE", "0");
            assert!(AppConfig::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_upload_limit_from_env() {
        Jail::expect_with(|jail| {
            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.server.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);

            jail.set_env("GRC_SERVER__MAX_UPLOAD_BYTES", "1048576");
            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.server.max_upload_bytes, 1_048_576);

            jail.set_env("GRC_SERVER__MAX_UPLOAD_BYTES", "0");
            assert!(AppConfig::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_bind_addr() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }
}
