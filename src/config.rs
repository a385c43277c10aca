//! Application Configuration
//!
//! All configuration values are loaded from environment variables once, in
//! `main`, and handed to the services at construction. No service reads the
//! environment on its own.

use crate::error::ApiError;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Session tokens are valid for 23 hours unless overridden.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 23;

/// Uploaded avatars are normalized to a square of this many pixels.
pub const DEFAULT_AVATAR_SIZE: u32 = 250;

/// Outbound SMTP settings. Only present when `SMTP_HOST` is set.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

/// Application configuration loaded from environment
#[derive(Clone)]
pub struct AppConfig {
    /// Key for signing session tokens (from SECRET_KEY env var)
    pub secret_key: String,

    /// Session token lifetime in hours (from SESSION_TTL_HOURS env var)
    pub session_ttl_hours: i64,

    /// Public base URL used in verification links (from BASE_URL env var)
    pub base_url: String,

    /// Listen port (from PORT env var)
    pub port: u16,

    /// PostgreSQL connection string (from DATABASE_URL env var).
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Directory avatars are published from (from AVATARS_DIR env var)
    pub avatars_dir: PathBuf,

    /// Scratch directory for uploads in flight (from TEMP_DIR env var).
    /// Must live on the same filesystem as `avatars_dir`.
    pub temp_dir: PathBuf,

    /// Avatar edge length in pixels (from AVATAR_SIZE env var)
    pub avatar_size: u32,

    pub smtp: Option<SmtpConfig>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("base_url", &self.base_url)
            .field("port", &self.port)
            .field("database", &self.database_url.as_ref().map(|_| "<set>"))
            .field("argon2_memory_cost", &self.argon2_memory_cost)
            .field("argon2_time_cost", &self.argon2_time_cost)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .field("avatars_dir", &self.avatars_dir)
            .field("temp_dir", &self.temp_dir)
            .field("avatar_size", &self.avatar_size)
            .field("smtp", &self.smtp)
            .finish_non_exhaustive()
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ApiError> {
        let secret_key = env::var("SECRET_KEY")
            .map_err(|_| ApiError::Config("SECRET_KEY environment variable must be set".into()))?;

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", 587),
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                from: env::var("MAIL_FROM").unwrap_or_default(),
            }),
            Err(_) => None,
        };

        let config = Self {
            secret_key,
            session_ttl_hours: parse_or("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS),
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            port: parse_or("PORT", 3000),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            argon2_memory_cost: parse_or("ARGON2_MEMORY_COST", 19456), // 19 MiB
            argon2_time_cost: parse_or("ARGON2_TIME_COST", 2),
            argon2_parallelism: parse_or("ARGON2_PARALLELISM", 1),
            avatars_dir: env::var("AVATARS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public/avatars")),
            temp_dir: env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("tmp")),
            avatar_size: parse_or("AVATAR_SIZE", DEFAULT_AVATAR_SIZE),
            smtp,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.secret_key.len() < 32 {
            return Err(ApiError::Config(
                "SECRET_KEY must be at least 32 characters".to_string(),
            ));
        }

        if self.session_ttl_hours <= 0 {
            return Err(ApiError::Config(
                "SESSION_TTL_HOURS must be positive".to_string(),
            ));
        }

        if self.avatar_size == 0 {
            return Err(ApiError::Config("AVATAR_SIZE must be positive".to_string()));
        }

        if let Some(smtp) = &self.smtp {
            if smtp.from.is_empty() || smtp.username.is_empty() {
                return Err(ApiError::Config(
                    "SMTP_HOST requires SMTP_USERNAME and MAIL_FROM".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            secret_key: "a".repeat(32),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            base_url: "http://localhost:3000".to_string(),
            port: 3000,
            database_url: None,
            argon2_memory_cost: 19456,
            argon2_time_cost: 2,
            argon2_parallelism: 1,
            avatars_dir: PathBuf::from("public/avatars"),
            temp_dir: PathBuf::from("tmp"),
            avatar_size: DEFAULT_AVATAR_SIZE,
            smtp: None,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AppConfig {
            secret_key: "short".to_string(),
            ..config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_partial_smtp() {
        let config = AppConfig {
            smtp: Some(SmtpConfig {
                host: "smtp.example.com".to_string(),
                port: 587,
                username: String::new(),
                password: String::new(),
                from: String::new(),
            }),
            ..config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains(&"a".repeat(32)));
    }
}
