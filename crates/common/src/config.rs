//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PostgreSQL connection URL; absent means in-memory stores
    pub database_url: Option<String>,

    /// HS256 signing secret
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,

    /// Allowed CORS origin
    pub frontend_url: Option<String>,

    /// Argon2 cost parameters
    pub password_memory_kib: u32,
    pub password_iterations: u32,

    /// Mark the refresh cookie `Secure`
    pub cookie_secure: bool,

    pub store_timeout_ms: u64,

    /// Live channel timings
    pub heartbeat_interval_secs: u64,
    pub heartbeat_timeout_secs: u64,
    pub handshake_timeout_secs: u64,

    /// Runtime configuration
    pub log_format: LogFormat,
    pub rust_log: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret =
            non_empty("JWT_SECRET").ok_or_else(|| anyhow::anyhow!("JWT_SECRET is required"))?;

        let log_format = match non_empty("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let config = Self {
            database_url: non_empty("DATABASE_URL"),

            jwt_secret,
            jwt_issuer: non_empty("JWT_ISSUER"),
            access_token_ttl_secs: parse_or(&lookup, "ACCESS_TOKEN_TTL_SECS", 15 * 60)?,
            refresh_token_ttl_secs: parse_or(&lookup, "REFRESH_TOKEN_TTL_SECS", 7 * 24 * 60 * 60)?,

            frontend_url: non_empty("FRONTEND_URL"),

            password_memory_kib: parse_or(&lookup, "PASSWORD_MEMORY_KIB", 19 * 1024)?,
            password_iterations: parse_or(&lookup, "PASSWORD_ITERATIONS", 2)?,

            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,

            store_timeout_ms: parse_or(&lookup, "STORE_TIMEOUT_MS", 5000)?,

            heartbeat_interval_secs: parse_or(&lookup, "HEARTBEAT_INTERVAL_SECS", 25)?,
            heartbeat_timeout_secs: parse_or(&lookup, "HEARTBEAT_TIMEOUT_SECS", 60)?,
            handshake_timeout_secs: parse_or(&lookup, "HANDSHAKE_TIMEOUT_SECS", 10)?,

            log_format,
            rust_log: non_empty("RUST_LOG").unwrap_or_else(|| "duet=debug,info".to_string()),
            port: parse_or(&lookup, "PORT", 5000)?,
        };

        if config.heartbeat_interval_secs == 0 {
            anyhow::bail!("HEARTBEAT_INTERVAL_SECS must be at least 1");
        }

        if config.heartbeat_timeout_secs <= config.heartbeat_interval_secs {
            anyhow::bail!(
                "HEARTBEAT_TIMEOUT_SECS ({}) must exceed HEARTBEAT_INTERVAL_SECS ({})",
                config.heartbeat_timeout_secs,
                config.heartbeat_interval_secs
            );
        }

        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
