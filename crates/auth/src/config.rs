//! Authentication configuration

use duet_common::Config;

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
}

impl AuthConfig {
    /// Defaults suitable for tests: 15 minute access, 7 day refresh, cheap hashing
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            issuer: None,
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            password_memory_kib: 8 * 1024,
            password_iterations: 1,
        }
    }
}

impl From<&Config> for AuthConfig {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            issuer: config.jwt_issuer.clone(),
            access_ttl_secs: config.access_token_ttl_secs as i64,
            refresh_ttl_secs: config.refresh_token_ttl_secs as i64,
            password_memory_kib: config.password_memory_kib,
            password_iterations: config.password_iterations,
        }
    }
}
