//! Token issuance results

/// Freshly issued access + refresh credentials
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the refresh token, used for the cookie `Max-Age`
    pub refresh_ttl_secs: i64,
}
