//! Token issuance, verification and bearer header parsing

use std::sync::Arc;

use axum::http::HeaderValue;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::claims::{TokenClaims, TokenKind};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::types::TokenPair;

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Stateless HS256 token service.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for TokenService {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.tokens.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct TokenService {
    config: Arc<AuthConfig>,
    keys: Arc<Keys>,
}

impl std::fmt::Debug for TokenService {
    #[mutants::skip] // Redacting formatter, no behavior to mutate
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.config.issuer)
            .field("access_ttl_secs", &self.config.access_ttl_secs)
            .field("refresh_ttl_secs", &self.config.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        let keys = Keys {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        };
        Self {
            config: Arc::new(config),
            keys: Arc::new(keys),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.issue_access_at(user_id, Utc::now())
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.issue_refresh_at(user_id, Utc::now())
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        Ok(TokenPair {
            access_token: self.issue_access_at(user_id, now)?,
            refresh_token: self.issue_refresh_at(user_id, now)?,
            refresh_ttl_secs: self.config.refresh_ttl_secs,
        })
    }

    pub fn issue_access_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.issue(user_id, TokenKind::Access, now, self.config.access_ttl_secs)
    }

    pub fn issue_refresh_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.issue(user_id, TokenKind::Refresh, now, self.config.refresh_ttl_secs)
    }

    /// Verify an access token and return the user it was issued to
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a refresh token and return the user it was issued to
    pub fn verify_refresh(&self, token: &str) -> Result<Uuid, AuthError> {
        self.verify_refresh_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        self.verify_kind(token, TokenKind::Access, now)
    }

    pub fn verify_refresh_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        self.verify_kind(token, TokenKind::Refresh, now)
    }

    fn issue(
        &self,
        user_id: Uuid,
        typ: TokenKind,
        now: DateTime<Utc>,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            typ,
            jti: Uuid::new_v4().to_string(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding).map_err(|e| {
            tracing::error!(error = %e, "JWT encoding failed");
            AuthError::InvalidToken
        })
    }

    fn verify_kind(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AuthError> {
        // Expiry is checked against the supplied clock below, with zero leeway
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        if let Some(iss) = &self.config.issuer {
            validation.set_issuer(&[iss]);
        }

        let claims = decode::<TokenClaims>(token, &self.keys.decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                AuthError::InvalidToken
            })?
            .claims;

        if claims.exp <= now.timestamp() {
            tracing::debug!(exp = claims.exp, "JWT expired");
            return Err(AuthError::InvalidToken);
        }

        if claims.typ != expected {
            tracing::debug!(typ = ?claims.typ, expected = ?expected, "JWT kind mismatch");
            return Err(AuthError::InvalidToken);
        }

        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(header: &HeaderValue) -> Result<String, AuthError> {
    let header_str = header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorizationFormat)?;

    match header_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::InvalidAuthorizationFormat),
    }
}
