//! Authentication for the Duet API
//!
//! Issues and verifies HS256 access/refresh tokens, hashes passwords with
//! argon2id, and provides the `AuthUser` extractor that works with any
//! domain state implementing `FromRef<S>` for `TokenService`.

mod claims;
mod config;
mod context;
mod error;
mod extractors;
mod jwt;
mod password;
mod types;

pub use claims::{TokenClaims, TokenKind};
pub use config::AuthConfig;
pub use context::AuthContext;
pub use error::AuthError;
pub use extractors::AuthUser;
pub use jwt::{extract_bearer_token, TokenService};
pub use password::PasswordHasher;
pub use types::TokenPair;
