//! Domain entities for the Duet accounts domain

use chrono::{DateTime, Utc};
use duet_common::{Error, Result};
use serde::Serialize;
use uuid::Uuid;
use validator::ValidateEmail;

/// Maximum display name length
pub const MAX_NAME_LENGTH: usize = 100;

/// Lowercase and trim an email so lookups are case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User entity
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with validation
    pub fn new(email: &str, name: &str, password_hash: String) -> Result<Self> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(Error::Validation("Invalid email format".to_string()));
        }

        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::Validation(format!(
                "Name must be 1-{} characters",
                MAX_NAME_LENGTH
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            email,
            name: name.to_string(),
            password_hash,
            created_at: Utc::now(),
        })
    }

    pub fn public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// Profile visible to other users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}
