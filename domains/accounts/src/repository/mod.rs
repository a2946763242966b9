//! Repository implementations for the Accounts domain

pub mod memory;
pub mod users;

use async_trait::async_trait;
use duet_common::RepositoryError;
use uuid::Uuid;

use crate::domain::entities::User;

pub use memory::InMemoryUserStore;
pub use users::PgUserStore;

/// Durable user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A taken email yields `RepositoryError::AlreadyExists`.
    async fn create(&self, user: &User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// Lookup by already-normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Users among `ids`; unknown ids are skipped
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepositoryError>;

    /// Every user except `id`, ordered by name
    async fn list_except(&self, id: Uuid) -> Result<Vec<User>, RepositoryError>;
}
