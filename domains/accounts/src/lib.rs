//! Accounts domain: registration, login, token refresh, user directory

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{normalize_email, PublicUser, User};

// Re-export repository types
pub use repository::{InMemoryUserStore, PgUserStore, UserStore};

// Re-export API types
pub use api::routes;
pub use api::{AccountsState, RefreshCookie};
