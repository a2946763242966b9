//! API layer for the Accounts domain
//!
//! Contains HTTP handlers, routes, and domain state definition.

pub mod cookie;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use cookie::RefreshCookie;
pub use middleware::AccountsState;
pub use routes::routes;
