//! API layer for the Rooms domain
//!
//! The `/ws` upgrade endpoint and the per-connection session loop.

pub mod middleware;
pub mod routes;
pub mod ws;

pub use middleware::RoomsState;
pub use routes::routes;
