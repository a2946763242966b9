//! Route definitions for the Rooms domain

use axum::{routing::get, Router};

use super::middleware::RoomsState;
use super::ws;

pub fn routes() -> Router<RoomsState> {
    Router::new().route("/ws", get(ws::ws_handler))
}
