//! Rooms domain state and token service integration

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use duet_auth::TokenService;

use crate::router::RoomRouter;

/// Application state for the Rooms domain
#[derive(Clone)]
pub struct RoomsState {
    pub router: Arc<RoomRouter>,
    pub tokens: TokenService,
    /// How long an unauthenticated socket may stay open
    pub handshake_timeout: Duration,
    /// Period of server-sent WebSocket pings
    pub ping_interval: Duration,
}

impl FromRef<RoomsState> for TokenService {
    fn from_ref(state: &RoomsState) -> Self {
        state.tokens.clone()
    }
}
