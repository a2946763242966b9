//! Conversations domain state and token service integration

use crate::{ConversationDirectory, MessageLedger};
use axum::extract::FromRef;
use duet_auth::TokenService;

/// Application state for the Conversations domain
#[derive(Clone)]
pub struct ConversationsState {
    pub directory: ConversationDirectory,
    pub ledger: MessageLedger,
    pub tokens: TokenService,
}

impl FromRef<ConversationsState> for TokenService {
    fn from_ref(state: &ConversationsState) -> Self {
        state.tokens.clone()
    }
}
