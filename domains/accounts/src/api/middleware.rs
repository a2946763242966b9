//! Accounts domain state and token service integration

use crate::api::cookie::RefreshCookie;
use crate::UserStore;
use axum::extract::FromRef;
use duet_auth::{PasswordHasher, TokenService};
use std::sync::Arc;

/// Application state for the Accounts domain
#[derive(Clone)]
pub struct AccountsState {
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub hasher: PasswordHasher,
    pub cookie: RefreshCookie,
}

impl FromRef<AccountsState> for TokenService {
    fn from_ref(state: &AccountsState) -> Self {
        state.tokens.clone()
    }
}
