//! User directory handlers

use axum::{extract::State, Json};
use duet_auth::AuthUser;
use duet_common::Result;

use crate::api::middleware::AccountsState;
use crate::domain::entities::PublicUser;

/// List every other registered user
pub async fn list_users(
    AuthUser(ctx): AuthUser,
    State(state): State<AccountsState>,
) -> Result<Json<Vec<PublicUser>>> {
    let users = state.users.list_except(ctx.user_id).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}
