//! Message API handlers

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use duet_auth::AuthUser;
use duet_common::{Error, Result, ValidatedJson};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::api::middleware::ConversationsState;
use crate::domain::entities::{validate_content, Message};

/// Query params for paging a conversation's history
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesQuery {
    pub conversation_id: Uuid,
    pub limit: Option<i64>,
    /// Only messages with a lower sequence number
    pub before: Option<i64>,
}

/// Request for sending a message
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    #[validate(custom(function = "message_content"))]
    pub content: String,
}

/// Request for editing a message
#[derive(Debug, Deserialize, Validate)]
pub struct EditMessageRequest {
    #[validate(custom(function = "message_content"))]
    pub content: String,
}

/// Non-blank and at most 4000 characters once trimmed
fn message_content(content: &str) -> std::result::Result<(), ValidationError> {
    validate_content(content).map(|_| ()).map_err(|_| {
        ValidationError::new("content")
            .with_message("must be 1 to 4000 characters after trimming".into())
    })
}

/// List messages oldest-first
pub async fn list_messages(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    query: std::result::Result<Query<ListMessagesQuery>, QueryRejection>,
) -> Result<Json<Vec<Message>>> {
    let Query(query) = query.map_err(|e| Error::Validation(e.body_text()))?;

    let messages = state
        .ledger
        .list(query.conversation_id, ctx.user_id, query.limit, query.before)
        .await?;
    Ok(Json(messages))
}

/// Send a message; live subscribers receive it as `message:new`
pub async fn send_message(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<Json<Message>> {
    let message = state
        .ledger
        .append(req.conversation_id, ctx.user_id, &req.content)
        .await?;
    Ok(Json(message))
}

/// Edit the caller's own message
pub async fn edit_message(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<EditMessageRequest>,
) -> Result<Json<Message>> {
    let message = state.ledger.edit(id, ctx.user_id, &req.content).await?;
    Ok(Json(message))
}

/// Delete the caller's own message
pub async fn delete_message(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>> {
    let message = state.ledger.delete(id, ctx.user_id).await?;
    Ok(Json(message))
}
