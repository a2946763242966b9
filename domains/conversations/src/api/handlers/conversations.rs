//! Conversation API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use duet_auth::AuthUser;
use duet_common::{Error, Result, ValidatedJson};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::ConversationsState;
use crate::domain::entities::ConversationSummary;

/// Request for opening a conversation; must name the caller and one other user
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[validate(length(equal = 2, message = "participantIds must contain exactly two ids"))]
    pub participant_ids: Vec<Uuid>,
}

/// List conversations for the authenticated user
pub async fn list_conversations(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
) -> Result<Json<Vec<ConversationSummary>>> {
    let summaries = state.directory.list_for(ctx.user_id).await?;
    Ok(Json(summaries))
}

/// Find or create the conversation between the caller and another user.
///
/// 201 when created, 200 when it already existed.
pub async fn create_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    ValidatedJson(req): ValidatedJson<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationSummary>)> {
    if !req.participant_ids.contains(&ctx.user_id) {
        return Err(Error::Validation(
            "participantIds must include the caller".to_string(),
        ));
    }

    let [a, b] = [req.participant_ids[0], req.participant_ids[1]];
    let (conversation, created) = state.directory.find_or_create(a, b).await?;
    let summary = state.directory.summary_of(conversation).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(summary)))
}

/// Get a single conversation by ID
pub async fn get_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationSummary>> {
    let summary = state.directory.get_for(id, ctx.user_id).await?;
    Ok(Json(summary))
}
