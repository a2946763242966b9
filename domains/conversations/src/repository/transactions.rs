//! Transactional free functions for the Conversations domain

use crate::domain::entities::{Conversation, Message};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Insert a conversation row within an existing transaction.
pub async fn insert_conversation_tx(
    transaction: &mut Transaction<'_, Postgres>,
    conversation: &Conversation,
) -> std::result::Result<Conversation, sqlx::Error> {
    let created = sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (id, user_low, user_high, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_low, user_high, created_at
        "#,
    )
    .bind(conversation.id)
    .bind(conversation.user_low)
    .bind(conversation.user_high)
    .bind(conversation.created_at)
    .fetch_one(&mut **transaction)
    .await?;
    Ok(created)
}

/// Insert a participant row within an existing transaction.
pub async fn insert_participant_tx(
    transaction: &mut Transaction<'_, Postgres>,
    conversation_id: Uuid,
    user_id: Uuid,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO participants (conversation_id, user_id, joined_at)
        VALUES ($1, $2, NOW())
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .execute(&mut **transaction)
    .await?;
    Ok(())
}

/// Claim the conversation's next sequence number.
///
/// The counter update row-locks the conversation until commit, which
/// serializes appends per conversation. Numbers are never reused, even
/// after deletes. `None` when the conversation does not exist.
pub async fn claim_sequence_tx(
    transaction: &mut Transaction<'_, Postgres>,
    conversation_id: Uuid,
) -> std::result::Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE conversations
        SET last_sequence = last_sequence + 1
        WHERE id = $1
        RETURNING last_sequence
        "#,
    )
    .bind(conversation_id)
    .fetch_optional(&mut **transaction)
    .await
}

/// Insert a message within an existing transaction.
pub async fn insert_message_tx(
    transaction: &mut Transaction<'_, Postgres>,
    message: &Message,
) -> std::result::Result<Message, sqlx::Error> {
    let created = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, content, sequence, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, conversation_id, sender_id, content, sequence, created_at
        "#,
    )
    .bind(message.id)
    .bind(message.conversation_id)
    .bind(message.sender_id)
    .bind(&message.content)
    .bind(message.sequence)
    .bind(message.created_at)
    .fetch_one(&mut **transaction)
    .await?;
    Ok(created)
}
