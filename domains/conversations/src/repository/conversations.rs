//! PostgreSQL conversation + membership repository

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duet_common::{bounded, RepositoryError};
use sqlx::PgPool;
use uuid::Uuid;

use super::transactions::{insert_conversation_tx, insert_participant_tx};
use super::{ConversationActivity, ConversationStore, MembershipStore};
use crate::domain::entities::{Conversation, Message};

#[derive(Clone)]
pub struct PgConversationStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgConversationStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

/// Conversation joined with its latest message (all message columns nullable)
#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    user_low: Uuid,
    user_high: Uuid,
    created_at: DateTime<Utc>,
    message_id: Option<Uuid>,
    message_sender_id: Option<Uuid>,
    message_content: Option<String>,
    message_sequence: Option<i64>,
    message_created_at: Option<DateTime<Utc>>,
}

impl From<ActivityRow> for ConversationActivity {
    fn from(row: ActivityRow) -> Self {
        let last_message = match (
            row.message_id,
            row.message_sender_id,
            row.message_content,
            row.message_sequence,
            row.message_created_at,
        ) {
            (Some(id), Some(sender_id), Some(content), Some(sequence), Some(created_at)) => {
                Some(Message {
                    id,
                    conversation_id: row.id,
                    sender_id,
                    content,
                    sequence,
                    created_at,
                })
            }
            _ => None,
        };

        ConversationActivity {
            conversation: Conversation {
                id: row.id,
                user_low: row.user_low,
                user_high: row.user_high,
                created_at: row.created_at,
            },
            last_message,
        }
    }
}

#[async_trait]
impl MembershipStore for PgConversationStore {
    async fn is_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        bounded(self.timeout, async {
            let exists = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM participants
                    WHERE conversation_id = $1 AND user_id = $2
                )
                "#,
            )
            .bind(conversation_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

            Ok(exists)
        })
        .await
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn find(&self, id: Uuid) -> Result<Option<Conversation>, RepositoryError> {
        bounded(self.timeout, async {
            let conv = sqlx::query_as::<_, Conversation>(
                r#"
                SELECT id, user_low, user_high, created_at
                FROM conversations
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(conv)
        })
        .await
    }

    async fn find_by_pair(
        &self,
        user_low: Uuid,
        user_high: Uuid,
    ) -> Result<Option<Conversation>, RepositoryError> {
        bounded(self.timeout, async {
            let conv = sqlx::query_as::<_, Conversation>(
                r#"
                SELECT id, user_low, user_high, created_at
                FROM conversations
                WHERE user_low = $1 AND user_high = $2
                "#,
            )
            .bind(user_low)
            .bind(user_high)
            .fetch_optional(&self.pool)
            .await?;

            Ok(conv)
        })
        .await
    }

    async fn create(&self, conversation: &Conversation) -> Result<Conversation, RepositoryError> {
        bounded(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let created = match insert_conversation_tx(&mut tx, conversation).await {
                Ok(created) => created,
                Err(e) => {
                    let err = RepositoryError::from(e);
                    return Err(if err.is_unique_violation() {
                        RepositoryError::AlreadyExists
                    } else {
                        err
                    });
                }
            };
            insert_participant_tx(&mut tx, created.id, created.user_low).await?;
            insert_participant_tx(&mut tx, created.id, created.user_high).await?;

            tx.commit().await?;
            Ok(created)
        })
        .await
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationActivity>, RepositoryError> {
        bounded(self.timeout, async {
            let rows = sqlx::query_as::<_, ActivityRow>(
                r#"
                SELECT c.id, c.user_low, c.user_high, c.created_at,
                       m.id AS message_id,
                       m.sender_id AS message_sender_id,
                       m.content AS message_content,
                       m.sequence AS message_sequence,
                       m.created_at AS message_created_at
                FROM conversations c
                JOIN participants p ON p.conversation_id = c.id AND p.user_id = $1
                LEFT JOIN LATERAL (
                    SELECT id, sender_id, content, sequence, created_at
                    FROM messages
                    WHERE conversation_id = c.id
                    ORDER BY sequence DESC
                    LIMIT 1
                ) m ON TRUE
                ORDER BY COALESCE(m.created_at, c.created_at) DESC, c.id
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

            Ok(rows.into_iter().map(Into::into).collect())
        })
        .await
    }
}
