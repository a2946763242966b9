//! PostgreSQL message repository

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use duet_common::{bounded, RepositoryError};
use sqlx::PgPool;
use uuid::Uuid;

use super::transactions::{claim_sequence_tx, insert_message_tx};
use super::MessageStore;
use crate::domain::entities::Message;

#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgMessageStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        bounded(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let sequence = claim_sequence_tx(&mut tx, conversation_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;

            let message = Message {
                id: Uuid::new_v4(),
                conversation_id,
                sender_id,
                content: content.to_string(),
                sequence,
                created_at: Utc::now(),
            };
            let created = insert_message_tx(&mut tx, &message).await?;

            tx.commit().await?;
            Ok(created)
        })
        .await
    }

    async fn page(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError> {
        bounded(self.timeout, async {
            let messages = sqlx::query_as::<_, Message>(
                r#"
                SELECT id, conversation_id, sender_id, content, sequence, created_at
                FROM messages
                WHERE conversation_id = $1
                  AND ($2::BIGINT IS NULL OR sequence < $2)
                ORDER BY sequence DESC
                LIMIT $3
                "#,
            )
            .bind(conversation_id)
            .bind(before)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

            Ok(messages)
        })
        .await
    }

    async fn update_owned(
        &self,
        message_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        bounded(self.timeout, async {
            let updated = sqlx::query_as::<_, Message>(
                r#"
                UPDATE messages SET content = $3
                WHERE id = $1 AND sender_id = $2
                RETURNING id, conversation_id, sender_id, content, sequence, created_at
                "#,
            )
            .bind(message_id)
            .bind(sender_id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?;

            Ok(updated)
        })
        .await
    }

    async fn delete_owned(
        &self,
        message_id: Uuid,
        sender_id: Uuid,
    ) -> Result<Option<Message>, RepositoryError> {
        bounded(self.timeout, async {
            let deleted = sqlx::query_as::<_, Message>(
                r#"
                DELETE FROM messages
                WHERE id = $1 AND sender_id = $2
                RETURNING id, conversation_id, sender_id, content, sequence, created_at
                "#,
            )
            .bind(message_id)
            .bind(sender_id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(deleted)
        })
        .await
    }
}
