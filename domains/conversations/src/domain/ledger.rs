//! Ordered message history with participant-checked writes

use std::collections::HashMap;
use std::sync::Arc;

use duet_common::{Error, Result};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::entities::{validate_content, Message, MAX_PAGE_SIZE};
use super::fanout::MessageFanout;
use crate::repository::{MembershipStore, MessageStore};

/// Appends, pages, edits and deletes messages.
///
/// Every operation re-checks membership against the store; nothing is cached.
/// Appends to one conversation are serialized from persist through fan-out,
/// so listeners see messages in sequence order.
#[derive(Clone)]
pub struct MessageLedger {
    membership: Arc<dyn MembershipStore>,
    messages: Arc<dyn MessageStore>,
    fanout: Arc<dyn MessageFanout>,
    append_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl MessageLedger {
    pub fn new(
        membership: Arc<dyn MembershipStore>,
        messages: Arc<dyn MessageStore>,
        fanout: Arc<dyn MessageFanout>,
    ) -> Self {
        Self {
            membership,
            messages,
            fanout,
            append_locks: Arc::default(),
        }
    }

    /// Exclusive append slot for one conversation.
    ///
    /// Entries nobody holds or waits on are dropped on the way in.
    async fn append_slot(&self, conversation_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.append_locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(conversation_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn ensure_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<()> {
        if self
            .membership
            .is_participant(conversation_id, user_id)
            .await?
        {
            Ok(())
        } else {
            tracing::debug!(
                conversation_id = %conversation_id,
                user_id = %user_id,
                "Rejected non-participant"
            );
            Err(Error::forbidden())
        }
    }

    /// Persist a message, then fan it out once.
    ///
    /// Fan-out failures are logged and never reach the sender.
    pub async fn append(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message> {
        self.ensure_participant(conversation_id, sender_id).await?;
        let content = validate_content(content)?;

        let _slot = self.append_slot(conversation_id).await;
        let message = self
            .messages
            .append(conversation_id, sender_id, &content)
            .await?;

        match self.fanout.fanout(&message).await {
            Ok(delivered) => tracing::debug!(
                message_id = %message.id,
                conversation_id = %conversation_id,
                delivered,
                "Message fanned out"
            ),
            Err(e) => tracing::warn!(
                message_id = %message.id,
                conversation_id = %conversation_id,
                error = %e,
                "Message fan-out failed"
            ),
        }

        Ok(message)
    }

    /// Oldest-first page of at most `limit` messages (clamped to 1..=50),
    /// optionally strictly before sequence `before`.
    pub async fn list(
        &self,
        conversation_id: Uuid,
        requester_id: Uuid,
        limit: Option<i64>,
        before: Option<i64>,
    ) -> Result<Vec<Message>> {
        self.ensure_participant(conversation_id, requester_id).await?;

        let limit = limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let mut page = self.messages.page(conversation_id, limit, before).await?;
        page.reverse();
        Ok(page)
    }

    /// Replace the content of the requester's own message.
    ///
    /// Missing and foreign messages are both reported as forbidden.
    pub async fn edit(&self, message_id: Uuid, requester_id: Uuid, content: &str) -> Result<Message> {
        let content = validate_content(content)?;
        self.messages
            .update_owned(message_id, requester_id, &content)
            .await?
            .ok_or_else(Error::forbidden)
    }

    /// Hard-delete the requester's own message and return it.
    pub async fn delete(&self, message_id: Uuid, requester_id: Uuid) -> Result<Message> {
        let deleted = self
            .messages
            .delete_owned(message_id, requester_id)
            .await?
            .ok_or_else(Error::forbidden)?;
        tracing::debug!(message_id = %deleted.id, "Message deleted");
        Ok(deleted)
    }
}
