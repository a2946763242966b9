//! Repository implementations for the Conversations domain
//!
//! Store traits plus their PostgreSQL and in-memory implementations.

pub mod conversations;
pub mod memory;
pub mod messages;
pub mod transactions;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duet_common::RepositoryError;
use uuid::Uuid;

use crate::domain::entities::{Conversation, Message};

pub use conversations::PgConversationStore;
pub use memory::InMemoryConversationStore;
pub use messages::PgMessageStore;

/// Authoritative participant lookup
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn is_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepositoryError>;
}

/// A conversation together with its newest message
#[derive(Debug, Clone)]
pub struct ConversationActivity {
    pub conversation: Conversation,
    pub last_message: Option<Message>,
}

impl ConversationActivity {
    /// Timestamp conversation lists are ordered by
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.conversation.created_at)
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Conversation>, RepositoryError>;

    /// Exact lookup by canonical `(low, high)` pair
    async fn find_by_pair(
        &self,
        user_low: Uuid,
        user_high: Uuid,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// Insert the conversation and both participant rows atomically.
    /// A taken pair yields `RepositoryError::AlreadyExists`.
    async fn create(&self, conversation: &Conversation) -> Result<Conversation, RepositoryError>;

    /// Conversations `user_id` takes part in, most recent activity first
    async fn list_for_user(&self, user_id: Uuid)
        -> Result<Vec<ConversationActivity>, RepositoryError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message with the conversation's next sequence number
    async fn append(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, RepositoryError>;

    /// Newest first, at most `limit`, strictly below `before` when given
    async fn page(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// Replace content of a message owned by `sender_id`
    async fn update_owned(
        &self,
        message_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Option<Message>, RepositoryError>;

    /// Hard-delete a message owned by `sender_id`, returning the removed row
    async fn delete_owned(
        &self,
        message_id: Uuid,
        sender_id: Uuid,
    ) -> Result<Option<Message>, RepositoryError>;
}
