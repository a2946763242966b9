//! In-memory conversation, membership and message store
//!
//! Used when no `DATABASE_URL` is configured and by tests. One lock guards
//! everything, which also serializes sequence assignment.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use duet_common::RepositoryError;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ConversationActivity, ConversationStore, MembershipStore, MessageStore};
use crate::domain::entities::{Conversation, Message};

#[derive(Debug, Default)]
struct Inner {
    conversations: HashMap<Uuid, Conversation>,
    pairs: HashMap<(Uuid, Uuid), Uuid>,
    participants: HashSet<(Uuid, Uuid)>,
    /// Per conversation, ascending by sequence
    messages: HashMap<Uuid, Vec<Message>>,
    /// Last sequence handed out per conversation
    sequences: HashMap<Uuid, i64>,
}

impl Inner {
    fn find_message_mut(&mut self, message_id: Uuid) -> Option<&mut Message> {
        self.messages
            .values_mut()
            .flat_map(|msgs| msgs.iter_mut())
            .find(|m| m.id == message_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    inner: RwLock<Inner>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipStore for InMemoryConversationStore {
    async fn is_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .contains(&(conversation_id, user_id)))
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn find(&self, id: Uuid) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.inner.read().await.conversations.get(&id).cloned())
    }

    async fn find_by_pair(
        &self,
        user_low: Uuid,
        user_high: Uuid,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .pairs
            .get(&(user_low, user_high))
            .and_then(|id| inner.conversations.get(id))
            .cloned())
    }

    async fn create(&self, conversation: &Conversation) -> Result<Conversation, RepositoryError> {
        let mut inner = self.inner.write().await;
        let pair = (conversation.user_low, conversation.user_high);
        if inner.pairs.contains_key(&pair) || inner.conversations.contains_key(&conversation.id) {
            return Err(RepositoryError::AlreadyExists);
        }

        inner.pairs.insert(pair, conversation.id);
        inner
            .conversations
            .insert(conversation.id, conversation.clone());
        for user_id in conversation.participant_ids() {
            inner.participants.insert((conversation.id, user_id));
        }
        Ok(conversation.clone())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationActivity>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut activity: Vec<ConversationActivity> = inner
            .conversations
            .values()
            .filter(|c| inner.participants.contains(&(c.id, user_id)))
            .map(|c| ConversationActivity {
                conversation: c.clone(),
                last_message: inner.messages.get(&c.id).and_then(|m| m.last()).cloned(),
            })
            .collect();

        activity.sort_by(|a, b| {
            b.activity_at()
                .cmp(&a.activity_at())
                .then(a.conversation.id.cmp(&b.conversation.id))
        });
        Ok(activity)
    }
}

#[async_trait]
impl MessageStore for InMemoryConversationStore {
    async fn append(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        let mut inner = self.inner.write().await;
        if !inner.conversations.contains_key(&conversation_id) {
            return Err(RepositoryError::NotFound);
        }

        let counter = inner.sequences.entry(conversation_id).or_insert(0);
        *counter += 1;
        let sequence = *counter;
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            sequence,
            created_at: Utc::now(),
        };
        inner
            .messages
            .entry(conversation_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn page(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let inner = self.inner.read().await;
        let Some(history) = inner.messages.get(&conversation_id) else {
            return Ok(Vec::new());
        };

        Ok(history
            .iter()
            .rev()
            .filter(|m| before.is_none_or(|b| m.sequence < b))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update_owned(
        &self,
        message_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        let mut inner = self.inner.write().await;
        match inner.find_message_mut(message_id) {
            Some(message) if message.sender_id == sender_id => {
                message.content = content.to_string();
                Ok(Some(message.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_owned(
        &self,
        message_id: Uuid,
        sender_id: Uuid,
    ) -> Result<Option<Message>, RepositoryError> {
        let mut inner = self.inner.write().await;
        for history in inner.messages.values_mut() {
            if let Some(pos) = history
                .iter()
                .position(|m| m.id == message_id && m.sender_id == sender_id)
            {
                return Ok(Some(history.remove(pos)));
            }
        }
        Ok(None)
    }
}
