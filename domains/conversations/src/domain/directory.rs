//! Conversation lookup and idempotent creation

use std::collections::HashMap;
use std::sync::Arc;

use duet_accounts::{PublicUser, UserStore};
use duet_common::{Error, RepositoryError, Result};
use uuid::Uuid;

use super::entities::{canonical_pair, Conversation, ConversationSummary};
use crate::repository::{ConversationActivity, ConversationStore, MembershipStore, MessageStore};

/// Finds, creates and lists two-party conversations
#[derive(Clone)]
pub struct ConversationDirectory {
    conversations: Arc<dyn ConversationStore>,
    membership: Arc<dyn MembershipStore>,
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserStore>,
}

impl ConversationDirectory {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        membership: Arc<dyn MembershipStore>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            conversations,
            membership,
            messages,
            users,
        }
    }

    /// Return the conversation for `{a, b}`, creating it if needed.
    ///
    /// The flag is true only when this call created the conversation.
    pub async fn find_or_create(&self, a: Uuid, b: Uuid) -> Result<(Conversation, bool)> {
        let (low, high) = canonical_pair(a, b)?;

        if let Some(existing) = self.conversations.find_by_pair(low, high).await? {
            return Ok((existing, false));
        }

        let known = self.users.find_many(&[low, high]).await?;
        if known.len() != 2 {
            return Err(Error::NotFound("User not found".to_string()));
        }

        let conversation = Conversation::between(low, high)?;
        match self.conversations.create(&conversation).await {
            Ok(created) => {
                tracing::info!(conversation_id = %created.id, "Conversation created");
                Ok((created, true))
            }
            Err(RepositoryError::AlreadyExists) => {
                // Lost a creation race; the winner's row is authoritative
                let winner = self
                    .conversations
                    .find_by_pair(low, high)
                    .await?
                    .ok_or_else(|| Error::Internal("conversation vanished after conflict".to_string()))?;
                Ok((winner, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Conversations `user_id` participates in, most recent activity first
    pub async fn list_for(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        let activity = self.conversations.list_for_user(user_id).await?;
        self.summarize(activity).await
    }

    /// A single conversation, visible to its participants only.
    ///
    /// Unknown ids are reported as forbidden so existence is not revealed.
    pub async fn get_for(&self, conversation_id: Uuid, requester: Uuid) -> Result<ConversationSummary> {
        if !self
            .membership
            .is_participant(conversation_id, requester)
            .await?
        {
            return Err(Error::forbidden());
        }

        let conversation = self
            .conversations
            .find(conversation_id)
            .await?
            .ok_or_else(Error::forbidden)?;
        self.summary_of(conversation).await
    }

    /// Summary for a conversation the caller just found or created
    pub async fn summary_of(&self, conversation: Conversation) -> Result<ConversationSummary> {
        let last_message = self
            .messages
            .page(conversation.id, 1, None)
            .await?
            .into_iter()
            .next();
        let mut summaries = self
            .summarize(vec![ConversationActivity {
                conversation,
                last_message,
            }])
            .await?;
        summaries
            .pop()
            .ok_or_else(|| Error::Internal("summary missing".to_string()))
    }

    async fn summarize(&self, activity: Vec<ConversationActivity>) -> Result<Vec<ConversationSummary>> {
        let mut ids: Vec<Uuid> = activity
            .iter()
            .flat_map(|a| a.conversation.participant_ids())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let profiles: HashMap<Uuid, PublicUser> = self
            .users
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, PublicUser::from(u)))
            .collect();

        Ok(activity
            .into_iter()
            .map(|a| ConversationSummary {
                id: a.conversation.id,
                created_at: a.conversation.created_at,
                participants: a
                    .conversation
                    .participant_ids()
                    .iter()
                    .filter_map(|id| profiles.get(id).cloned())
                    .collect(),
                last_message: a.last_message,
            })
            .collect())
    }
}
