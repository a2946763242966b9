//! Domain entities for the Conversations domain
//!
//! Two-party conversations, their participants, and the ordered message
//! history. Validation rules live next to the types they guard.

use chrono::{DateTime, Utc};
use duet_accounts::PublicUser;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use duet_common::{Error, Result};

/// Maximum message length in characters, measured after trimming
pub const MAX_CONTENT_CHARS: usize = 4000;

/// Largest page `MessageLedger::list` returns
pub const MAX_PAGE_SIZE: i64 = 50;

/// Order a pair so `(a, b)` and `(b, a)` map to the same key.
///
/// Rejects a pair naming the same user twice.
pub fn canonical_pair(a: Uuid, b: Uuid) -> Result<(Uuid, Uuid)> {
    if a == b {
        return Err(Error::Validation(
            "A conversation needs two distinct participants".to_string(),
        ));
    }
    Ok(if a < b { (a, b) } else { (b, a) })
}

/// Trim and bound message content
pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Message content is required".to_string()));
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err(Error::Validation(format!(
            "Message content must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Conversation entity. The participant pair is stored low/high so the
/// database can enforce one conversation per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation between two distinct users
    pub fn between(a: Uuid, b: Uuid) -> Result<Self> {
        let (user_low, user_high) = canonical_pair(a, b)?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_low,
            user_high,
            created_at: Utc::now(),
        })
    }

    pub fn participant_ids(&self) -> [Uuid; 2] {
        [self.user_low, self.user_high]
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    /// Position in the conversation, starting at 1
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

/// A conversation as listed for one of its participants
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<PublicUser>,
    pub last_message: Option<Message>,
}
