//! Live channel wire protocol
//!
//! JSON text frames tagged by `event`, payload fields in camelCase.

use duet_conversations::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    #[serde(rename = "auth")]
    Auth { token: String },

    #[serde(rename = "room:join")]
    Join { conversation_id: Uuid },

    #[serde(rename = "room:leave")]
    Leave { conversation_id: Uuid },

    #[serde(rename = "ping")]
    Ping,
}

/// Frames sent by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    #[serde(rename = "auth:ok")]
    AuthOk { user_id: Uuid },

    #[serde(rename = "room:joined")]
    Joined { conversation_id: Uuid },

    #[serde(rename = "room:left")]
    Left { conversation_id: Uuid },

    #[serde(rename = "message:new")]
    MessageNew { message: Message },

    #[serde(rename = "pong")]
    Pong,

    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
