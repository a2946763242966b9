//! Conversations domain: two-party conversations, membership, message ledger

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::directory::ConversationDirectory;
pub use domain::entities::{Conversation, ConversationSummary, Message};
pub use domain::fanout::MessageFanout;
pub use domain::ledger::MessageLedger;

// Re-export repository types
pub use repository::{
    ConversationStore, InMemoryConversationStore, MembershipStore, MessageStore,
    PgConversationStore, PgMessageStore,
};

// Re-export API types
pub use api::routes;
pub use api::ConversationsState;
