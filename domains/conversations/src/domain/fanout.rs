//! Seam between the message ledger and live delivery

use async_trait::async_trait;
use duet_common::Result;

use super::entities::Message;

/// Delivers a freshly persisted message to whoever is listening live.
///
/// Returns the number of connections the message was handed to.
#[async_trait]
pub trait MessageFanout: Send + Sync {
    async fn fanout(&self, message: &Message) -> Result<usize>;
}

