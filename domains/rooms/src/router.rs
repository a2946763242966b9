//! Connection and room registry
//!
//! One `RwLock` guards both the connection table and the room index. The
//! lock is held only for in-memory work; membership lookups run before the
//! write lock is taken.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use duet_conversations::{Message, MembershipStore, MessageFanout};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::error::RoomError;
use crate::protocol::ServerEvent;

/// Outbound frame queue of one connection
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Process-local connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    #[mutants::skip] // Log formatting only
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub connections: usize,
    pub rooms: usize,
}

struct Entry {
    user_id: Uuid,
    sender: EventSender,
    rooms: HashSet<Uuid>,
    last_activity: Instant,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, Entry>,
    rooms: HashMap<Uuid, HashSet<ConnectionId>>,
}

impl Inner {
    /// Drop `conn` from `room`, removing the room once empty
    fn leave_room(&mut self, room: Uuid, conn: ConnectionId) {
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&conn);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
    }

    fn remove_connection(&mut self, conn: ConnectionId) -> Option<Entry> {
        let entry = self.connections.remove(&conn)?;
        for room in &entry.rooms {
            self.leave_room(*room, conn);
        }
        Some(entry)
    }
}

/// Routes persisted messages to the live connections subscribed to their
/// conversation.
pub struct RoomRouter {
    inner: RwLock<Inner>,
    membership: Arc<dyn MembershipStore>,
    next_id: AtomicU64,
}

impl RoomRouter {
    pub fn new(membership: Arc<dyn MembershipStore>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            membership,
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an authenticated connection
    pub async fn register(&self, user_id: Uuid, sender: EventSender) -> ConnectionId {
        let conn = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.write().await;
        inner.connections.insert(
            conn,
            Entry {
                user_id,
                sender,
                rooms: HashSet::new(),
                last_activity: Instant::now(),
            },
        );
        tracing::debug!(conn = %conn, user_id = %user_id, "Connection registered");
        conn
    }

    /// Join the room of `conversation_id` if the connection's user takes
    /// part in it.
    pub async fn subscribe(
        &self,
        conn: ConnectionId,
        conversation_id: Uuid,
    ) -> Result<JoinOutcome, RoomError> {
        let user_id = {
            let inner = self.inner.read().await;
            inner
                .connections
                .get(&conn)
                .map(|entry| entry.user_id)
                .ok_or(RoomError::UnknownConnection)?
        };

        if !self
            .membership
            .is_participant(conversation_id, user_id)
            .await?
        {
            tracing::debug!(
                conn = %conn,
                user_id = %user_id,
                conversation_id = %conversation_id,
                "Refused room join for non-participant"
            );
            return Err(RoomError::Forbidden);
        }

        let mut inner = self.inner.write().await;
        // The connection may have gone away during the membership lookup
        let entry = inner
            .connections
            .get_mut(&conn)
            .ok_or(RoomError::UnknownConnection)?;
        if !entry.rooms.insert(conversation_id) {
            return Ok(JoinOutcome::AlreadyJoined);
        }
        inner.rooms.entry(conversation_id).or_default().insert(conn);

        tracing::debug!(conn = %conn, conversation_id = %conversation_id, "Joined room");
        Ok(JoinOutcome::Joined)
    }

    /// Leave a room. Returns whether the connection was in it.
    pub async fn unsubscribe(
        &self,
        conn: ConnectionId,
        conversation_id: Uuid,
    ) -> Result<bool, RoomError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .connections
            .get_mut(&conn)
            .ok_or(RoomError::UnknownConnection)?;
        let was_member = entry.rooms.remove(&conversation_id);
        if was_member {
            inner.leave_room(conversation_id, conn);
        }
        Ok(was_member)
    }

    /// Forget a connection and every room it was in
    pub async fn disconnect(&self, conn: ConnectionId) {
        let removed = self.inner.write().await.remove_connection(conn);
        if let Some(entry) = removed {
            tracing::debug!(
                conn = %conn,
                user_id = %entry.user_id,
                rooms = entry.rooms.len(),
                "Connection removed"
            );
        }
    }

    /// Record inbound activity on a connection
    pub async fn touch(&self, conn: ConnectionId) {
        if let Some(entry) = self.inner.write().await.connections.get_mut(&conn) {
            entry.last_activity = Instant::now();
        }
    }

    /// Remove connections silent for longer than `max_idle`.
    ///
    /// Dropping the router's sender ends the connection's writer, which
    /// closes the socket.
    pub async fn evict_idle(&self, now: Instant, max_idle: Duration) -> Vec<ConnectionId> {
        let mut inner = self.inner.write().await;
        let idle: Vec<ConnectionId> = inner
            .connections
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.last_activity) > max_idle)
            .map(|(conn, _)| *conn)
            .collect();

        for conn in &idle {
            inner.remove_connection(*conn);
        }
        if !idle.is_empty() {
            tracing::info!(evicted = idle.len(), "Evicted idle connections");
        }
        idle
    }

    /// Deliver `message:new` to every connection in the message's room,
    /// the sender's own connections included. Closed queues are skipped.
    pub async fn deliver(&self, message: &Message) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(&message.conversation_id) else {
            return 0;
        };

        let mut delivered = 0;
        for conn in members {
            let Some(entry) = inner.connections.get(conn) else {
                continue;
            };
            let event = ServerEvent::MessageNew {
                message: message.clone(),
            };
            if entry.sender.send(event).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(conn = %conn, message_id = %message.id, "Skipped closed connection");
            }
        }
        delivered
    }

    pub async fn stats(&self) -> RouterStats {
        let inner = self.inner.read().await;
        RouterStats {
            connections: inner.connections.len(),
            rooms: inner.rooms.len(),
        }
    }
}

#[async_trait]
impl MessageFanout for RoomRouter {
    async fn fanout(&self, message: &Message) -> duet_common::Result<usize> {
        Ok(self.deliver(message).await)
    }
}
