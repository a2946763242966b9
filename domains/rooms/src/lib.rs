//! Rooms domain: live delivery of new messages over WebSocket
//!
//! Authenticated connections join one room per conversation they take part
//! in. The `RoomRouter` tracks connections and rooms and is plugged into the
//! message ledger as its `MessageFanout`.

pub mod api;
pub mod error;
pub mod protocol;
pub mod router;
pub mod sweeper;

pub use error::RoomError;
pub use protocol::{ClientEvent, ServerEvent};
pub use router::{ConnectionId, JoinOutcome, RoomRouter, RouterStats};
pub use sweeper::spawn_sweeper;

pub use api::routes;
pub use api::RoomsState;
