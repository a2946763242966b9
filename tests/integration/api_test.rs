//! API endpoint integration tests
//!
//! Drives the composed router over in-memory stores: auth, users,
//! conversations, messages and cross-cutting invariants.

#![allow(dead_code)]

mod auth;
mod common;
mod conversations;
mod invariants;
mod messages;
mod users;
