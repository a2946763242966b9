//! Domain layer for the Conversations domain

pub mod directory;
pub mod entities;
pub mod fanout;
pub mod ledger;
