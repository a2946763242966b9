//! Room subscription errors

use duet_common::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoomError {
    #[error("Connection is not registered")]
    UnknownConnection,

    #[error("Not a participant")]
    Forbidden,

    #[error("Store unavailable: {0}")]
    Store(#[from] RepositoryError),
}

impl RoomError {
    /// Code carried by the `error` frame sent to the client
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::UnknownConnection => "UNKNOWN_CONNECTION",
            RoomError::Forbidden => "FORBIDDEN",
            RoomError::Store(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Client-facing text; store details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            RoomError::Store(_) => "Store temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<RoomError> for duet_common::Error {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::UnknownConnection => duet_common::Error::NotFound(err.to_string()),
            RoomError::Forbidden => duet_common::Error::forbidden(),
            RoomError::Store(e) => e.into(),
        }
    }
}
