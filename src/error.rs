//! Error taxonomy for the console library.

use crate::api::RemoteError;
use crate::models::EntityKind;
use thiserror::Error;

/// Errors raised by the console library.
///
/// Remote failures never abort the process: `Save` and `Delete` are raised
/// after the affected record has been flagged, `Fetch` leaves the previous
/// collection untouched and `Auth` leaves the session without credentials.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Malformed address, prefix, seed or patch.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collection GET failed.
    #[error("fetching {what} failed: {source}")]
    Fetch { what: String, source: RemoteError },

    /// A create or update call failed.
    #[error("saving {kind} '{key}' failed: {source}")]
    Save {
        kind: EntityKind,
        key: String,
        source: RemoteError,
    },

    /// A delete call failed.
    #[error("deleting {kind} '{key}' failed: {source}")]
    Delete {
        kind: EntityKind,
        key: String,
        source: RemoteError,
    },

    /// The credential probe failed.
    #[error("authentication failed: {0}")]
    Auth(RemoteError),

    /// A newer credential was submitted before this probe settled.
    #[error("login superseded by a newer credential")]
    Superseded,

    /// The record already has a request in flight.
    #[error("record #{0} has a request in flight")]
    Busy(usize),

    #[error("no record at index {0}")]
    IndexOutOfRange(usize),

    /// The key field of a persisted record cannot change.
    #[error("key field '{field}' of a persisted record cannot change")]
    ImmutableKey { field: String },

    #[error("{kind} does not support {operation}")]
    Unsupported {
        kind: EntityKind,
        operation: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
