//! Error types for the sync engine

use thiserror::Error;

/// Errors raised by the local store.
///
/// These are the only errors in the engine that indicate an invariant
/// violation rather than an expected runtime condition; callers other than
/// tests generally propagate them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("invalid sync status: {0}")]
    InvalidStatus(String),

    #[error("corrupt record in {collection}: {detail}")]
    CorruptRecord { collection: String, detail: String },
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors raised at the remote service boundary.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("{endpoint} failed with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("malformed response body: {0}")]
    Decode(String),
}

/// A remote payload that cannot be mapped into a local record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("{entity} record missing required identifier")]
    MissingId { entity: &'static str },

    #[error("{entity} record {id} missing required field {field}")]
    MissingField {
        entity: &'static str,
        id: String,
        field: &'static str,
    },
}

/// Errors surfaced by the pending action queue.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("submission failed: {0}")]
    Submit(#[from] RemoteError),
}
