use thiserror::Error;

/// Errors from repository operations (used by trait definitions in tableside-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A frame that could not be decoded into a protocol message.
///
/// Never fatal: the session logs it and drops the frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not a tagged JSON object: {0}")]
    Malformed(String),

    #[error("invalid '{tag}' frame: {reason}")]
    InvalidFields { tag: String, reason: String },
}

/// Errors surfaced by the session coordination layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to activate session '{session_id}': {source}")]
    Activation {
        session_id: String,
        source: RepositoryError,
    },

    #[error("persistence failed: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("session '{0}' is not running")]
    Unavailable(String),
}
