//! Error types for session persistence.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read/write failures.
    #[error("io error: {0}")]
    Io(String),

    /// Errors coming from the cross-process write lock.
    #[error("store lock error: {0}")]
    Lock(String),

    /// Serialization/deserialization failures of the session document.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An access-token-only update was attempted with no persisted session.
    ///
    /// The access token is never stored without a refresh token that was
    /// written alongside it; a partial update on an empty store would break
    /// that invariant.
    #[error("no persisted session to update")]
    NoSession,
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
