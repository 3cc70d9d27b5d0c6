//! Error outputs from FactKit.
//!
//! The taxonomy mirrors how errors are handled, not where they occur:
//! validation never leaves the client, authentication failures are healed
//! once by the refresh coordinator, authorization and network failures
//! propagate to the caller for display.

use thiserror::Error;

use crate::role::Role;

/// Error outputs from FactKit.
#[derive(Debug, Error)]
pub enum FactKitError {
    /// A client-side form check failed. Surfaced inline per field and never
    /// sent to the backend.
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// The offending form field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// The backend rejected the presented credentials (401-class) and the
    /// failure could not be healed by a token refresh.
    #[error("authentication failed")]
    Authentication,

    /// The refresh token itself was rejected; the session has been cleared
    /// and the user must log in again.
    #[error("session expired, re-authentication required")]
    SessionExpired,

    /// The operation requires a role the current user does not hold
    /// (403-class or client-side gate). Not retried.
    #[error("insufficient role: requires {required}, user is {actual}")]
    Authorization {
        /// Minimum role the operation requires.
        required: Role,
        /// Role the current user actually holds.
        actual: Role,
    },

    /// No user is logged in for an operation that needs one.
    #[error("not logged in")]
    NotAuthenticated,

    /// Durable storage failed in a way that could not be degraded.
    #[error(transparent)]
    Storage(#[from] factkit_store::StoreError),

    /// Network connection error with details. Generally retry-able by the
    /// user.
    #[error("network_error {url}: {error}")]
    Network {
        /// The URL the request targeted.
        url: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Error detail.
        error: String,
    },

    /// Unexpected error serializing or deserializing a payload.
    #[error("serialization_error: {0}")]
    Serialization(String),

    /// A correction transition that the workflow state machine forbids.
    #[error("invalid correction transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: crate::corrections::CorrectionStatus,
        /// Requested status.
        to: crate::corrections::CorrectionStatus,
    },
}

impl From<serde_json::Error> for FactKitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
