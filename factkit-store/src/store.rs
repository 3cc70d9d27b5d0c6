//! The credential store interface.

use tokio::sync::broadcast;

use crate::error::StoreResult;
use crate::event::StoreEvent;
use crate::record::StoredSession;

/// Durable persistence of the current session.
///
/// Implementations must write the three session keys atomically: a load must
/// never observe an access token without the refresh token persisted in the
/// same write. All methods are synchronous; implementations are expected to
/// be cheap enough to call from async contexts without offloading.
pub trait CredentialStore: Send + Sync {
    /// Persists a full session: user profile, access token and refresh token
    /// in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn persist(&self, user_json: &str, access_token: &str, refresh_token: &str)
        -> StoreResult<()>;

    /// Replaces only the access token after a refresh exchange. The refresh
    /// token and user profile are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NoSession`] if no session is persisted,
    /// or an error if the write fails.
    fn persist_access_token(&self, access_token: &str) -> StoreResult<()>;

    /// Removes all three session keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn clear(&self) -> StoreResult<()>;

    /// Loads the persisted session, sanitized of absent-value sentinels.
    ///
    /// Corrupted documents load as an empty session rather than failing; a
    /// broken store must never prevent the client from starting logged out.
    ///
    /// # Errors
    ///
    /// Returns an error only for environmental failures (e.g. the lock file
    /// cannot be created), never for corrupt content.
    fn load(&self) -> StoreResult<StoredSession>;

    /// Subscribes to mutations of this store.
    fn changes(&self) -> broadcast::Receiver<StoreEvent>;
}
