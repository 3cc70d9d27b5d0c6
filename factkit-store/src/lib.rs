//! Durable session persistence for FactKit.
//!
//! The store holds the three logical session keys — access token, refresh
//! token and the serialized user profile — as a single JSON document so that
//! all three are always written atomically. Two implementations are provided:
//!
//! * [`FileStore`]: file-backed, writes via temp-file + rename under an
//!   exclusive cross-process lock. This is what real clients use.
//! * [`MemoryStore`]: process-local, for tests and ephemeral sessions.
//!
//! Every mutation is announced on a broadcast channel (see
//! [`CredentialStore::changes`]), so other holders of the same store — e.g.
//! other windows of the same client process — observe a logout without
//! having to reload.
//!
//! A missing document, an unreadable document, or a user payload that is the
//! literal string `"null"`/`"undefined"` all load as an absent session. The
//! store never fails a session bootstrap over corrupted state; it logs and
//! degrades to logged-out.

mod error;
mod event;
mod file;
mod lock;
mod memory;
mod record;
mod store;

pub use error::{StoreError, StoreResult};
pub use event::StoreEvent;
pub use file::FileStore;
pub use lock::{StoreLock, StoreLockGuard};
pub use memory::MemoryStore;
pub use record::StoredSession;
pub use store::CredentialStore;

/// Filename of the session document inside the store directory.
pub(crate) const SESSION_FILENAME: &str = "session.json";
/// Filename of the cross-process write lock.
pub(crate) const LOCK_FILENAME: &str = "session.lock";
