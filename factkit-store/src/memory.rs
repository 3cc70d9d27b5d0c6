//! In-memory credential store for tests and ephemeral sessions.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::error::{StoreError, StoreResult};
use crate::event::StoreEvent;
use crate::record::StoredSession;
use crate::store::CredentialStore;

/// Process-local store with the same semantics as [`crate::FileStore`],
/// including the sentinel sanitizing on load and change broadcasting.
pub struct MemoryStore {
    record: Mutex<StoredSession>,
    changes_tx: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(16);
        Self {
            record: Mutex::new(StoredSession::default()),
            changes_tx,
        }
    }

    /// Seeds the store with a raw record, as if it had been persisted by an
    /// earlier process. Useful for corruption and bootstrap tests.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    pub fn seed(&self, record: StoredSession) {
        *self.record.lock().expect("memory store poisoned") = record;
    }

    fn guard(&self) -> StoreResult<MutexGuard<'_, StoredSession>> {
        self.record
            .lock()
            .map_err(|_| StoreError::Lock("memory store poisoned".to_string()))
    }

    fn notify(&self, event: StoreEvent) {
        let _ = self.changes_tx.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn persist(
        &self,
        user_json: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> StoreResult<()> {
        *self.guard()? = StoredSession::new(user_json, access_token, refresh_token);
        self.notify(StoreEvent::Persisted);
        Ok(())
    }

    fn persist_access_token(&self, access_token: &str) -> StoreResult<()> {
        let mut record = self.guard()?;
        if record.refresh_token.is_none() {
            return Err(StoreError::NoSession);
        }
        record.access_token = Some(access_token.to_string());
        drop(record);
        self.notify(StoreEvent::AccessTokenUpdated);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        *self.guard()? = StoredSession::default();
        self.notify(StoreEvent::Cleared);
        Ok(())
    }

    fn load(&self) -> StoreResult<StoredSession> {
        Ok(self.guard()?.clone().sanitize())
    }

    fn changes(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes_tx.subscribe()
    }
}
