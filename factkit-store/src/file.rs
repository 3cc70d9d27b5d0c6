//! File-backed credential store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::error::{StoreError, StoreResult};
use crate::event::StoreEvent;
use crate::lock::StoreLock;
use crate::record::StoredSession;
use crate::store::CredentialStore;
use crate::{LOCK_FILENAME, SESSION_FILENAME};

/// Capacity of the change broadcast channel. Lagging receivers recover by
/// re-loading; they do not need every intermediate event.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Durable session persistence backed by a single JSON document.
///
/// All three session keys live in one file so they are always written
/// atomically (temp file + rename). Writes take an exclusive `flock` shared
/// with any other process pointed at the same directory; within the process
/// a mutex serializes the read-modify-write of partial updates.
pub struct FileStore {
    dir: PathBuf,
    lock: StoreLock,
    write_guard: Mutex<()>,
    changes_tx: broadcast::Sender<StoreEvent>,
}

impl FileStore {
    /// Opens (or creates) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or lock file cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let lock = StoreLock::open(&dir.join(LOCK_FILENAME))?;
        let (changes_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            dir,
            lock,
            write_guard: Mutex::new(()),
            changes_tx,
        })
    }

    fn write_serial(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.write_guard
            .lock()
            .map_err(|_| StoreError::Lock("store write guard poisoned".to_string()))
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILENAME)
    }

    /// Reads the document without taking the write lock.
    ///
    /// Any unreadable or unparseable document degrades to an empty session;
    /// corrupted storage must never fail a bootstrap.
    fn read_document(&self) -> StoredSession {
        let path = self.session_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return StoredSession::default(),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "session document unreadable, treating as absent");
                return StoredSession::default();
            }
        };
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(record) => record.sanitize(),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "session document corrupted, treating as absent");
                StoredSession::default()
            }
        }
    }

    fn write_document(&self, record: &StoredSession) -> StoreResult<()> {
        let json = serde_json::to_string(record)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        let path = self.session_path();
        write_atomic(&path, json.as_bytes())
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine; notification is best effort.
        let _ = self.changes_tx.send(event);
    }
}

impl CredentialStore for FileStore {
    fn persist(
        &self,
        user_json: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> StoreResult<()> {
        let _serial = self.write_serial()?;
        let _flock = self.lock.lock()?;
        self.write_document(&StoredSession::new(user_json, access_token, refresh_token))?;
        self.notify(StoreEvent::Persisted);
        Ok(())
    }

    fn persist_access_token(&self, access_token: &str) -> StoreResult<()> {
        let _serial = self.write_serial()?;
        let _flock = self.lock.lock()?;
        let mut record = self.read_document();
        if record.refresh_token.is_none() {
            return Err(StoreError::NoSession);
        }
        record.access_token = Some(access_token.to_string());
        self.write_document(&record)?;
        self.notify(StoreEvent::AccessTokenUpdated);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let _serial = self.write_serial()?;
        let _flock = self.lock.lock()?;
        let path = self.session_path();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        self.notify(StoreEvent::Cleared);
        Ok(())
    }

    fn load(&self) -> StoreResult<StoredSession> {
        Ok(self.read_document())
    }

    fn changes(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes_tx.subscribe()
    }
}

/// Writes bytes to `path` via a sibling temp file and an atomic rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
