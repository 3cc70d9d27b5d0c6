//! In-memory reactive session state.
//!
//! [`SessionState`] is the single source of truth for "who is logged in".
//! All mutation goes through named operations that write through to the
//! credential store first, then publish a new immutable [`Session`] snapshot
//! on a watch channel. Derived views (current user, role flags) are pure
//! functions of the latest snapshot; subscribers recompute on change instead
//! of polling.

use std::sync::Arc;

use factkit_store::{CredentialStore, StoreEvent};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;

use crate::error::FactKitError;
use crate::role::Role;
use crate::user::User;
use crate::FactKitResult;

/// An immutable snapshot of the current session.
///
/// `is_authenticated` is not stored: it is defined as "user and access token
/// both present" and computed from the snapshot, so it can never drift.
#[derive(Debug, Clone)]
pub struct Session {
    user: Option<User>,
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    is_loading: bool,
}

impl Session {
    /// The empty, not-yet-bootstrapped session.
    fn loading() -> Self {
        Self {
            user: None,
            access_token: None,
            refresh_token: None,
            is_loading: true,
        }
    }

    /// The logged-out session.
    fn empty() -> Self {
        Self {
            user: None,
            access_token: None,
            refresh_token: None,
            is_loading: false,
        }
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether a user is logged in: true iff both the user profile and an
    /// access token are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }

    /// Whether the initial bootstrap from durable storage is still running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Role of the logged-in user, if any.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    /// Whether the logged-in user holds Admin or above.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role().is_some_and(Role::is_admin)
    }

    /// Whether the logged-in user is a super admin.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role() == Some(Role::SuperAdmin)
    }

    /// The current access token, exposed for attaching as a bearer
    /// credential.
    pub(crate) fn bearer(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|t| t.expose_secret().to_string())
    }

    /// The current refresh token, exposed for the refresh exchange.
    pub(crate) fn refresh_token_value(&self) -> Option<String> {
        self.refresh_token
            .as_ref()
            .map(|t| t.expose_secret().to_string())
    }
}

/// Single-writer reactive session state, shared across the client.
///
/// Cloning is cheap; all clones observe the same session.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Inner>,
}

struct Inner {
    tx: watch::Sender<Session>,
    store: Arc<dyn CredentialStore>,
}

impl SessionState {
    /// Creates session state over `store`. The session starts in the
    /// loading state; call [`Self::bootstrap`] to populate it.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (tx, _) = watch::channel(Session::loading());
        Self {
            inner: Arc::new(Inner { tx, store }),
        }
    }

    /// Populates the session from durable storage.
    ///
    /// A stored user profile that cannot be parsed is logged and treated as
    /// absent — corrupted storage degrades to logged-out, it never fails
    /// the bootstrap. A partial record (any of the three keys missing) is
    /// also treated as logged-out: an access token is only trusted alongside
    /// the refresh token persisted with it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself cannot be read.
    pub fn bootstrap(&self) -> FactKitResult<()> {
        self.set_loading(true);
        let stored = self.inner.store.load()?;

        let user = stored.user_json.as_deref().and_then(|raw| {
            match serde_json::from_str::<User>(raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    tracing::warn!(%err, "stored user profile corrupted, starting logged out");
                    None
                }
            }
        });

        let session = match (user, stored.access_token, stored.refresh_token) {
            (Some(user), Some(access), Some(refresh)) => Session {
                user: Some(user),
                access_token: Some(SecretString::from(access)),
                refresh_token: Some(SecretString::from(refresh)),
                is_loading: false,
            },
            _ => Session::empty(),
        };
        self.inner.tx.send_replace(session);
        Ok(())
    }

    /// Establishes a session after login or registration: persists all
    /// three keys atomically, then publishes the authenticated snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails; the in-memory session is left
    /// untouched in that case.
    pub fn set_auth(
        &self,
        user: User,
        access_token: &str,
        refresh_token: &str,
    ) -> FactKitResult<()> {
        let user_json = serde_json::to_string(&user)?;
        self.inner
            .store
            .persist(&user_json, access_token, refresh_token)?;
        self.inner.tx.send_replace(Session {
            user: Some(user),
            access_token: Some(SecretString::from(access_token.to_string())),
            refresh_token: Some(SecretString::from(refresh_token.to_string())),
            is_loading: false,
        });
        Ok(())
    }

    /// Replaces only the access token after a refresh exchange. User and
    /// authentication status are untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails.
    pub fn update_access_token(&self, access_token: &str) -> FactKitResult<()> {
        self.inner.store.persist_access_token(access_token)?;
        self.inner.tx.send_modify(|session| {
            session.access_token = Some(SecretString::from(access_token.to_string()));
        });
        Ok(())
    }

    /// Ends the session: clears durable storage and publishes the empty
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared; the in-memory
    /// session is reset regardless, so the user is logged out either way.
    pub fn clear_auth(&self) -> FactKitResult<()> {
        let result = self.inner.store.clear();
        self.inner.tx.send_replace(Session::empty());
        result.map_err(FactKitError::from)
    }

    /// Toggles the bootstrap-in-flight flag.
    pub fn set_loading(&self, is_loading: bool) {
        self.inner.tx.send_modify(|session| {
            session.is_loading = is_loading;
        });
    }

    /// Subscribes to session changes. The receiver immediately holds the
    /// current snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.tx.subscribe()
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.tx.borrow().clone()
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.tx.borrow().user.clone()
    }

    /// Whether a user is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.tx.borrow().is_authenticated()
    }

    /// Whether the logged-in user holds Admin or above.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.tx.borrow().is_admin()
    }

    /// Whether the logged-in user is a super admin.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.inner.tx.borrow().is_super_admin()
    }

    /// Applies credential-store changes made by other holders of the same
    /// store (another window, another client handle) to this session.
    ///
    /// The subscription is taken before the future is returned, so events
    /// emitted between spawning and the task's first poll are not lost.
    /// Runs until the store's notification channel closes. Spawn it once
    /// per process:
    ///
    /// ```rust,ignore
    /// tokio::spawn(client.session().run_store_listener());
    /// ```
    pub fn run_store_listener(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        use tokio::sync::broadcast::error::RecvError;

        let mut rx = self.inner.store.changes();
        let state = self.clone();
        async move {
            loop {
                match rx.recv().await {
                    Ok(StoreEvent::Cleared) => {
                        // Logout elsewhere: drop the in-memory session
                        // without writing to the store again.
                        state.inner.tx.send_replace(Session::empty());
                    }
                    // A persist from another holder; re-read so every view
                    // of this store converges (last writer wins).
                    Ok(StoreEvent::Persisted | StoreEvent::AccessTokenUpdated)
                    | Err(RecvError::Lagged(_)) => {
                        if let Err(err) = state.bootstrap() {
                            tracing::warn!(%err, "failed to re-load session after external change");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use factkit_store::{MemoryStore, StoredSession};

    use super::*;

    fn test_user(role: Role) -> User {
        User {
            id: uuid::Uuid::new_v4(),
            email: "user@example.com".to_string(),
            role,
            is_active: true,
        }
    }

    fn state() -> SessionState {
        SessionState::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn starts_loading_and_unauthenticated() {
        let state = state();
        let snapshot = state.snapshot();
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_authenticated());
    }

    #[test]
    fn authenticated_invariant_holds_after_every_operation() {
        let state = state();
        state.bootstrap().unwrap();
        assert!(!state.snapshot().is_authenticated());

        state.set_auth(test_user(Role::Submitter), "at", "rt").unwrap();
        let s = state.snapshot();
        assert_eq!(s.is_authenticated(), s.user().is_some() && s.bearer().is_some());
        assert!(s.is_authenticated());

        state.update_access_token("at2").unwrap();
        let s = state.snapshot();
        assert!(s.is_authenticated());
        assert_eq!(s.bearer().as_deref(), Some("at2"));

        state.clear_auth().unwrap();
        let s = state.snapshot();
        assert_eq!(s.is_authenticated(), s.user().is_some() && s.bearer().is_some());
        assert!(!s.is_authenticated());
    }

    #[test]
    fn set_auth_persists_all_three_keys() {
        let store = Arc::new(MemoryStore::new());
        let state = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        state.set_auth(test_user(Role::Reviewer), "access", "refresh").unwrap();

        let stored = store.load().unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("access"));
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh"));
        let user: User = serde_json::from_str(stored.user_json.as_deref().unwrap()).unwrap();
        assert_eq!(user.email, "user@example.com");
    }

    #[test]
    fn bootstrap_with_undefined_user_degrades_to_logged_out() {
        let store = Arc::new(MemoryStore::new());
        store.seed(StoredSession {
            access_token: Some("at".to_string()),
            refresh_token: Some("rt".to_string()),
            user_json: Some("undefined".to_string()),
        });
        let state = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        state.bootstrap().unwrap();
        let s = state.snapshot();
        assert!(!s.is_authenticated());
        assert!(!s.is_loading());
    }

    #[test]
    fn bootstrap_with_corrupt_user_json_does_not_panic() {
        let store = Arc::new(MemoryStore::new());
        store.seed(StoredSession {
            access_token: Some("at".to_string()),
            refresh_token: Some("rt".to_string()),
            user_json: Some("{definitely not json".to_string()),
        });
        let state = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        state.bootstrap().unwrap();
        assert!(!state.is_authenticated());
    }

    #[test]
    fn bootstrap_restores_a_complete_session() {
        let store = Arc::new(MemoryStore::new());
        let seeded = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        seeded.set_auth(test_user(Role::Admin), "at", "rt").unwrap();

        // A second process over the same store.
        let state = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        state.bootstrap().unwrap();
        assert!(state.is_authenticated());
        assert!(state.is_admin());
        assert!(!state.is_super_admin());
    }

    #[test]
    fn derived_role_views_track_the_user() {
        let state = state();
        state.bootstrap().unwrap();
        assert!(!state.is_admin());

        state.set_auth(test_user(Role::SuperAdmin), "at", "rt").unwrap();
        assert!(state.is_admin());
        assert!(state.is_super_admin());

        // Role change replaces the user record wholesale.
        state.set_auth(test_user(Role::Reviewer), "at", "rt").unwrap();
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn subscribers_observe_mutations() {
        let state = state();
        state.bootstrap().unwrap();
        let mut rx = state.subscribe();
        rx.mark_unchanged();

        state.set_auth(test_user(Role::Submitter), "at", "rt").unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_authenticated());

        state.clear_auth().unwrap();
        rx.changed().await.unwrap();
        assert!(!rx.borrow().is_authenticated());
    }

    #[tokio::test]
    async fn external_clear_propagates_through_listener() {
        let store = Arc::new(MemoryStore::new());
        let state = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        state.bootstrap().unwrap();
        state.set_auth(test_user(Role::Submitter), "at", "rt").unwrap();

        let listener = tokio::spawn(state.run_store_listener());

        // Another holder of the same store logs out.
        let other = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        other.clear_auth().unwrap();

        let mut rx = state.subscribe();
        rx.wait_for(|s| !s.is_authenticated()).await.unwrap();
        listener.abort();
    }

    #[tokio::test]
    async fn clear_emitted_before_the_listener_first_runs_is_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let state = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        state.bootstrap().unwrap();
        state.set_auth(test_user(Role::Submitter), "at", "rt").unwrap();

        // The subscription exists as soon as the future does; the clear
        // below lands before the task is ever polled and must still be
        // observed, or this session stays authenticated forever.
        let listener_future = state.run_store_listener();
        let other = SessionState::new(Arc::clone(&store) as Arc<dyn CredentialStore>);
        other.clear_auth().unwrap();
        let listener = tokio::spawn(listener_future);

        let mut rx = state.subscribe();
        rx.wait_for(|s| !s.is_authenticated()).await.unwrap();
        assert!(!state.is_authenticated());
        listener.abort();
    }
}
