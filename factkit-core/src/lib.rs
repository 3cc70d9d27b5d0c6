//! Client SDK core for the FactKit fact-checking platform.
//!
//! FactKit owns the parts of the client with real state-machine and
//! failure-handling complexity: the session/authentication lifecycle
//! ([`session::SessionState`]), transparent access-token refresh
//! ([`Client::send_authorized`]), route-level access gating
//! ([`guard::RouteGuard`]) and the correction-review workflow
//! ([`corrections`]). The backend is a black box reached over HTTP+JSON;
//! tokens are opaque bearer values understood only by the backend.

use std::sync::Arc;

use factkit_store::CredentialStore;
use tokio::sync::Mutex;

mod admin;
mod auth;
mod config;
mod corrections;
mod error;
mod guard;
mod http;
mod refresh;
mod role;
mod session;
mod user;

pub use admin::{NewUser, UserUpdate};
pub use auth::AuthResponse;
pub use config::{Config, Environment};
pub use corrections::{
    CorrectionRequest, CorrectionStatus, CorrectionType, PendingCorrections,
};
pub use error::FactKitError;
pub use guard::{GuardOutcome, Navigation, RouteGuard, RouteRequirement};
pub use role::Role;
pub use session::{Session, SessionState};
pub use user::User;

/// Result type used throughout the SDK.
pub type FactKitResult<T, E = FactKitError> = std::result::Result<T, E>;

/// Handle to the FactKit backend for one client process.
///
/// The client carries the session state, the credential store and the HTTP
/// plumbing; all API operations hang off it. It is cheap to share behind an
/// [`Arc`].
pub struct Client {
    config: Config,
    http: http::Request,
    session: SessionState,
    guard: RouteGuard,
    store: Arc<dyn CredentialStore>,
    /// Guards the refresh exchange: at most one in flight per session.
    refresh_lock: Mutex<()>,
}

impl Client {
    /// Creates a client over `store` for the backend selected by `config`.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn CredentialStore>) -> Self {
        let session = SessionState::new(Arc::clone(&store));
        let guard = RouteGuard::new(session.clone());
        Self {
            config,
            http: http::Request::new(),
            session,
            guard,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// The reactive session state backing this client.
    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// A route guard evaluating against this client's session.
    ///
    /// Every handle returned here shares one navigation generation, so a
    /// navigation begun on any of them supersedes evaluations pending on
    /// the others.
    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        self.guard.clone()
    }

    /// The credential store backing this client.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }
}
