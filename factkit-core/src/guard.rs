//! Route-level access gating.
//!
//! The guard decides, before a route's own data loading runs, whether the
//! current session may enter it. Two subtleties the naive check gets wrong:
//!
//! * During session bootstrap (`is_loading`) the guard must not guess — it
//!   waits for bootstrap to finish, so a user with a valid persisted
//!   session is never bounced to login by a race.
//! * Evaluations belong to a navigation generation. When a newer navigation
//!   starts before an older evaluation resolves, the older result comes
//!   back [`GuardOutcome::Superseded`] and must be discarded, never applied
//!   to the new route.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::role::Role;
use crate::session::SessionState;

/// What a route declares it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    /// Anyone may enter, logged in or not.
    Public,
    /// Any authenticated user may enter.
    Authenticated,
    /// Only authenticated users with at least this role may enter.
    Role(Role),
}

/// The guard's verdict for one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Navigation may proceed.
    Allow,
    /// No session: go to login, preserving where the user wanted to go.
    RedirectToLogin {
        /// The originally requested path, to return to after login.
        intended: String,
    },
    /// Authenticated but with an insufficient role: go home.
    RedirectToHome,
    /// A newer navigation started while this one was being evaluated.
    /// Callers must discard this result.
    Superseded,
}

/// One pending navigation, tied to the generation current when it began.
#[derive(Debug)]
pub struct Navigation {
    path: String,
    requirement: RouteRequirement,
    generation: u64,
}

impl Navigation {
    /// The path this navigation targets.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Evaluates route requirements against the session.
#[derive(Clone)]
pub struct RouteGuard {
    session: SessionState,
    generation: Arc<AtomicU64>,
}

impl RouteGuard {
    /// Creates a guard over `session`.
    #[must_use]
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts a navigation to `path`. Any evaluation still pending from an
    /// earlier navigation is superseded from this point on.
    pub fn begin(&self, path: &str, requirement: RouteRequirement) -> Navigation {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Navigation {
            path: path.to_string(),
            requirement,
            generation,
        }
    }

    /// Evaluates a navigation, waiting for session bootstrap to finish
    /// first.
    ///
    /// Never returns `Allow` for an unauthenticated user on a protected
    /// route, and never decides while the session is still loading.
    pub async fn evaluate(&self, navigation: &Navigation) -> GuardOutcome {
        let mut rx = self.session.subscribe();
        // Block until bootstrap settles; guessing here would either bypass
        // auth or spuriously redirect a valid session.
        let session = match rx.wait_for(|session| !session.is_loading()).await {
            Ok(session) => session.clone(),
            // Session state dropped mid-navigation; nothing to apply.
            Err(_) => return GuardOutcome::Superseded,
        };

        if self.generation.load(Ordering::SeqCst) != navigation.generation {
            return GuardOutcome::Superseded;
        }

        match navigation.requirement {
            RouteRequirement::Public => GuardOutcome::Allow,
            RouteRequirement::Authenticated => {
                if session.is_authenticated() {
                    GuardOutcome::Allow
                } else {
                    GuardOutcome::RedirectToLogin {
                        intended: navigation.path.clone(),
                    }
                }
            }
            RouteRequirement::Role(required) => {
                if !session.is_authenticated() {
                    return GuardOutcome::RedirectToLogin {
                        intended: navigation.path.clone(),
                    };
                }
                if session.role().is_some_and(|role| role.satisfies(required)) {
                    GuardOutcome::Allow
                } else {
                    GuardOutcome::RedirectToHome
                }
            }
        }
    }
}
