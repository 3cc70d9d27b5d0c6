//! Change notification events.

/// A mutation observed on a credential store.
///
/// Events are broadcast to every subscriber returned by
/// [`crate::CredentialStore::changes`]. Receivers that lag are allowed to
/// miss intermediate events; the terminal state can always be recovered with
/// a `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// A full session (user + token pair) was written.
    Persisted,
    /// Only the access token was replaced, after a refresh exchange.
    AccessTokenUpdated,
    /// The session was removed. Holders should drop their in-memory session.
    Cleared,
}
