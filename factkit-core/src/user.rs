//! The user profile carried by a session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// A platform user, as returned by the backend.
///
/// Owned by the session and never mutated in place: role-changing
/// operations replace the whole record with the server's copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user id.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Role used for every gating decision.
    pub role: Role,
    /// Deactivated users keep their records but cannot act.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}
