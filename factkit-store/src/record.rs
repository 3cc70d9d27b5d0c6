//! The persisted session document.

use serde::{Deserialize, Serialize};

/// Sentinel payloads some storage layers write for an absent value.
///
/// A user slot holding one of these is treated as empty rather than handed
/// to the profile parser, so a corrupted write can never take down a session
/// bootstrap.
const ABSENT_SENTINELS: &[&str] = &["", "null", "undefined"];

/// The three logical session keys, loaded as one unit.
///
/// The store persists the user profile as an opaque serialized string; the
/// SDK core owns its schema. Absence of any key means "no session" for that
/// key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Short-lived bearer credential, if a session is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Long-lived refresh credential, if a session is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Serialized user profile, if a session is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_json: Option<String>,
}

impl StoredSession {
    /// Builds a complete session record from the three keys.
    #[must_use]
    pub fn new(user_json: &str, access_token: &str, refresh_token: &str) -> Self {
        Self {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
            user_json: Some(user_json.to_string()),
        }
    }

    /// Whether all three keys are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some() && self.user_json.is_some()
    }

    /// Drops sentinel values that stand in for an absent field.
    ///
    /// Applied on every load so callers only ever see a user payload that is
    /// worth parsing.
    pub(crate) fn sanitize(mut self) -> Self {
        let is_absent =
            |v: &Option<String>| v.as_deref().is_some_and(|s| ABSENT_SENTINELS.contains(&s));
        if is_absent(&self.user_json) {
            tracing::warn!("stored user profile is a null sentinel, treating as absent");
            self.user_json = None;
        }
        if is_absent(&self.access_token) {
            self.access_token = None;
        }
        if is_absent(&self.refresh_token) {
            self.refresh_token = None;
        }
        self
    }
}
