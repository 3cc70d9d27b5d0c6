//! Admin user management.
//!
//! Thin Admin-gated wrappers over the user endpoints. Like the correction
//! workflow, every mutation returns the server's record and the caller
//! replaces its copy wholesale — user records are never edited in place.

use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use crate::role::Role;
use crate::user::User;
use crate::{Client, FactKitResult};

pub(crate) const USERS_PATH: &str = "/admin/users";

/// Payload for creating a user.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Initial password.
    pub password: String,
    /// Role to grant.
    pub role: Role,
}

/// Partial update to an existing user. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    /// New role, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Activation toggle, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Client {
    /// Lists all users. Admin-only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FactKitError::Authorization`] below Admin before
    /// any network call; propagates auth/network failures.
    pub async fn list_users(&self) -> FactKitResult<Vec<User>> {
        self.require_role(Role::Admin)?;
        self.send_authorized_json::<(), _>(Method::GET, USERS_PATH, None, Role::Admin)
            .await
    }

    /// Creates a user. Admin-only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FactKitError::Authorization`] below Admin before
    /// any network call; propagates auth/network failures.
    pub async fn create_user(&self, new_user: &NewUser) -> FactKitResult<User> {
        self.require_role(Role::Admin)?;
        self.send_authorized_json(Method::POST, USERS_PATH, Some(new_user), Role::Admin)
            .await
    }

    /// Updates a user and returns the server's record. Admin-only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FactKitError::Authorization`] below Admin before
    /// any network call; propagates auth/network failures.
    pub async fn update_user(&self, id: Uuid, update: &UserUpdate) -> FactKitResult<User> {
        self.require_role(Role::Admin)?;
        let path = format!("{USERS_PATH}/{id}");
        self.send_authorized_json(Method::PATCH, &path, Some(update), Role::Admin)
            .await
    }
}
