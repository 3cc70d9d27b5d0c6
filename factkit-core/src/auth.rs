//! Registration, login, logout and the refresh exchange.
//!
//! Form validation happens here, client-side, and never reaches the
//! backend. Successful login/registration writes through
//! [`crate::SessionState::set_auth`], which persists all three session keys
//! atomically before the session flips to authenticated.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::FactKitError;
use crate::user::User;
use crate::{Client, FactKitResult};

pub(crate) const LOGIN_PATH: &str = "/auth/login";
pub(crate) const REGISTER_PATH: &str = "/auth/register";
pub(crate) const REFRESH_PATH: &str = "/auth/refresh";
pub(crate) const LOGOUT_PATH: &str = "/auth/logout";

/// Minimum accepted password length for registration.
const MIN_PASSWORD_LEN: usize = 8;

/// Backend response to login and registration.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    /// The authenticated user.
    pub user: User,
    /// Short-lived bearer token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshBody<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
}

impl Client {
    /// Registers a new account and establishes a session.
    ///
    /// # Errors
    ///
    /// Returns [`FactKitError::Validation`] for a malformed email, a short
    /// password, or a password/confirmation mismatch — without contacting
    /// the backend. Propagates network and storage failures otherwise.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        password_confirmation: &str,
    ) -> FactKitResult<User> {
        validate_email(email)?;
        validate_password(password)?;
        if password != password_confirmation {
            return Err(FactKitError::Validation {
                field: "password_confirmation",
                reason: "passwords do not match".to_string(),
            });
        }
        self.authenticate(REGISTER_PATH, email, password).await
    }

    /// Logs in with email and password and establishes a session.
    ///
    /// # Errors
    ///
    /// Returns [`FactKitError::Validation`] for malformed input,
    /// [`FactKitError::Authentication`] for rejected credentials, and
    /// propagates network and storage failures.
    pub async fn login(&self, email: &str, password: &str) -> FactKitResult<User> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(FactKitError::Validation {
                field: "password",
                reason: "password must not be empty".to_string(),
            });
        }
        self.authenticate(LOGIN_PATH, email, password).await
    }

    async fn authenticate(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> FactKitResult<User> {
        let url = self.url(path);
        let response = self
            .http
            .handle(
                self.http
                    .req(Method::POST, &url)
                    .json(&CredentialsBody { email, password }),
            )
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FactKitError::Authentication);
        }
        if !status.is_success() {
            return Err(FactKitError::Network {
                url,
                status: Some(status.as_u16()),
                error: response.text().await.unwrap_or_default(),
            });
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|err| FactKitError::Serialization(err.to_string()))?;
        self.session
            .set_auth(auth.user.clone(), &auth.access_token, &auth.refresh_token)?;
        tracing::info!(user = %auth.user.email, "session established");
        Ok(auth.user)
    }

    /// Ends the session.
    ///
    /// The backend call is best effort: the local session and durable keys
    /// are cleared even if the server is unreachable, so the user is never
    /// stuck logged in.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be cleared.
    pub async fn logout(&self) -> FactKitResult<()> {
        if let Some(token) = self.session.snapshot().bearer() {
            let url = self.url(LOGOUT_PATH);
            let request = self.http.req(Method::POST, &url).bearer_auth(token);
            if let Err(err) = self.http.handle(request).await {
                tracing::warn!(%err, "logout call failed, clearing local session anyway");
            }
        }
        self.session.clear_auth()
    }

    /// Exchanges the refresh token for a new access token. Used only by the
    /// refresh coordinator; does not touch session state.
    pub(crate) async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> FactKitResult<String> {
        let url = self.url(REFRESH_PATH);
        let response = self
            .http
            .handle(
                self.http
                    .req(Method::POST, &url)
                    .json(&RefreshBody { refresh_token }),
            )
            .await?;

        let status = response.status();
        if status.is_success() {
            let refreshed: RefreshResponse = response
                .json()
                .await
                .map_err(|err| FactKitError::Serialization(err.to_string()))?;
            return Ok(refreshed.access_token);
        }
        // Anything the backend answered with here means the refresh token is
        // no longer good; the caller force-logs-out.
        Err(FactKitError::SessionExpired)
    }
}

fn validate_email(email: &str) -> FactKitResult<()> {
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if well_formed {
        Ok(())
    } else {
        Err(FactKitError::Validation {
            field: "email",
            reason: format!("'{email}' is not a valid email address"),
        })
    }
}

fn validate_password(password: &str) -> FactKitResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(FactKitError::Validation {
            field: "password",
            reason: format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use factkit_store::{CredentialStore, MemoryStore};
    use test_case::test_case;

    use super::*;
    use crate::Config;

    fn client(base_url: &str) -> (Arc<MemoryStore>, Client) {
        let store = Arc::new(MemoryStore::new());
        let client = Client::new(
            Config::with_base_url(base_url),
            Arc::clone(&store) as Arc<dyn CredentialStore>,
        );
        client.session().bootstrap().unwrap();
        (store, client)
    }

    fn auth_body() -> serde_json::Value {
        serde_json::json!({
            "user": {
                "id": "0193a1de-7b42-7e30-9428-7e0e3a370a9d",
                "email": "user@example.com",
                "role": "SUBMITTER",
                "is_active": true
            },
            "access_token": "access-1",
            "refresh_token": "refresh-1"
        })
    }

    #[test_case("not-an-email"; "no at sign")]
    #[test_case("@example.com"; "empty local part")]
    #[test_case("user@nodot"; "domain without dot")]
    fn malformed_email_is_rejected_client_side(email: &str) {
        let err = validate_email(email).unwrap_err();
        assert!(matches!(err, FactKitError::Validation { field: "email", .. }));
    }

    #[tokio::test]
    async fn login_with_valid_credentials_authenticates_and_persists() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", LOGIN_PATH)
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "email": "user@example.com",
                "password": "password123"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(auth_body().to_string())
            .create_async()
            .await;

        let (store, client) = client(&server.url());
        let user = client.login("user@example.com", "password123").await.unwrap();
        assert_eq!(user.email, "user@example.com");
        assert!(client.session().is_authenticated());

        let stored = store.load().unwrap();
        assert!(stored.is_complete());
        assert_eq!(stored.access_token.as_deref(), Some("access-1"));
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_surface_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", LOGIN_PATH)
            .with_status(401)
            .create_async()
            .await;

        let (_store, client) = client(&server.url());
        let err = client.login("user@example.com", "wrong-password").await.unwrap_err();
        assert!(matches!(err, FactKitError::Authentication));
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn registration_validates_before_any_network_call() {
        // No mock server: a network call would fail loudly.
        let (_store, client) = client("http://127.0.0.1:1");
        let err = client
            .register("user@example.com", "password123", "password124")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FactKitError::Validation {
                field: "password_confirmation",
                ..
            }
        ));

        let err = client
            .register("user@example.com", "short", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, FactKitError::Validation { field: "password", .. }));
    }

    #[tokio::test]
    async fn logout_clears_session_even_when_backend_is_down() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(auth_body().to_string())
            .create_async()
            .await;
        // No logout mock: the call 500s and is retried, then given up on.
        server
            .mock("POST", LOGOUT_PATH)
            .with_status(503)
            .expect_at_least(1)
            .create_async()
            .await;

        let (store, client) = client(&server.url());
        client.login("user@example.com", "password123").await.unwrap();
        client.logout().await.unwrap();

        assert!(!client.session().is_authenticated());
        assert!(!store.load().unwrap().is_complete());
    }
}
