//! Token refresh coordination for authenticated requests.
//!
//! Every authenticated request runs the same state machine: attempt with
//! the current access token; on a 401 exchange the refresh token for a new
//! access token and retry the original request exactly once; if the
//! exchange itself is rejected, clear the session and report
//! [`FactKitError::SessionExpired`].
//!
//! At most one refresh exchange is in flight per session. Requests that
//! fail while an exchange is running wait on it and retry with its result
//! instead of issuing their own — a refresh token is single-use on some
//! backends, and a stampede would invalidate the session for everyone.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FactKitError;
use crate::role::Role;
use crate::{Client, FactKitResult};

impl Client {
    /// Sends an authenticated JSON request, transparently healing an
    /// expired access token, and deserializes the response body.
    ///
    /// # Errors
    ///
    /// Returns [`FactKitError::NotAuthenticated`] when no session exists,
    /// [`FactKitError::SessionExpired`] when the refresh token is no longer
    /// accepted (the session has been cleared), and propagates network,
    /// authorization and serialization failures.
    pub(crate) async fn send_authorized_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        required: Role,
    ) -> FactKitResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.send_authorized(method, path, body, required).await?;
        response
            .json()
            .await
            .map_err(|err| FactKitError::Serialization(err.to_string()))
    }

    /// Sends an authenticated request and returns the successful response.
    ///
    /// `required` is the role the route is declared to need; a 403 from the
    /// backend is reported against it.
    pub(crate) async fn send_authorized<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        required: Role,
    ) -> FactKitResult<Response>
    where
        B: Serialize + Sync,
    {
        let token = self
            .session
            .snapshot()
            .bearer()
            .ok_or(FactKitError::NotAuthenticated)?;

        let url = self.url(path);
        let response = self
            .http
            .handle(self.build(method.clone(), &url, body, &token))
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return self.into_checked(response, required).await;
        }

        // Auth failure: heal once, retry once. Never loops.
        tracing::debug!(%url, "access token rejected, entering refresh exchange");
        let fresh = self.refreshed_access_token(&token).await?;
        let retried = self
            .http
            .handle(self.build(method, &url, body, &fresh))
            .await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            // The brand-new token was rejected too; nothing left to try.
            self.session.clear_auth()?;
            return Err(FactKitError::SessionExpired);
        }
        self.into_checked(retried, required).await
    }

    /// Produces an access token that is newer than `stale`, running the
    /// refresh exchange if nobody else already has.
    ///
    /// The lock admits one exchange at a time; waiters re-read the session
    /// after acquiring, and if a newer token already landed they use it
    /// without another exchange.
    async fn refreshed_access_token(&self, stale: &str) -> FactKitResult<String> {
        let _exchange = self.refresh_lock.lock().await;

        let session = self.session.snapshot();
        if let Some(current) = session.bearer() {
            if current != stale {
                return Ok(current);
            }
        }

        let Some(refresh_token) = session.refresh_token_value() else {
            self.session.clear_auth()?;
            return Err(FactKitError::SessionExpired);
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(access_token) => {
                self.session.update_access_token(&access_token)?;
                tracing::info!("access token refreshed");
                Ok(access_token)
            }
            Err(FactKitError::SessionExpired) => {
                tracing::warn!("refresh token rejected, forcing logout");
                self.session.clear_auth()?;
                Err(FactKitError::SessionExpired)
            }
            // A transport failure is not a verdict on the refresh token;
            // surface it without tearing the session down.
            Err(err) => Err(err),
        }
    }

    fn build<B: Serialize + Sync>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        token: &str,
    ) -> RequestBuilder {
        let mut request = self.http.req(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    /// Maps non-success statuses of an already-authenticated response. A
    /// 403 is reported against the role the route declares it needs.
    async fn into_checked(&self, response: Response, required: Role) -> FactKitResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::FORBIDDEN {
            let actual = self.session.snapshot().role().unwrap_or(Role::Submitter);
            return Err(FactKitError::Authorization { required, actual });
        }
        Err(FactKitError::Network {
            url: response.url().to_string(),
            status: Some(status.as_u16()),
            error: response.text().await.unwrap_or_default(),
        })
    }
}
