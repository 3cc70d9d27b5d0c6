//! HTTP plumbing shared by every API call.
//!
//! A thin wrapper on a [`reqwest::Client`] that sets timeouts and a
//! User-Agent, and applies exponential-backoff retry for transient failures
//! (429, 5xx, timeouts, connect errors). Authentication failures (401/403)
//! are never retried here — they belong to the refresh coordinator.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Method, RequestBuilder, Response};

use crate::error::FactKitError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_MIN_DELAY: Duration = Duration::from_millis(200);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(2);
const MAX_RETRIES: usize = 3; // total attempts = 4

pub(crate) struct Request {
    client: reqwest::Client,
}

impl Request {
    pub(crate) fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Creates a request builder with defaults applied.
    pub(crate) fn req(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(REQUEST_TIMEOUT)
            .header(
                "User-Agent",
                format!("factkit-core/{}", env!("CARGO_PKG_VERSION")),
            )
    }

    /// Sends a request built by [`Self::req`], retrying transient failures.
    ///
    /// Responses with non-transient error statuses (including 401/403) are
    /// returned as `Ok` for the caller to interpret.
    pub(crate) async fn handle(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<Response, FactKitError> {
        // Streaming bodies cannot be cloned and therefore cannot be
        // retried; send them once as-is. Everything this SDK sends is JSON
        // and clones fine.
        let Some(template) = request_builder.try_clone() else {
            return dispatch(request_builder).await.map_err(Into::into);
        };
        drop(request_builder);

        let backoff = ExponentialBuilder::default()
            .with_min_delay(RETRY_MIN_DELAY)
            .with_max_delay(RETRY_MAX_DELAY)
            .with_max_times(MAX_RETRIES);

        (|| async {
            let attempt = template.try_clone().ok_or_else(|| {
                TransportError::permanent("<unknown>", None, "request template not cloneable")
            })?;
            dispatch(attempt).await
        })
        .retry(backoff)
        .when(|err: &TransportError| err.retryable)
        .await
        .map_err(Into::into)
    }
}

#[derive(Debug)]
struct TransportError {
    url: String,
    status: Option<u16>,
    error: String,
    retryable: bool,
}

impl TransportError {
    fn permanent(url: &str, status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            status,
            error: error.into(),
            retryable: false,
        }
    }

    fn retryable(url: &str, status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            retryable: true,
            ..Self::permanent(url, status, error)
        }
    }
}

impl From<TransportError> for FactKitError {
    fn from(value: TransportError) -> Self {
        Self::Network {
            url: value.url,
            status: value.status,
            error: value.error,
        }
    }
}

/// Executes one attempt, classifying the outcome as retryable or not.
async fn dispatch(request_builder: RequestBuilder) -> Result<Response, TransportError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| {
        let url = err.url().map_or_else(|| "<unknown>".to_string(), ToString::to_string);
        TransportError::permanent(&url, None, format!("request build failed: {err}"))
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            // Rate limiting and server errors are worth another attempt;
            // every other status is a verdict.
            if status == 429 || (500..600).contains(&status) {
                Err(TransportError::retryable(
                    &url,
                    Some(status),
                    format!("request error with bad status code {status}"),
                ))
            } else {
                Ok(resp)
            }
        }
        Err(err) if err.is_timeout() || err.is_connect() => Err(TransportError::retryable(
            &url,
            None,
            format!("request timeout/connect error: {err}"),
        )),
        Err(err) => Err(TransportError::permanent(
            &url,
            None,
            format!("request failed: {err}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transient_server_errors_are_retried_until_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("GET", "/flaky")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let request = Request::new();
        let url = format!("{}/flaky", server.url());
        let response = request.handle(request.req(Method::GET, &url)).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn auth_failures_are_returned_without_retry() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gated")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let request = Request::new();
        let url = format!("{}/gated", server.url());
        let response = request.handle(request.req(Method::GET, &url)).await.unwrap();
        assert_eq!(response.status().as_u16(), 401);
    }
}
