//! Retrying client shared by the GraphQL and REST paths.

use std::sync::Arc;
use std::time::Duration;

use http::header::{ACCEPT, AUTHORIZATION, HeaderName, HeaderValue};
use serde_json::{Value, json};
use url::Url;

use crate::gitlab::clock::{Clock, TokioClock};
use crate::gitlab::error::{ErrorKind, GitLabError};
use crate::gitlab::locator::AccessToken;

use super::classify::{Classification, ResponseShape, classify, error_message};
use super::retry::{RetryPolicy, retry_after_seconds};
use super::{HttpRequest, HttpResponse, HttpTransport};

const PRIVATE_TOKEN: &str = "private-token";

/// Validated `{ base_url, token }` pair for one GitLab instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLabConnection {
    base_url: Url,
    token: AccessToken,
}

impl GitLabConnection {
    /// Creates a connection for the instance rooted at `base_url`.
    ///
    /// A trailing `/api/v4` or `/api/graphql` suffix is stripped so either
    /// the instance root or an API root may be supplied.
    #[must_use]
    pub fn new(mut base_url: Url, token: AccessToken) -> Self {
        let trimmed = base_url.path().trim_end_matches('/');
        let root = trimmed
            .strip_suffix("/api/v4")
            .or_else(|| trimmed.strip_suffix("/api/graphql"))
            .unwrap_or(trimmed);
        let normalised = format!("{root}/");
        base_url.set_path(&normalised);
        base_url.set_query(None);
        base_url.set_fragment(None);
        Self { base_url, token }
    }

    /// Instance root, always ending in `/`.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Access token.
    #[must_use]
    pub const fn token(&self) -> &AccessToken {
        &self.token
    }

    /// GraphQL endpoint, `<base>/api/graphql`.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::UnknownError`] if the URL cannot be joined.
    pub fn graphql_url(&self) -> Result<Url, GitLabError> {
        self.join("api/graphql")
    }

    /// REST endpoint, `<base>/api/v4/<path>`.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::UnknownError`] if the URL cannot be joined.
    pub fn rest_url(&self, path: &str) -> Result<Url, GitLabError> {
        self.join(&format!("api/v4/{}", path.trim_start_matches('/')))
    }

    fn join(&self, path: &str) -> Result<Url, GitLabError> {
        self.base_url
            .join(path)
            .map_err(|error| GitLabError::unknown(format!("cannot build URL for {path}: {error}")))
    }
}

/// Executes GitLab requests with retry, backoff and error classification.
#[derive(Clone)]
pub struct ResilientClient {
    connection: GitLabConnection,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl ResilientClient {
    /// Creates a client using the Tokio clock and the default retry policy.
    #[must_use]
    pub fn new(connection: GitLabConnection, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            connection,
            transport,
            clock: Arc::new(TokioClock),
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the time source used for backoff sleeps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the default retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Connection details this client talks to.
    #[must_use]
    pub const fn connection(&self) -> &GitLabConnection {
        &self.connection
    }

    /// Default retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs a GraphQL query and returns its `data` object.
    ///
    /// # Errors
    ///
    /// Returns a classified [`GitLabError`]; a body carrying `errors` or
    /// lacking `data` yields [`ErrorKind::GraphqlError`].
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<Value, GitLabError> {
        let url = self.connection.graphql_url()?;
        let mut request =
            HttpRequest::post_json(url, json!({ "query": query, "variables": variables }));
        let bearer = format!("Bearer {}", self.connection.token.value());
        request
            .headers
            .insert(AUTHORIZATION, sensitive_header(&bearer)?);

        let HttpResponse { mut body, .. } = self
            .execute_with(request, ResponseShape::GraphQl, self.policy)
            .await?;

        body.get_mut("data")
            .map(Value::take)
            .ok_or_else(|| GitLabError::graphql("response did not contain data"))
    }

    /// Issues a REST GET against `/api/v4/<path>`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`GitLabError`].
    pub async fn rest_get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<HttpResponse, GitLabError> {
        let mut url = self.connection.rest_url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        let mut request = HttpRequest::get(url);
        request.headers.insert(
            HeaderName::from_static(PRIVATE_TOKEN),
            sensitive_header(self.connection.token.value())?,
        );

        self.execute_with(request, ResponseShape::Rest, self.policy)
            .await
    }

    /// Executes `request` with the client's default policy.
    ///
    /// # Errors
    ///
    /// See [`ResilientClient::execute_with`].
    pub async fn execute(
        &self,
        request: HttpRequest,
        shape: ResponseShape,
    ) -> Result<HttpResponse, GitLabError> {
        self.execute_with(request, shape, self.policy).await
    }

    /// Executes `request`, retrying according to `policy`.
    ///
    /// Network failures and generic non-success statuses are retried with
    /// exponential backoff plus jitter. A 429 waits for `Retry-After`.
    /// 401, 403, 404 and GraphQL-level errors fail on the first attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NetError`] when the last attempt failed before a
    /// status was received, [`ErrorKind::RateLimit`] when the budget ran out
    /// while rate limited, [`ErrorKind::UnknownError`] for other exhausted
    /// failures, and the fatal kind for non-retryable responses.
    pub async fn execute_with(
        &self,
        mut request: HttpRequest,
        shape: ResponseShape,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, GitLabError> {
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        let max_attempts = policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            let is_last = attempt.saturating_add(1) >= max_attempts;
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt,
                max_attempts,
                "sending GitLab request"
            );

            let delay = match self.transport.perform(request.clone()).await {
                Err(failure) => {
                    if is_last {
                        tracing::error!(
                            url = %request.url,
                            attempt,
                            error = %failure,
                            "GitLab request failed after exhausting retries"
                        );
                        return Err(GitLabError::network(failure.message));
                    }
                    let delay = policy.retry_delay(attempt);
                    tracing::warn!(
                        url = %request.url,
                        attempt,
                        delay_ms = millis(delay),
                        error = %failure,
                        "network failure, retrying"
                    );
                    delay
                }
                Ok(response) => match classify(response.status, shape, &response.body) {
                    Classification::Success => {
                        tracing::debug!(
                            url = %request.url,
                            attempt,
                            status = response.status.as_u16(),
                            "GitLab request succeeded"
                        );
                        return Ok(response);
                    }
                    Classification::Fatal(kind) => {
                        let error = fatal_error(kind, &response);
                        tracing::error!(
                            url = %request.url,
                            attempt,
                            status = response.status.as_u16(),
                            kind = %kind,
                            "GitLab request failed without retry"
                        );
                        return Err(error);
                    }
                    Classification::RateLimited => {
                        let retry_after = retry_after_seconds(&response.headers);
                        if is_last {
                            tracing::error!(
                                url = %request.url,
                                attempt,
                                retry_after,
                                "rate limited after exhausting retries"
                            );
                            return Err(GitLabError::new(
                                ErrorKind::RateLimit,
                                describe(&response, "rate limit exceeded"),
                            )
                            .with_status(response.status.as_u16())
                            .with_retry_after(retry_after));
                        }
                        let delay = policy.rate_limit_delay(retry_after);
                        tracing::warn!(
                            url = %request.url,
                            attempt,
                            retry_after,
                            delay_ms = millis(delay),
                            "rate limited, waiting before retry"
                        );
                        delay
                    }
                    Classification::Retryable => {
                        if is_last {
                            tracing::error!(
                                url = %request.url,
                                attempt,
                                status = response.status.as_u16(),
                                "GitLab request failed after exhausting retries"
                            );
                            return Err(GitLabError::unknown(describe(
                                &response,
                                "request failed",
                            ))
                            .with_status(response.status.as_u16()));
                        }
                        let delay = policy.retry_delay(attempt);
                        tracing::warn!(
                            url = %request.url,
                            attempt,
                            status = response.status.as_u16(),
                            delay_ms = millis(delay),
                            "unexpected status, retrying"
                        );
                        delay
                    }
                },
            };

            self.clock.sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ResilientClient")
            .field("connection", &self.connection)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn sensitive_header(value: &str) -> Result<HeaderValue, GitLabError> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        GitLabError::new(
            ErrorKind::AuthError,
            "access token contains characters not allowed in a header",
        )
    })?;
    header.set_sensitive(true);
    Ok(header)
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

fn fatal_error(kind: ErrorKind, response: &HttpResponse) -> GitLabError {
    let fallback = match kind {
        ErrorKind::AuthError => "GitLab rejected the access token",
        ErrorKind::NotFound => "resource not found",
        ErrorKind::GraphqlError => "response did not contain data",
        _ => "request failed",
    };
    GitLabError::new(kind, describe(response, fallback)).with_status(response.status.as_u16())
}

fn describe(response: &HttpResponse, fallback: &str) -> String {
    let detail = error_message(&response.body).unwrap_or_else(|| fallback.to_owned());
    format!("GitLab returned {}: {detail}", response.status)
}
