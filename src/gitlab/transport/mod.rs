//! HTTP plumbing for the GitLab GraphQL and REST APIs.
//!
//! [`HttpTransport`] is the raw "perform one request" primitive; any
//! conforming client can be substituted. [`ResilientClient`] wraps it with
//! the retry, backoff and error classification policy shared by both APIs.

mod classify;
mod http_client;
mod resilient;
mod retry;

pub use classify::{Classification, ResponseShape, classify};
pub use http_client::ReqwestTransport;
pub use resilient::{GitLabConnection, ResilientClient};
pub use retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_RETRIES, RetryPolicy};

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use url::Url;

/// One HTTP request issued by the resilient client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Fully resolved URL, including any query string.
    pub url: Url,
    /// Request headers, including authentication.
    pub headers: HeaderMap,
    /// JSON body for POST requests.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Builds a GET request.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Builds a POST request carrying a JSON body.
    #[must_use]
    pub fn post_json(url: Url, body: Value) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }
}

/// Response returned by an [`HttpTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Decoded JSON body; `Value::Null` when empty, a string when not JSON.
    pub body: Value,
}

impl HttpResponse {
    /// Builds a response with no headers.
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }
}

/// Failure raised before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportFailure {
    /// Transport-level detail (connection refused, timeout, ...).
    pub message: String,
}

impl TransportFailure {
    /// Creates a transport failure.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Performs a single HTTP exchange with no retry logic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and returns the status, headers and JSON body.
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}
