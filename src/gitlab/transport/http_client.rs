//! `reqwest` implementation of [`HttpTransport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{HttpRequest, HttpResponse, HttpTransport, TransportFailure};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportFailure`] when the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, TransportFailure> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mergelens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| {
                TransportFailure::new(format!("failed to configure HTTP client: {error}"))
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// See [`ReqwestTransport::new`].
    pub fn with_default_timeout() -> Result<Self, TransportFailure> {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(payload) = body.as_ref() {
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(|error| {
            let detail = if error.is_timeout() {
                "request timed out"
            } else if error.is_connect() {
                "connection failed"
            } else {
                "request failed"
            };
            TransportFailure::new(format!("{detail}: {error}"))
        })?;

        let status = response.status();
        let response_headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|error| TransportFailure::new(format!("failed to read body: {error}")))?;

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body: decode_body(&text),
        })
    }
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}
