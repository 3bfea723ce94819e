//! Error types exposed by the GitLab access layer.
//!
//! Every failure that leaves the transport, paginator, normalizer or view
//! orchestrator is a [`GitLabError`]. The record always carries an
//! [`ErrorKind`] so callers can branch on the failure class instead of
//! inspecting messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failure classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Connectivity failure or timeout before an HTTP status was received.
    NetError,
    /// GitLab rejected the token (401) or the token lacks access (403).
    AuthError,
    /// GitLab asked the client to slow down (429).
    RateLimit,
    /// The project or merge request does not exist (404 or null root).
    NotFound,
    /// The GraphQL response carried `errors` or lacked `data`.
    GraphqlError,
    /// A payload was structurally invalid for normalization.
    Validation,
    /// Anything else, including generic non-success statuses.
    UnknownError,
}

impl ErrorKind {
    /// Returns the stable upper-snake code for this kind.
    #[must_use]
    pub const fn as_code(self) -> &'static str {
        match self {
            Self::NetError => "NET_ERROR",
            Self::AuthError => "AUTH_ERROR",
            Self::RateLimit => "RATE_LIMIT",
            Self::NotFound => "NOT_FOUND",
            Self::GraphqlError => "GRAPHQL_ERROR",
            Self::Validation => "VALIDATION",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Returns true when the transport may retry a failure of this kind.
    ///
    /// Rate limiting is handled by its own `Retry-After` policy and is
    /// therefore not part of the generic retry class.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::NetError | Self::UnknownError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_code())
    }
}

/// A classified failure from the GitLab access layer.
///
/// Constructed at the transport boundary and propagated unchanged through
/// pagination, normalization and the view orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct GitLabError {
    /// Failure class.
    pub kind: ErrorKind,
    /// Human readable detail.
    pub message: String,
    /// HTTP status of the failing response, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Seconds GitLab asked the client to wait, for rate-limit failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl GitLabError {
    /// Creates an error of the given kind with no HTTP context.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            retry_after_seconds: None,
        }
    }

    /// Attaches the HTTP status that produced this error.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Attaches the `Retry-After` value reported by GitLab.
    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    /// Shorthand for an [`ErrorKind::NetError`].
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetError, message)
    }

    /// Shorthand for an [`ErrorKind::NotFound`].
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for an [`ErrorKind::GraphqlError`].
    #[must_use]
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GraphqlError, message)
    }

    /// Shorthand for an [`ErrorKind::Validation`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Shorthand for an [`ErrorKind::UnknownError`].
    ///
    /// Used to wrap failures that have no better classification so that
    /// every error handed to a caller still carries a kind.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownError, message)
    }
}
