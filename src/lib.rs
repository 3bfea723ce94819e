//! Mergelens library crate providing resilient GitLab merge request views.
//!
//! The library fetches merge request data through GitLab's GraphQL API with
//! REST fallbacks, retries transient failures with backoff, walks paginated
//! connections, normalizes every response shape into one view, and caches
//! that view briefly.

pub mod config;
pub mod gitlab;

pub use config::{ConfigError, MergelensConfig};
pub use gitlab::{
    ErrorKind, Fingerprint, GitLabError, GitLabGateway, MergeRequestViews, NormalizedView,
    ResilientClient, ViewCache,
};
