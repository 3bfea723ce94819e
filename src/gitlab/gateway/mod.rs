//! Gateways for loading merge request data from GitLab.
//!
//! The trait keeps the orchestrator independent of HTTP so it can be mocked
//! in tests; [`GitLabGateway`] is the implementation over the resilient
//! GraphQL and REST client.

mod client;

pub use client::GitLabGateway;

use async_trait::async_trait;

use super::error::GitLabError;
use super::locator::Fingerprint;
use super::models::{ApprovalInfo, Commit, Discussion, FileDiff, NormalizedView};
use super::pagination::Page;

/// Largest `first` argument GitLab accepts on a connection.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page sizes for the nested collections of a view query and for page walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    /// Commits per page.
    pub commits: u32,
    /// Discussions per page.
    pub discussions: u32,
    /// Pipelines included in the view.
    pub pipelines: u32,
}

impl PageSizes {
    /// Uses `size` for commits and discussions, clamped to `1..=100`.
    #[must_use]
    pub fn uniform(size: u32) -> Self {
        let size = clamp_page_size(size);
        Self {
            commits: size,
            discussions: size,
            ..Self::default()
        }
    }

    /// Returns a copy with every size clamped to `1..=100`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            commits: clamp_page_size(self.commits),
            discussions: clamp_page_size(self.discussions),
            pipelines: clamp_page_size(self.pipelines),
        }
    }
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            commits: 50,
            discussions: 50,
            pipelines: 10,
        }
    }
}

const fn clamp_page_size(size: u32) -> u32 {
    if size == 0 {
        1
    } else if size > MAX_PAGE_SIZE {
        MAX_PAGE_SIZE
    } else {
        size
    }
}

/// Gateway that can load merge request data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MergeRequestGateway: Send + Sync {
    /// Fetch and normalize the merge request view.
    async fn fetch_view(
        &self,
        fingerprint: &Fingerprint,
        page_sizes: PageSizes,
    ) -> Result<NormalizedView, GitLabError>;

    /// Fetch one page of commits starting after `after`.
    async fn commits_page(
        &self,
        fingerprint: &Fingerprint,
        first: u32,
        after: Option<String>,
    ) -> Result<Page<Commit>, GitLabError>;

    /// Fetch one page of discussions starting after `after`.
    async fn discussions_page(
        &self,
        fingerprint: &Fingerprint,
        first: u32,
        after: Option<String>,
    ) -> Result<Page<Discussion>, GitLabError>;

    /// Fetch every file diff over REST.
    async fn diffs(&self, fingerprint: &Fingerprint) -> Result<Vec<FileDiff>, GitLabError>;

    /// Fetch approval state over REST.
    async fn approvals(&self, fingerprint: &Fingerprint) -> Result<ApprovalInfo, GitLabError>;
}
