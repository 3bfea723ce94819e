//! The "get current view" entry point composing gateway and cache.
//!
//! [`MergeRequestViews`] serves cached views when allowed, otherwise
//! fetches through the gateway and writes the result back. Exhaustive
//! commit and discussion lists are walked page by page and never cached.
//! Diffs use the cache's diff space; approvals are always fetched.
//!
//! Concurrent calls for the same fingerprint are not coalesced: each miss
//! performs its own fetch and the last write to complete wins.

use std::sync::Arc;

use super::cache::{CacheStats, ViewCache};
use super::error::GitLabError;
use super::gateway::MergeRequestGateway;
use super::locator::Fingerprint;
use super::models::{ApprovalInfo, Commit, Discussion, FileDiff, NormalizedView};
use super::pagination::fetch_all;

pub use super::gateway::PageSizes;

/// Options for [`MergeRequestViews::get_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Skip the cache lookup and always fetch.
    pub force_refresh: bool,
    /// Read from and write to the cache.
    pub use_cache: bool,
    /// Page sizes for the nested collections.
    pub page_sizes: PageSizes,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            use_cache: true,
            page_sizes: PageSizes::default(),
        }
    }
}

impl ViewOptions {
    /// Options that bypass the cache lookup but still write through.
    #[must_use]
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }
}

/// REST collections layered onto a view by
/// [`MergeRequestViews::get_view_enriched`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Fill `diffs`.
    pub diffs: bool,
    /// Fill `approvals`.
    pub approvals: bool,
}

/// Orchestrates cache, gateway and normalizer.
#[derive(Clone)]
pub struct MergeRequestViews {
    gateway: Arc<dyn MergeRequestGateway>,
    cache: Arc<ViewCache>,
}

impl MergeRequestViews {
    /// Creates an orchestrator over `gateway` backed by `cache`.
    #[must_use]
    pub fn new(gateway: Arc<dyn MergeRequestGateway>, cache: Arc<ViewCache>) -> Self {
        Self { gateway, cache }
    }

    /// The cache this orchestrator reads and writes.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ViewCache> {
        &self.cache
    }

    /// Returns the current normalized view.
    ///
    /// # Errors
    ///
    /// Propagates the gateway's [`GitLabError`] unchanged. Failed fetches
    /// are never cached.
    pub async fn get_view(
        &self,
        fingerprint: &Fingerprint,
        options: ViewOptions,
    ) -> Result<NormalizedView, GitLabError> {
        if options.use_cache && !options.force_refresh {
            if let Some(view) = self.cache.get(fingerprint) {
                tracing::debug!(key = %fingerprint, "serving view from cache");
                return Ok(view);
            }
        }

        tracing::debug!(
            key = %fingerprint,
            force_refresh = options.force_refresh,
            "fetching merge request view"
        );
        let view = self
            .gateway
            .fetch_view(fingerprint, options.page_sizes)
            .await
            .inspect_err(|error| {
                tracing::warn!(key = %fingerprint, kind = %error.kind, "view fetch failed");
            })?;

        if options.use_cache {
            self.cache.set(fingerprint.clone(), view.clone());
        }
        Ok(view)
    }

    /// Returns the view with the requested REST collections filled in.
    ///
    /// Enrichment failures are logged and leave the collection at its empty
    /// or default value. Diffs follow the same cache options as the view:
    /// `force_refresh` skips the diff cache read and `use_cache: false`
    /// neither reads nor writes it.
    ///
    /// # Errors
    ///
    /// Only a failure of the base [`get_view`](Self::get_view) call.
    pub async fn get_view_enriched(
        &self,
        fingerprint: &Fingerprint,
        options: ViewOptions,
        enrichment: Enrichment,
    ) -> Result<NormalizedView, GitLabError> {
        let mut view = self.get_view(fingerprint, options).await?;

        if enrichment.diffs {
            match self.diffs_with(fingerprint, options).await {
                Ok(diffs) => view.diffs = diffs,
                Err(error) => tracing::warn!(
                    key = %fingerprint,
                    kind = %error.kind,
                    error = %error,
                    "diff enrichment failed; leaving diffs empty"
                ),
            }
        }

        if enrichment.approvals {
            match self.get_approvals(fingerprint).await {
                Ok(approvals) => view.approvals = approvals,
                Err(error) => tracing::warn!(
                    key = %fingerprint,
                    kind = %error.kind,
                    error = %error,
                    "approval enrichment failed; keeping default approvals"
                ),
            }
        }

        Ok(view)
    }

    /// Walks every commit page.
    ///
    /// # Errors
    ///
    /// The first page failure, unchanged; partial results are discarded.
    pub async fn fetch_all_commits(
        &self,
        fingerprint: &Fingerprint,
        page_size: u32,
    ) -> Result<Vec<Commit>, GitLabError> {
        fetch_all(|cursor| self.gateway.commits_page(fingerprint, page_size, cursor)).await
    }

    /// Walks every discussion page.
    ///
    /// # Errors
    ///
    /// The first page failure, unchanged; partial results are discarded.
    pub async fn fetch_all_discussions(
        &self,
        fingerprint: &Fingerprint,
        page_size: u32,
    ) -> Result<Vec<Discussion>, GitLabError> {
        fetch_all(|cursor| {
            self.gateway
                .discussions_page(fingerprint, page_size, cursor)
        })
        .await
    }

    /// Returns the diff listing, served from the diff cache when fresh.
    ///
    /// # Errors
    ///
    /// Propagates the gateway's [`GitLabError`].
    pub async fn get_diffs(&self, fingerprint: &Fingerprint) -> Result<Vec<FileDiff>, GitLabError> {
        self.diffs_with(fingerprint, ViewOptions::default()).await
    }

    async fn diffs_with(
        &self,
        fingerprint: &Fingerprint,
        options: ViewOptions,
    ) -> Result<Vec<FileDiff>, GitLabError> {
        if options.use_cache && !options.force_refresh {
            if let Some(diffs) = self.cache.get_diffs(fingerprint) {
                tracing::debug!(key = %fingerprint, "serving diffs from cache");
                return Ok(diffs);
            }
        }
        let diffs = self.gateway.diffs(fingerprint).await?;
        if options.use_cache {
            self.cache.set_diffs(fingerprint.clone(), diffs.clone());
        }
        Ok(diffs)
    }

    /// Fetches approval state; never cached.
    ///
    /// # Errors
    ///
    /// Propagates the gateway's [`GitLabError`].
    pub async fn get_approvals(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<ApprovalInfo, GitLabError> {
        self.gateway.approvals(fingerprint).await
    }

    /// Live entry counts of the cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops the fingerprint from both cache spaces.
    pub fn invalidate(&self, fingerprint: &Fingerprint) {
        self.cache.invalidate(fingerprint);
    }

    /// Empties the cache.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for MergeRequestViews {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MergeRequestViews")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
