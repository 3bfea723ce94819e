//! GraphQL-first gateway with REST fallbacks.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::gitlab::error::{ErrorKind, GitLabError};
use crate::gitlab::locator::Fingerprint;
use crate::gitlab::models::{ApprovalInfo, Commit, Discussion, FileDiff, NormalizedView};
use crate::gitlab::normalize::{self, RawMergeRequest};
use crate::gitlab::pagination::{MAX_PAGES, Page};
use crate::gitlab::queries;
use crate::gitlab::transport::ResilientClient;

use super::{MAX_PAGE_SIZE, MergeRequestGateway, PageSizes};

const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Gateway over the GitLab GraphQL and REST APIs.
#[derive(Debug, Clone)]
pub struct GitLabGateway {
    client: ResilientClient,
}

impl GitLabGateway {
    /// Creates a gateway that issues requests through `client`.
    #[must_use]
    pub const fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    /// The underlying resilient client.
    #[must_use]
    pub const fn client(&self) -> &ResilientClient {
        &self.client
    }

    async fn fetch_view_graphql(
        &self,
        fingerprint: &Fingerprint,
        page_sizes: PageSizes,
    ) -> Result<NormalizedView, GitLabError> {
        let sizes = page_sizes.clamped();
        let data = self
            .client
            .graphql(
                &queries::merge_request_view(),
                json!({
                    "fullPath": fingerprint.project().as_str(),
                    "iid": fingerprint.iid().to_string(),
                    "commits": sizes.commits,
                    "discussions": sizes.discussions,
                    "pipelines": sizes.pipelines,
                }),
            )
            .await?;
        normalize::normalize(RawMergeRequest::GraphQl(data))
    }

    async fn fetch_view_rest(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<NormalizedView, GitLabError> {
        let response = self
            .client
            .rest_get(&fingerprint.merge_request_path(), &[])
            .await?;
        normalize::normalize(RawMergeRequest::Rest(response.body))
    }

    async fn connection_page(
        &self,
        query: &str,
        fingerprint: &Fingerprint,
        first: u32,
        after: Option<String>,
    ) -> Result<Value, GitLabError> {
        self.client
            .graphql(
                query,
                json!({
                    "fullPath": fingerprint.project().as_str(),
                    "iid": fingerprint.iid().to_string(),
                    "first": first.clamp(1, MAX_PAGE_SIZE),
                    "after": after,
                }),
            )
            .await
    }
}

#[async_trait]
impl MergeRequestGateway for GitLabGateway {
    async fn fetch_view(
        &self,
        fingerprint: &Fingerprint,
        page_sizes: PageSizes,
    ) -> Result<NormalizedView, GitLabError> {
        match self.fetch_view_graphql(fingerprint, page_sizes).await {
            Err(error) if error.kind == ErrorKind::GraphqlError => {
                tracing::warn!(
                    project = fingerprint.project().as_str(),
                    iid = fingerprint.iid().get(),
                    error = %error,
                    "GraphQL view query failed; falling back to REST"
                );
                self.fetch_view_rest(fingerprint).await
            }
            other => other,
        }
    }

    async fn commits_page(
        &self,
        fingerprint: &Fingerprint,
        first: u32,
        after: Option<String>,
    ) -> Result<Page<Commit>, GitLabError> {
        let data = self
            .connection_page(&queries::commit_page(), fingerprint, first, after)
            .await?;
        normalize::commit_page(data)
    }

    async fn discussions_page(
        &self,
        fingerprint: &Fingerprint,
        first: u32,
        after: Option<String>,
    ) -> Result<Page<Discussion>, GitLabError> {
        let data = self
            .connection_page(&queries::discussion_page(), fingerprint, first, after)
            .await?;
        normalize::discussion_page(data)
    }

    async fn diffs(&self, fingerprint: &Fingerprint) -> Result<Vec<FileDiff>, GitLabError> {
        let path = fingerprint.diffs_path();
        let mut files = Vec::new();
        let mut page: u64 = 1;

        for _ in 0..MAX_PAGES {
            let response = self
                .client
                .rest_get(
                    &path,
                    &[
                        ("page", page.to_string()),
                        ("per_page", MAX_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let next = next_page(&response.headers);
            let batch = normalize::diffs(response.body)?;
            let exhausted = batch.is_empty();
            files.extend(batch);

            match next {
                Some(next) if !exhausted && next > page => page = next,
                _ => break,
            }
        }

        tracing::debug!(
            project = fingerprint.project().as_str(),
            iid = fingerprint.iid().get(),
            files = files.len(),
            "fetched merge request diffs"
        );
        Ok(files)
    }

    async fn approvals(&self, fingerprint: &Fingerprint) -> Result<ApprovalInfo, GitLabError> {
        let response = self
            .client
            .rest_get(&fingerprint.approvals_path(), &[])
            .await?;
        normalize::approvals(response.body)
    }
}

fn next_page(headers: &http::HeaderMap) -> Option<u64> {
    headers
        .get(NEXT_PAGE_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
