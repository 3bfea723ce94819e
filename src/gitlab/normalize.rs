//! Maps raw GraphQL and REST responses into [`NormalizedView`].
//!
//! Normalization is pure. Structural problems (a missing root object, a
//! field of the wrong type) fail with [`ErrorKind::Validation`] because
//! refetching the same payload cannot help. An explicit `null` project or
//! merge request is GitLab's way of saying "not found or not visible" and
//! maps to [`ErrorKind::NotFound`].
//!
//! [`ErrorKind::Validation`]: super::ErrorKind::Validation
//! [`ErrorKind::NotFound`]: super::ErrorKind::NotFound

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::error::GitLabError;
use super::models::graphql::{self, ApiCommit, ApiDiscussion, Connection};
use super::models::rest::{self, ApiApprovals, ApiDiff};
use super::models::{
    ApprovalInfo, Commit, Discussion, FileDiff, NormalizedView, Pipeline, UserRef,
};
use super::pagination::Page;

/// A raw merge request payload tagged with the shape it arrived in.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMergeRequest {
    /// GraphQL response, either the full body or its `data` object.
    GraphQl(Value),
    /// REST merge request object.
    Rest(Value),
}

/// Normalizes a raw merge request payload.
///
/// # Errors
///
/// Returns [`ErrorKind::Validation`](super::ErrorKind::Validation) for a
/// structurally invalid payload and
/// [`ErrorKind::NotFound`](super::ErrorKind::NotFound) when GitLab reports
/// the project or merge request as `null`.
///
/// # Example
///
/// ```
/// use mergelens::gitlab::normalize::{RawMergeRequest, normalize};
/// use serde_json::json;
///
/// let raw = json!({
///     "id": 7, "iid": 3, "title": "Fix", "state": "opened",
///     "source_branch": "fix", "target_branch": "main",
///     "created_at": "2024-05-01T10:00:00Z", "updated_at": "2024-05-02T10:00:00Z",
///     "labels": ["b", "a"]
/// });
/// let view = normalize(RawMergeRequest::Rest(raw)).expect("valid payload");
/// assert_eq!(view.iid, "3");
/// assert_eq!(view.labels, vec!["b", "a"]);
/// assert!(view.merged_at.is_none());
/// assert!(view.diffs.is_empty());
/// ```
pub fn normalize(raw: RawMergeRequest) -> Result<NormalizedView, GitLabError> {
    match raw {
        RawMergeRequest::GraphQl(body) => {
            let merge_request = merge_request_root(body)?;
            from_graphql(decode(merge_request, "merge request")?)
        }
        RawMergeRequest::Rest(body) => {
            if !body.is_object() {
                return Err(GitLabError::validation(
                    "merge request payload is not an object",
                ));
            }
            Ok(from_rest(decode(body, "merge request")?))
        }
    }
}

/// Extracts one page of commits from a commit page query result.
pub(crate) fn commit_page(body: Value) -> Result<Page<Commit>, GitLabError> {
    let connection: Connection<ApiCommit> = connection(body, "commits")?;
    Ok(connection.into_page(Commit::from))
}

/// Extracts one page of discussions from a discussion page query result.
pub(crate) fn discussion_page(body: Value) -> Result<Page<Discussion>, GitLabError> {
    let connection: Connection<ApiDiscussion> = connection(body, "discussions")?;
    Ok(connection.into_page(Discussion::from))
}

/// Decodes one page of the REST diff listing.
pub(crate) fn diffs(body: Value) -> Result<Vec<FileDiff>, GitLabError> {
    let entries: Vec<ApiDiff> = decode(body, "diff listing")?;
    Ok(entries.into_iter().map(FileDiff::from).collect())
}

/// Decodes the REST approvals resource.
pub(crate) fn approvals(body: Value) -> Result<ApprovalInfo, GitLabError> {
    let approvals: ApiApprovals = decode(body, "approvals")?;
    Ok(approvals.into())
}

fn merge_request_root(body: Value) -> Result<Value, GitLabError> {
    let mut data = match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    let mut project = take_root(&mut data, "project")?;
    take_root(&mut project, "mergeRequest")
}

fn take_root(parent: &mut Value, key: &str) -> Result<Value, GitLabError> {
    let Some(object) = parent.as_object_mut() else {
        return Err(GitLabError::validation(format!(
            "expected an object containing `{key}`"
        )));
    };
    match object.remove(key) {
        None => Err(GitLabError::validation(format!(
            "response is missing `{key}`"
        ))),
        Some(Value::Null) => Err(GitLabError::not_found(format!(
            "`{key}` not found or not accessible"
        ))),
        Some(value) => Ok(value),
    }
}

fn connection<T: DeserializeOwned>(
    body: Value,
    field: &str,
) -> Result<Connection<T>, GitLabError> {
    let mut merge_request = merge_request_root(body)?;
    let value = merge_request
        .as_object_mut()
        .and_then(|object| object.remove(field))
        .unwrap_or(Value::Null);
    if value.is_null() {
        return Ok(Connection::default());
    }
    decode(value, field)
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, GitLabError> {
    serde_json::from_value(value)
        .map_err(|error| GitLabError::validation(format!("malformed {what}: {error}")))
}

fn from_graphql(mut merge_request: graphql::ApiMergeRequest) -> Result<NormalizedView, GitLabError> {
    let approvals = merge_request.approvals();
    let graphql::ApiMergeRequest {
        id,
        iid,
        title,
        description,
        state,
        draft,
        web_url,
        author,
        assignees,
        reviewers,
        labels,
        source_branch,
        target_branch,
        detailed_merge_status,
        created_at,
        updated_at,
        merged_at,
        commits,
        pipelines,
        discussions,
        ..
    } = merge_request;

    if iid.trim().is_empty() {
        return Err(GitLabError::validation("merge request iid is empty"));
    }

    let base_url = web_url.as_deref().and_then(|url| Url::parse(url).ok());
    let pipelines = pipelines
        .nodes
        .into_iter()
        .map(|node| with_absolute_url(Pipeline::from(node), base_url.as_ref()))
        .collect();

    Ok(NormalizedView {
        id,
        iid,
        title,
        description: non_empty(description),
        state,
        draft,
        web_url,
        author: author.map(UserRef::from),
        assignees: assignees.nodes.into_iter().map(UserRef::from).collect(),
        reviewers: reviewers.nodes.into_iter().map(UserRef::from).collect(),
        labels: labels.nodes.into_iter().map(|label| label.title).collect(),
        source_branch,
        target_branch,
        merge_status: detailed_merge_status.map(|status| status.to_lowercase()),
        created_at,
        updated_at,
        merged_at,
        approvals,
        commits: commits.nodes.into_iter().map(Commit::from).collect(),
        pipelines,
        diffs: Vec::new(),
        discussions: discussions
            .nodes
            .into_iter()
            .map(Discussion::from)
            .collect(),
    })
}

/// GraphQL reports pipeline paths relative to the instance root.
fn with_absolute_url(mut pipeline: Pipeline, base_url: Option<&Url>) -> Pipeline {
    pipeline.web_url = pipeline.web_url.and_then(|path| {
        Url::parse(&path)
            .ok()
            .or_else(|| base_url.and_then(|base| base.join(&path).ok()))
            .map(String::from)
    });
    pipeline
}

fn from_rest(merge_request: rest::ApiMergeRequest) -> NormalizedView {
    NormalizedView {
        id: merge_request.id.into_string(),
        iid: merge_request.iid.into_string(),
        title: merge_request.title,
        description: non_empty(merge_request.description),
        state: merge_request.state,
        draft: merge_request.draft,
        web_url: merge_request.web_url,
        author: merge_request.author.map(UserRef::from),
        assignees: merge_request
            .assignees
            .into_iter()
            .map(UserRef::from)
            .collect(),
        reviewers: merge_request
            .reviewers
            .into_iter()
            .map(UserRef::from)
            .collect(),
        labels: merge_request.labels,
        source_branch: merge_request.source_branch,
        target_branch: merge_request.target_branch,
        merge_status: merge_request
            .detailed_merge_status
            .or(merge_request.merge_status),
        created_at: merge_request.created_at,
        updated_at: merge_request.updated_at,
        merged_at: merge_request.merged_at,
        approvals: ApprovalInfo::default(),
        commits: Vec::new(),
        pipelines: merge_request
            .head_pipeline
            .into_iter()
            .map(Pipeline::from)
            .collect(),
        diffs: Vec::new(),
        discussions: Vec::new(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests;
