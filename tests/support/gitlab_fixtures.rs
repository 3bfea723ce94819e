//! GitLab payload builders and client wiring shared by integration tests.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use mergelens::gitlab::{
    AccessToken, Clock, GitLabConnection, GitLabGateway, ManualClock, ReqwestTransport,
    ResilientClient, RetryPolicy,
};
use serde_json::{Value, json};
use url::Url;

/// Token the mock server expects on every request.
pub const TOKEN: &str = "glpat-integration";
/// Project used by every fixture.
pub const PROJECT: &str = "group/app";
/// REST path suffix of merge request 123, matched with a regex because the
/// project segment is percent-encoded.
pub const REST_MERGE_REQUEST_123: &str = r"^/api/v4/projects/[^/]+/merge_requests/123$";

/// Result type for tests that report failures through `?`.
pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

fn user(id: u64, username: &str) -> Value {
    json!({
        "id": format!("gid://gitlab/User/{id}"),
        "username": username,
        "name": username,
        "avatarUrl": null,
        "webUrl": format!("https://gitlab.example.com/{username}")
    })
}

/// A GraphQL `mergeRequest` node with one commit page and one pipeline.
pub fn graphql_merge_request(iid: &str, title: &str, updated_at: &str) -> Value {
    json!({
        "id": format!("gid://gitlab/MergeRequest/{iid}00"),
        "iid": iid,
        "title": title,
        "description": "Adds resilient fetching",
        "state": "opened",
        "draft": false,
        "webUrl": format!("https://gitlab.example.com/{PROJECT}/-/merge_requests/{iid}"),
        "author": user(1, "alice"),
        "assignees": { "nodes": [user(2, "bob")] },
        "reviewers": { "nodes": [] },
        "labels": { "nodes": [{ "title": "backend" }] },
        "sourceBranch": "feature/retry",
        "targetBranch": "main",
        "detailedMergeStatus": "MERGEABLE",
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": updated_at,
        "mergedAt": null,
        "approved": false,
        "approvedBy": { "nodes": [] },
        "commits": {
            "pageInfo": { "hasNextPage": false, "endCursor": null },
            "nodes": [{ "sha": "abc123", "shortId": "abc", "title": "Add retry" }]
        },
        "pipelines": { "nodes": [{ "id": "gid://gitlab/Ci::Pipeline/7", "status": "RUNNING" }] },
        "discussions": {
            "pageInfo": { "hasNextPage": false, "endCursor": null },
            "nodes": []
        }
    })
}

/// Wraps a merge request node in the GraphQL response envelope.
pub fn graphql_body(merge_request: Value) -> Value {
    json!({ "data": { "project": { "mergeRequest": merge_request } } })
}

/// GraphQL response for one commit connection page.
pub fn commit_page_body(shas: &[&str], end_cursor: Option<&str>) -> Value {
    let nodes: Vec<Value> = shas
        .iter()
        .map(|sha| json!({ "sha": sha, "title": format!("Commit {sha}") }))
        .collect();
    json!({ "data": { "project": { "mergeRequest": { "commits": {
        "pageInfo": { "hasNextPage": end_cursor.is_some(), "endCursor": end_cursor },
        "nodes": nodes
    }}}}})
}

/// REST representation of merge request 123.
pub fn rest_merge_request(title: &str) -> Value {
    json!({
        "id": 12300,
        "iid": 123,
        "title": title,
        "description": null,
        "state": "merged",
        "source_branch": "feature/retry",
        "target_branch": "main",
        "merge_status": "can_be_merged",
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-02T10:00:00Z",
        "merged_at": "2024-05-03T10:00:00Z",
        "labels": ["backend"],
        "author": {
            "id": 1, "username": "alice", "name": "Alice",
            "avatar_url": null, "web_url": "https://gitlab.example.com/alice"
        },
        "head_pipeline": { "id": 55, "iid": 4, "status": "success", "ref": "feature/retry" }
    })
}

/// REST diff entries named after `paths`.
pub fn rest_diffs(paths: &[&str]) -> Value {
    let entries: Vec<Value> = paths
        .iter()
        .map(|path| json!({ "old_path": path, "new_path": path, "diff": "@@ -1 +1 @@" }))
        .collect();
    Value::Array(entries)
}

/// Builds a gateway against `server_uri` whose backoff sleeps go to `clock`.
///
/// Jitter is disabled so recorded sleeps are exact.
///
/// # Errors
///
/// Returns an error when the URL, token or HTTP client cannot be built.
pub fn gateway_for(server_uri: &str, clock: &Arc<ManualClock>) -> TestResult<GitLabGateway> {
    Ok(GitLabGateway::new(client_for(server_uri, clock)?))
}

/// Builds a resilient client against `server_uri`.
///
/// # Errors
///
/// Returns an error when the URL, token or HTTP client cannot be built.
pub fn client_for(server_uri: &str, clock: &Arc<ManualClock>) -> TestResult<ResilientClient> {
    let connection = GitLabConnection::new(Url::parse(server_uri)?, AccessToken::new(TOKEN)?);
    let transport = ReqwestTransport::new(Duration::from_secs(5))?;
    Ok(ResilientClient::new(connection, Arc::new(transport))
        .with_clock(Arc::clone(clock) as Arc<dyn Clock>)
        .with_policy(RetryPolicy::new(3, Duration::from_secs(1)).with_jitter(false)))
}
