//! Tests for merge request normalization.

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::{RawMergeRequest, approvals, commit_page, diffs, discussion_page, normalize};
use crate::gitlab::error::ErrorKind;

fn user(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "name": format!("{username} name"),
        "avatarUrl": null,
        "webUrl": format!("https://gitlab.example.com/{username}")
    })
}

#[fixture]
fn graphql_merge_request() -> Value {
    json!({
        "id": "gid://gitlab/MergeRequest/900",
        "iid": "123",
        "title": "Add retry policy",
        "description": "",
        "state": "opened",
        "draft": false,
        "webUrl": "https://gitlab.example.com/group/app/-/merge_requests/123",
        "author": user("gid://gitlab/User/1", "alice"),
        "assignees": { "nodes": [user("gid://gitlab/User/2", "bob")] },
        "reviewers": { "nodes": [] },
        "labels": { "nodes": [{ "title": "zeta" }, { "title": "alpha" }] },
        "sourceBranch": "feature/retry",
        "targetBranch": "main",
        "detailedMergeStatus": "MERGEABLE",
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": "2024-05-02T11:30:00+02:00",
        "mergedAt": null,
        "approved": true,
        "approvedBy": { "nodes": [user("gid://gitlab/User/3", "carol")] },
        "commits": {
            "pageInfo": { "hasNextPage": true, "endCursor": "c1" },
            "nodes": [{ "sha": "abc123", "shortId": "abc", "title": "First" }]
        },
        "pipelines": {
            "nodes": [{ "id": "gid://gitlab/Ci::Pipeline/5", "status": "SUCCESS" }]
        },
        "discussions": { "nodes": [] }
    })
}

fn wrap(merge_request: Value) -> Value {
    json!({ "data": { "project": { "mergeRequest": merge_request } } })
}

#[rstest]
fn graphql_view_maps_identity_and_actors(graphql_merge_request: Value) {
    let view = normalize(RawMergeRequest::GraphQl(wrap(graphql_merge_request)))
        .expect("payload should normalize");

    assert_eq!(view.iid, "123");
    assert_eq!(view.title, "Add retry policy");
    assert_eq!(view.description, None, "blank description is absent");
    assert_eq!(view.author.as_ref().map(|a| a.username.as_str()), Some("alice"));
    assert_eq!(view.assignees.len(), 1);
    assert!(view.reviewers.is_empty());
    assert_eq!(view.merge_status.as_deref(), Some("mergeable"));
    assert_eq!(
        view.updated_at,
        Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    );
}

#[rstest]
fn labels_keep_source_order(graphql_merge_request: Value) {
    let view = normalize(RawMergeRequest::GraphQl(wrap(graphql_merge_request)))
        .expect("payload should normalize");
    assert_eq!(view.labels, vec!["zeta", "alpha"]);
}

#[rstest]
fn missing_merged_at_is_absent(mut graphql_merge_request: Value) {
    if let Some(object) = graphql_merge_request.as_object_mut() {
        object.remove("mergedAt");
    }
    let view = normalize(RawMergeRequest::GraphQl(wrap(graphql_merge_request)))
        .expect("payload should normalize");
    assert!(view.merged_at.is_none());
}

#[rstest]
fn graphql_view_leaves_rest_only_collections_empty(graphql_merge_request: Value) {
    let view = normalize(RawMergeRequest::GraphQl(wrap(graphql_merge_request)))
        .expect("payload should normalize");

    assert!(view.diffs.is_empty());
    assert!(view.approvals.approved);
    assert_eq!(view.approvals.approvals_required, None);
    assert_eq!(view.approvals.approved_by.len(), 1);
    assert_eq!(view.commits.len(), 1);
    assert_eq!(view.pipelines.first().map(|p| p.status.as_str()), Some("success"));
}

#[rstest]
fn null_connections_become_empty(mut graphql_merge_request: Value) {
    if let Some(object) = graphql_merge_request.as_object_mut() {
        object.insert("labels".to_owned(), Value::Null);
        object.insert("discussions".to_owned(), Value::Null);
    }
    let view = normalize(RawMergeRequest::GraphQl(wrap(graphql_merge_request)))
        .expect("payload should normalize");
    assert!(view.labels.is_empty());
    assert!(view.discussions.is_empty());
}

#[rstest]
#[case::relative_path(
    json!("https://gitlab.example.com/group/app/-/merge_requests/123"),
    json!("/group/app/-/pipelines/5"),
    Some("https://gitlab.example.com/group/app/-/pipelines/5")
)]
#[case::already_absolute(
    json!("https://gitlab.example.com/group/app/-/merge_requests/123"),
    json!("https://ci.example.com/pipelines/5"),
    Some("https://ci.example.com/pipelines/5")
)]
#[case::no_merge_request_url(Value::Null, json!("/group/app/-/pipelines/5"), None)]
#[case::no_path(
    json!("https://gitlab.example.com/group/app/-/merge_requests/123"),
    Value::Null,
    None
)]
fn pipeline_paths_resolve_against_the_instance(
    mut graphql_merge_request: Value,
    #[case] web_url: Value,
    #[case] pipeline_path: Value,
    #[case] expected: Option<&str>,
) {
    if let Some(object) = graphql_merge_request.as_object_mut() {
        object.insert("webUrl".to_owned(), web_url);
        object.insert(
            "pipelines".to_owned(),
            json!({ "nodes": [{
                "id": "gid://gitlab/Ci::Pipeline/5",
                "status": "SUCCESS",
                "path": pipeline_path
            }] }),
        );
    }
    let view = normalize(RawMergeRequest::GraphQl(wrap(graphql_merge_request)))
        .expect("payload should normalize");
    let pipeline = view.pipelines.first().expect("one pipeline");
    assert_eq!(pipeline.web_url.as_deref(), expected);
}

#[rstest]
#[case::no_project(json!({ "data": {} }), ErrorKind::Validation)]
#[case::no_merge_request(json!({ "data": { "project": {} } }), ErrorKind::Validation)]
#[case::data_not_object(json!({ "data": [] }), ErrorKind::Validation)]
#[case::null_project(json!({ "data": { "project": null } }), ErrorKind::NotFound)]
#[case::null_merge_request(
    json!({ "data": { "project": { "mergeRequest": null } } }),
    ErrorKind::NotFound
)]
fn absent_roots_are_rejected(#[case] body: Value, #[case] expected: ErrorKind) {
    let error = normalize(RawMergeRequest::GraphQl(body)).expect_err("root is absent");
    assert_eq!(error.kind, expected);
    assert!(!error.kind.is_retryable());
}

#[rstest]
fn wrong_field_types_are_validation_errors(mut graphql_merge_request: Value) {
    if let Some(object) = graphql_merge_request.as_object_mut() {
        object.insert("title".to_owned(), json!(42));
    }
    let error = normalize(RawMergeRequest::GraphQl(wrap(graphql_merge_request)))
        .expect_err("title has the wrong type");
    assert_eq!(error.kind, ErrorKind::Validation);
}

#[rstest]
fn accepts_unwrapped_data_object(graphql_merge_request: Value) {
    let body = json!({ "project": { "mergeRequest": graphql_merge_request } });
    let view = normalize(RawMergeRequest::GraphQl(body)).expect("payload should normalize");
    assert_eq!(view.iid, "123");
}

#[rstest]
fn rest_view_uses_head_pipeline_and_numeric_ids() {
    let body = json!({
        "id": 900,
        "iid": 123,
        "title": "Add retry policy",
        "description": "Details",
        "state": "merged",
        "source_branch": "feature/retry",
        "target_branch": "main",
        "merge_status": "can_be_merged",
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-02T10:00:00Z",
        "merged_at": "2024-05-03T10:00:00Z",
        "labels": ["backend", "api"],
        "author": {
            "id": 1, "username": "alice", "name": "Alice",
            "avatar_url": "", "web_url": "https://gitlab.example.com/alice"
        },
        "assignees": null,
        "head_pipeline": { "id": 55, "iid": 4, "status": "failed", "ref": "feature/retry" }
    });

    let view = normalize(RawMergeRequest::Rest(body)).expect("payload should normalize");

    assert_eq!(view.id, "900");
    assert_eq!(view.description.as_deref(), Some("Details"));
    assert_eq!(view.labels, vec!["backend", "api"]);
    assert!(view.merged_at.is_some());
    assert!(view.assignees.is_empty());
    assert_eq!(
        view.author.and_then(|author| author.avatar_url),
        None,
        "empty avatar URL is absent"
    );
    assert_eq!(view.pipelines.len(), 1);
    assert_eq!(view.pipelines.first().map(|p| p.id.as_str()), Some("55"));
    assert_eq!(view.merge_status.as_deref(), Some("can_be_merged"));
    assert!(view.commits.is_empty());
    assert!(view.discussions.is_empty());
    assert_eq!(view.approvals, crate::gitlab::models::ApprovalInfo::default());
}

#[rstest]
fn rest_view_must_be_an_object() {
    let error = normalize(RawMergeRequest::Rest(json!([]))).expect_err("not an object");
    assert_eq!(error.kind, ErrorKind::Validation);
}

#[rstest]
fn commit_page_reads_nodes_and_page_info() {
    let body = json!({ "project": { "mergeRequest": { "commits": {
        "pageInfo": { "hasNextPage": false, "endCursor": null },
        "nodes": [{ "sha": "a1", "title": "One" }, { "sha": "b2", "title": "Two" }]
    }}}});

    let page = commit_page(body).expect("page should decode");

    let shas: Vec<&str> = page.items.iter().map(|commit| commit.sha.as_str()).collect();
    assert_eq!(shas, vec!["a1", "b2"]);
    assert!(page.page_info.is_exhausted());
}

#[rstest]
fn null_commit_title_and_note_body_stay_absent() {
    let commits = commit_page(json!({ "project": { "mergeRequest": { "commits": {
        "pageInfo": { "hasNextPage": false, "endCursor": null },
        "nodes": [{ "sha": "a1", "title": null }, { "sha": "b2" }]
    }}}}))
    .expect("page should decode");
    let titles: Vec<Option<&str>> = commits
        .items
        .iter()
        .map(|commit| commit.title.as_deref())
        .collect();
    assert_eq!(titles, vec![None, None]);

    let discussions = discussion_page(json!({ "project": { "mergeRequest": { "discussions": {
        "pageInfo": { "hasNextPage": false, "endCursor": null },
        "nodes": [{
            "id": "gid://gitlab/Discussion/2",
            "notes": { "nodes": [{ "id": "gid://gitlab/Note/2", "body": null }] }
        }]
    }}}}))
    .expect("page should decode");
    let note = discussions
        .items
        .first()
        .and_then(|discussion| discussion.notes.first())
        .expect("one note");
    assert_eq!(note.body, None);
}

#[rstest]
fn discussion_page_flattens_notes() {
    let body = json!({ "project": { "mergeRequest": { "discussions": {
        "pageInfo": { "hasNextPage": true, "endCursor": "d1" },
        "nodes": [{
            "id": "gid://gitlab/Discussion/1",
            "resolvable": true,
            "resolved": false,
            "notes": { "nodes": [{
                "id": "gid://gitlab/Note/1",
                "body": "Looks good",
                "system": false,
                "author": user("gid://gitlab/User/1", "alice"),
                "position": { "filePath": "src/lib.rs", "newLine": 10, "oldLine": null }
            }]}
        }]
    }}}});

    let page = discussion_page(body).expect("page should decode");

    let discussion = page.items.first().expect("one discussion");
    assert!(discussion.resolvable);
    let note = discussion.notes.first().expect("one note");
    assert_eq!(note.body.as_deref(), Some("Looks good"));
    assert_eq!(
        note.position.as_ref().and_then(|p| p.file_path.as_deref()),
        Some("src/lib.rs")
    );
    assert_eq!(page.page_info.end_cursor(), Some("d1"));
}

#[rstest]
fn rest_diffs_and_approvals_decode() {
    let files = diffs(json!([{
        "old_path": "a.rs", "new_path": "b.rs", "diff": "@@ -1 +1 @@",
        "renamed_file": true
    }]))
    .expect("diffs should decode");
    assert_eq!(files.len(), 1);
    assert!(files.first().is_some_and(|file| file.renamed_file));

    let info = approvals(json!({
        "approved": false,
        "approvals_required": 2,
        "approvals_left": 1,
        "approved_by": [{ "user": {
            "id": 3, "username": "carol", "name": "Carol",
            "web_url": "https://gitlab.example.com/carol"
        }}]
    }))
    .expect("approvals should decode");
    assert_eq!(info.approvals_left, Some(1));
    assert_eq!(info.approved_by.first().map(|u| u.id.as_str()), Some("3"));
}
