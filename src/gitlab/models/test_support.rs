//! Builders for [`NormalizedView`] fixtures.
//!
//! # Examples
//!
//! ```
//! use mergelens::gitlab::models::test_support::{minimal_view, view_updated_at};
//!
//! let view = minimal_view("123");
//! assert_eq!(view.iid, "123");
//! assert!(view.diffs.is_empty());
//!
//! let later = view_updated_at("123", 60);
//! assert!(later.updated_at > view.updated_at);
//! ```

use chrono::{DateTime, TimeDelta, Utc};

use super::{ApprovalInfo, Commit, FileDiff, NormalizedView, UserRef};

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_714_557_600, 0).unwrap_or_default()
}

/// A view with only identity fields set and every collection empty.
#[must_use]
pub fn minimal_view(iid: &str) -> NormalizedView {
    view_updated_at(iid, 0)
}

/// Like [`minimal_view`] with `updated_at` shifted by `offset_seconds`.
#[must_use]
pub fn view_updated_at(iid: &str, offset_seconds: i64) -> NormalizedView {
    let created_at = epoch();
    NormalizedView {
        id: format!("gid://gitlab/MergeRequest/{iid}"),
        iid: iid.to_owned(),
        title: format!("Merge request {iid}"),
        description: None,
        state: "opened".to_owned(),
        draft: false,
        web_url: None,
        author: Some(user("alice")),
        assignees: Vec::new(),
        reviewers: Vec::new(),
        labels: Vec::new(),
        source_branch: "feature".to_owned(),
        target_branch: "main".to_owned(),
        merge_status: None,
        created_at,
        updated_at: created_at + TimeDelta::seconds(offset_seconds),
        merged_at: None,
        approvals: ApprovalInfo::default(),
        commits: Vec::new(),
        pipelines: Vec::new(),
        diffs: Vec::new(),
        discussions: Vec::new(),
    }
}

/// A user reference whose fields derive from `username`.
#[must_use]
pub fn user(username: &str) -> UserRef {
    UserRef {
        id: format!("gid://gitlab/User/{username}"),
        username: username.to_owned(),
        name: username.to_owned(),
        avatar_url: None,
        web_url: format!("https://gitlab.example.com/{username}"),
    }
}

/// A commit identified by `sha`.
#[must_use]
pub fn commit(sha: &str) -> Commit {
    Commit {
        sha: sha.to_owned(),
        short_id: None,
        title: Some(format!("Commit {sha}")),
        message: None,
        author_name: None,
        authored_at: None,
        web_url: None,
    }
}

/// A modified file diff for `path`.
#[must_use]
pub fn file_diff(path: &str) -> FileDiff {
    FileDiff {
        old_path: path.to_owned(),
        new_path: path.to_owned(),
        diff: "@@ -1 +1 @@\n-old\n+new\n".to_owned(),
        new_file: false,
        renamed_file: false,
        deleted_file: false,
    }
}
