//! Canonical merge request view and its collections.
//!
//! These types are transport-agnostic: both GraphQL and REST responses
//! normalize into them. Wire-format types live in the `graphql` and `rest`
//! submodules and are only visible inside the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::Identified;

pub(crate) mod graphql;
pub(crate) mod rest;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// A GitLab user as referenced from a merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User identifier (GraphQL global id or REST numeric id as text).
    pub id: String,
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Avatar URL when the user has one.
    pub avatar_url: Option<String>,
    /// Profile URL.
    pub web_url: String,
}

/// A commit belonging to the merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit SHA.
    pub sha: String,
    /// Abbreviated SHA.
    pub short_id: Option<String>,
    /// First line of the message, absent when GitLab reports none.
    pub title: Option<String>,
    /// Full commit message.
    pub message: Option<String>,
    /// Author name recorded in the commit.
    pub author_name: Option<String>,
    /// Authoring timestamp.
    pub authored_at: Option<DateTime<Utc>>,
    /// Web URL of the commit.
    pub web_url: Option<String>,
}

impl Identified for Commit {
    fn identity(&self) -> &str {
        &self.sha
    }
}

/// A CI pipeline run for the merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline identifier.
    pub id: String,
    /// Project-scoped pipeline number.
    pub iid: Option<String>,
    /// Status, lower-cased (e.g. `success`, `running`).
    pub status: String,
    /// Commit SHA the pipeline ran against.
    pub sha: Option<String>,
    /// Branch or tag.
    pub git_ref: Option<String>,
    /// Absolute web URL of the pipeline, absent when it cannot be resolved.
    pub web_url: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
}

/// One changed file in the merge request diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path before the change.
    pub old_path: String,
    /// Path after the change.
    pub new_path: String,
    /// Unified diff text; empty for binary or collapsed diffs.
    pub diff: String,
    /// The file was added.
    pub new_file: bool,
    /// The file was renamed.
    pub renamed_file: bool,
    /// The file was deleted.
    pub deleted_file: bool,
}

/// Location of a diff note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePosition {
    /// File the note is attached to.
    pub file_path: Option<String>,
    /// Line in the new version.
    pub new_line: Option<u32>,
    /// Line in the old version.
    pub old_line: Option<u32>,
}

/// A single note (comment) inside a discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Note identifier.
    pub id: String,
    /// Markdown body, absent when GitLab reports none.
    pub body: Option<String>,
    /// Author, absent for deleted users.
    pub author: Option<UserRef>,
    /// True for system-generated notes.
    pub system: bool,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Diff position for inline notes.
    pub position: Option<NotePosition>,
}

/// A discussion thread on the merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    /// Discussion identifier.
    pub id: String,
    /// Whether the thread can be resolved.
    pub resolvable: bool,
    /// Whether the thread is resolved.
    pub resolved: bool,
    /// Notes in display order.
    pub notes: Vec<Note>,
}

impl Identified for Discussion {
    fn identity(&self) -> &str {
        &self.id
    }
}

/// Approval state of the merge request.
///
/// The default value means "not approved, nobody approved", which is also
/// what a view starts with before approvals are fetched over REST.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalInfo {
    /// Whether the approval rules are satisfied.
    pub approved: bool,
    /// Number of approvals required, when known.
    pub approvals_required: Option<u32>,
    /// Approvals still missing, when known.
    pub approvals_left: Option<u32>,
    /// Users who approved.
    pub approved_by: Vec<UserRef>,
}

/// The canonical merge request representation shared by all consumers.
///
/// Collections that the originating transport could not supply are empty,
/// never absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedView {
    /// Global identifier.
    pub id: String,
    /// Project-scoped number.
    pub iid: String,
    /// Title.
    pub title: String,
    /// Description, absent when empty on the server.
    pub description: Option<String>,
    /// State (`opened`, `closed`, `merged`, `locked`).
    pub state: String,
    /// Whether the merge request is marked as draft.
    pub draft: bool,
    /// Web URL.
    pub web_url: Option<String>,
    /// Author, absent for deleted users.
    pub author: Option<UserRef>,
    /// Assigned users.
    pub assignees: Vec<UserRef>,
    /// Requested reviewers.
    pub reviewers: Vec<UserRef>,
    /// Label names in the order returned by GitLab.
    pub labels: Vec<String>,
    /// Source branch.
    pub source_branch: String,
    /// Target branch.
    pub target_branch: String,
    /// Detailed merge status reported by GitLab.
    pub merge_status: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp; used for change detection.
    pub updated_at: DateTime<Utc>,
    /// Merge timestamp, absent until merged.
    pub merged_at: Option<DateTime<Utc>>,
    /// Approval state.
    pub approvals: ApprovalInfo,
    /// Commits (first page only when built from the view query).
    pub commits: Vec<Commit>,
    /// Pipelines, newest first.
    pub pipelines: Vec<Pipeline>,
    /// File diffs; empty until fetched over REST.
    pub diffs: Vec<FileDiff>,
    /// Discussions (first page only when built from the view query).
    pub discussions: Vec<Discussion>,
}
