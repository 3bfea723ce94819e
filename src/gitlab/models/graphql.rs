//! GraphQL wire types for the merge request queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::gitlab::pagination::{Page, PageInfo};

use super::{ApprovalInfo, Commit, Discussion, Note, NotePosition, Pipeline, UserRef};

/// Treats an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// `{ nodes: [...] }` wrapper without paging information.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Nodes<T> {
    #[serde(default)]
    pub(crate) nodes: Vec<T>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

/// `{ nodes: [...], pageInfo: {...} }` connection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Connection<T> {
    #[serde(default)]
    pub(crate) nodes: Vec<T>,
    #[serde(default)]
    pub(crate) page_info: PageInfo,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            page_info: PageInfo::default(),
        }
    }
}

impl<T> Connection<T> {
    pub(crate) fn into_page<U>(self, convert: impl FnMut(T) -> U) -> Page<U> {
        Page::new(self.nodes.into_iter().map(convert).collect(), self.page_info)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiUser {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) name: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) web_url: String,
}

impl From<ApiUser> for UserRef {
    fn from(user: ApiUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            avatar_url: user.avatar_url.filter(|url| !url.is_empty()),
            web_url: user.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiLabel {
    pub(crate) title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiCommit {
    pub(crate) sha: String,
    pub(crate) short_id: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) author_name: Option<String>,
    pub(crate) authored_date: Option<DateTime<Utc>>,
    pub(crate) web_url: Option<String>,
}

impl From<ApiCommit> for Commit {
    fn from(commit: ApiCommit) -> Self {
        Self {
            sha: commit.sha,
            short_id: commit.short_id,
            title: commit.title,
            message: commit.message,
            author_name: commit.author_name,
            authored_at: commit.authored_date,
            web_url: commit.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiPipeline {
    pub(crate) id: String,
    pub(crate) iid: Option<String>,
    pub(crate) status: String,
    pub(crate) sha: Option<String>,
    #[serde(rename = "ref")]
    pub(crate) git_ref: Option<String>,
    pub(crate) path: Option<String>,
    pub(crate) created_at: Option<DateTime<Utc>>,
}

impl From<ApiPipeline> for Pipeline {
    fn from(pipeline: ApiPipeline) -> Self {
        Self {
            id: pipeline.id,
            iid: pipeline.iid,
            status: pipeline.status.to_lowercase(),
            sha: pipeline.sha,
            git_ref: pipeline.git_ref,
            web_url: pipeline.path,
            created_at: pipeline.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiPosition {
    pub(crate) file_path: Option<String>,
    pub(crate) new_line: Option<u32>,
    pub(crate) old_line: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiNote {
    pub(crate) id: String,
    pub(crate) body: Option<String>,
    pub(crate) author: Option<ApiUser>,
    #[serde(default)]
    pub(crate) system: bool,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) position: Option<ApiPosition>,
}

impl From<ApiNote> for Note {
    fn from(note: ApiNote) -> Self {
        Self {
            id: note.id,
            body: note.body,
            author: note.author.map(UserRef::from),
            system: note.system,
            created_at: note.created_at,
            position: note.position.map(|position| NotePosition {
                file_path: position.file_path,
                new_line: position.new_line,
                old_line: position.old_line,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiDiscussion {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) resolvable: bool,
    #[serde(default)]
    pub(crate) resolved: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) notes: Nodes<ApiNote>,
}

impl From<ApiDiscussion> for Discussion {
    fn from(discussion: ApiDiscussion) -> Self {
        Self {
            id: discussion.id,
            resolvable: discussion.resolvable,
            resolved: discussion.resolved,
            notes: discussion.notes.nodes.into_iter().map(Note::from).collect(),
        }
    }
}

/// The `mergeRequest` object returned by the view query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiMergeRequest {
    pub(crate) id: String,
    pub(crate) iid: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) state: String,
    #[serde(default)]
    pub(crate) draft: bool,
    pub(crate) web_url: Option<String>,
    pub(crate) author: Option<ApiUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) assignees: Nodes<ApiUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) reviewers: Nodes<ApiUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) labels: Nodes<ApiLabel>,
    pub(crate) source_branch: String,
    pub(crate) target_branch: String,
    pub(crate) detailed_merge_status: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) approved: bool,
    pub(crate) approvals_required: Option<u32>,
    pub(crate) approvals_left: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) approved_by: Nodes<ApiUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) commits: Connection<ApiCommit>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) pipelines: Nodes<ApiPipeline>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) discussions: Connection<ApiDiscussion>,
}

impl ApiMergeRequest {
    pub(crate) fn approvals(&mut self) -> ApprovalInfo {
        ApprovalInfo {
            approved: self.approved,
            approvals_required: self.approvals_required,
            approvals_left: self.approvals_left,
            approved_by: std::mem::take(&mut self.approved_by.nodes)
                .into_iter()
                .map(UserRef::from)
                .collect(),
        }
    }
}
