//! REST (`/api/v4`) wire types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::graphql::null_as_default;
use super::{ApprovalInfo, FileDiff, Pipeline, UserRef};

/// REST identifiers are numbers; some proxies return them as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiId {
    Number(u64),
    Text(String),
}

impl ApiId {
    pub(crate) fn into_string(self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub(crate) id: ApiId,
    pub(crate) username: String,
    pub(crate) name: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) web_url: String,
}

impl From<ApiUser> for UserRef {
    fn from(user: ApiUser) -> Self {
        Self {
            id: user.id.into_string(),
            username: user.username,
            name: user.name,
            avatar_url: user.avatar_url.filter(|url| !url.is_empty()),
            web_url: user.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPipeline {
    pub(crate) id: ApiId,
    pub(crate) iid: Option<ApiId>,
    pub(crate) status: String,
    pub(crate) sha: Option<String>,
    #[serde(rename = "ref")]
    pub(crate) git_ref: Option<String>,
    pub(crate) web_url: Option<String>,
    pub(crate) created_at: Option<DateTime<Utc>>,
}

impl From<ApiPipeline> for Pipeline {
    fn from(pipeline: ApiPipeline) -> Self {
        Self {
            id: pipeline.id.into_string(),
            iid: pipeline.iid.map(ApiId::into_string),
            status: pipeline.status.to_lowercase(),
            sha: pipeline.sha,
            git_ref: pipeline.git_ref,
            web_url: pipeline.web_url,
            created_at: pipeline.created_at,
        }
    }
}

/// `GET /projects/:id/merge_requests/:iid`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMergeRequest {
    pub(crate) id: ApiId,
    pub(crate) iid: ApiId,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) state: String,
    #[serde(default)]
    pub(crate) draft: bool,
    pub(crate) web_url: Option<String>,
    pub(crate) author: Option<ApiUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) assignees: Vec<ApiUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) reviewers: Vec<ApiUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) labels: Vec<String>,
    pub(crate) source_branch: String,
    pub(crate) target_branch: String,
    pub(crate) detailed_merge_status: Option<String>,
    pub(crate) merge_status: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) merged_at: Option<DateTime<Utc>>,
    pub(crate) head_pipeline: Option<ApiPipeline>,
}

/// One entry of `GET .../merge_requests/:iid/diffs`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiDiff {
    pub(crate) old_path: String,
    pub(crate) new_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) diff: String,
    #[serde(default)]
    pub(crate) new_file: bool,
    #[serde(default)]
    pub(crate) renamed_file: bool,
    #[serde(default)]
    pub(crate) deleted_file: bool,
}

impl From<ApiDiff> for FileDiff {
    fn from(diff: ApiDiff) -> Self {
        Self {
            old_path: diff.old_path,
            new_path: diff.new_path,
            diff: diff.diff,
            new_file: diff.new_file,
            renamed_file: diff.renamed_file,
            deleted_file: diff.deleted_file,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiApprover {
    pub(crate) user: ApiUser,
}

/// `GET .../merge_requests/:iid/approvals`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiApprovals {
    #[serde(default)]
    pub(crate) approved: bool,
    pub(crate) approvals_required: Option<u32>,
    pub(crate) approvals_left: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) approved_by: Vec<ApiApprover>,
}

impl From<ApiApprovals> for ApprovalInfo {
    fn from(approvals: ApiApprovals) -> Self {
        Self {
            approved: approvals.approved,
            approvals_required: approvals.approvals_required,
            approvals_left: approvals.approvals_left,
            approved_by: approvals
                .approved_by
                .into_iter()
                .map(|approver| UserRef::from(approver.user))
                .collect(),
        }
    }
}
