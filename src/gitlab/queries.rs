//! GraphQL documents sent to `/api/graphql`.
//!
//! Field selections match what [`normalize`](super::normalize) reads.

const USER_FIELDS: &str = "id username name avatarUrl webUrl";

/// Merge request view with the first page of each nested collection.
///
/// Variables: `$fullPath`, `$iid`, `$commits`, `$discussions`, `$pipelines`.
pub(crate) fn merge_request_view() -> String {
    format!(
        r"query MergeRequestView($fullPath: ID!, $iid: String!, $commits: Int!, $discussions: Int!, $pipelines: Int!) {{
  project(fullPath: $fullPath) {{
    mergeRequest(iid: $iid) {{
      id iid title description state draft webUrl
      sourceBranch targetBranch detailedMergeStatus
      createdAt updatedAt mergedAt
      approved approvalsRequired approvalsLeft
      author {{ {USER_FIELDS} }}
      assignees {{ nodes {{ {USER_FIELDS} }} }}
      reviewers {{ nodes {{ {USER_FIELDS} }} }}
      approvedBy {{ nodes {{ {USER_FIELDS} }} }}
      labels {{ nodes {{ title }} }}
      commits(first: $commits) {{
        pageInfo {{ hasNextPage endCursor }}
        nodes {{ {commit_fields} }}
      }}
      pipelines(first: $pipelines) {{
        nodes {{ id iid status sha ref path createdAt }}
      }}
      discussions(first: $discussions) {{
        pageInfo {{ hasNextPage endCursor }}
        nodes {{ {discussion_fields} }}
      }}
    }}
  }}
}}",
        commit_fields = commit_fields(),
        discussion_fields = discussion_fields(),
    )
}

/// One page of merge request commits.
///
/// Variables: `$fullPath`, `$iid`, `$first`, `$after`.
pub(crate) fn commit_page() -> String {
    format!(
        r"query MergeRequestCommits($fullPath: ID!, $iid: String!, $first: Int!, $after: String) {{
  project(fullPath: $fullPath) {{
    mergeRequest(iid: $iid) {{
      commits(first: $first, after: $after) {{
        pageInfo {{ hasNextPage endCursor }}
        nodes {{ {fields} }}
      }}
    }}
  }}
}}",
        fields = commit_fields(),
    )
}

/// One page of merge request discussions.
///
/// Variables: `$fullPath`, `$iid`, `$first`, `$after`.
pub(crate) fn discussion_page() -> String {
    format!(
        r"query MergeRequestDiscussions($fullPath: ID!, $iid: String!, $first: Int!, $after: String) {{
  project(fullPath: $fullPath) {{
    mergeRequest(iid: $iid) {{
      discussions(first: $first, after: $after) {{
        pageInfo {{ hasNextPage endCursor }}
        nodes {{ {fields} }}
      }}
    }}
  }}
}}",
        fields = discussion_fields(),
    )
}

const fn commit_fields() -> &'static str {
    "sha shortId title message authorName authoredDate webUrl"
}

fn discussion_fields() -> String {
    format!(
        "id resolvable resolved notes {{ nodes {{ id body system createdAt author {{ {USER_FIELDS} }} position {{ filePath newLine oldLine }} }} }}"
    )
}
