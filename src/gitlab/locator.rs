//! Identity wrappers and URL parsing for merge request lookups.

use std::fmt;

use url::Url;

use super::error::GitLabError;

/// Full path of a GitLab project, e.g. `group/subgroup/project`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectPath(String);

impl ProjectPath {
    /// Validates that the path is non-empty after trimming slashes and
    /// whitespace.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Validation`](super::ErrorKind::Validation)
    /// error when the path is blank.
    pub fn new(value: impl AsRef<str>) -> Result<Self, GitLabError> {
        let trimmed = value.as_ref().trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(GitLabError::validation("project path is required"));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the full path.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the path encoded for use as a REST `:id` segment.
    pub(crate) fn url_encoded(&self) -> String {
        url::form_urlencoded::byte_serialize(self.0.as_bytes()).collect()
    }
}

/// Project-scoped merge request number (`iid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeRequestIid(u64);

impl MergeRequestIid {
    /// Validates that the iid is positive.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Validation`](super::ErrorKind::Validation)
    /// error for zero.
    pub fn new(value: u64) -> Result<Self, GitLabError> {
        if value == 0 {
            return Err(GitLabError::validation(
                "merge request iid must be a positive integer",
            ));
        }
        Ok(Self(value))
    }

    /// Parses an iid from its decimal text form.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Validation`](super::ErrorKind::Validation)
    /// error when the text is not a positive integer.
    pub fn parse(value: &str) -> Result<Self, GitLabError> {
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| {
                GitLabError::validation(format!("merge request iid `{value}` is not a number"))
            })
            .and_then(Self::new)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MergeRequestIid {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifies a cacheable merge request: project full path plus iid.
///
/// Used as the key for both the view cache and the diff cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    project: ProjectPath,
    iid: MergeRequestIid,
}

impl Fingerprint {
    /// Builds a fingerprint from a project path and a textual iid.
    ///
    /// # Errors
    ///
    /// Returns a validation error when either part is invalid.
    pub fn new(project: impl AsRef<str>, iid: &str) -> Result<Self, GitLabError> {
        Ok(Self {
            project: ProjectPath::new(project)?,
            iid: MergeRequestIid::parse(iid)?,
        })
    }

    /// Builds a fingerprint from already validated parts.
    #[must_use]
    pub const fn from_parts(project: ProjectPath, iid: MergeRequestIid) -> Self {
        Self { project, iid }
    }

    /// Parses a merge request web URL in the form
    /// `https://<host>/<group>/<project>/-/merge_requests/<iid>`.
    ///
    /// Any trailing path after the iid (for example `/diffs`) is ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the URL cannot be parsed or does not
    /// point at a merge request.
    pub fn parse_url(input: &str) -> Result<MergeRequestUrl, GitLabError> {
        let parsed = Url::parse(input.trim())
            .map_err(|error| GitLabError::validation(format!("invalid URL: {error}")))?;

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|parts| parts.filter(|part| !part.is_empty()).collect())
            .unwrap_or_default();

        let marker = segments
            .windows(3)
            .position(|window| matches!(window, ["-", "merge_requests", _]))
            .ok_or_else(|| {
                GitLabError::validation("URL must match /<project>/-/merge_requests/<iid>")
            })?;

        let project_segments = segments.get(..marker).unwrap_or_default();
        let iid_segment = segments.get(marker + 2).copied().unwrap_or_default();

        let fingerprint = Self::new(project_segments.join("/"), iid_segment)?;
        let mut base_url = parsed;
        base_url.set_path("");
        base_url.set_query(None);
        base_url.set_fragment(None);

        Ok(MergeRequestUrl {
            base_url,
            fingerprint,
        })
    }

    /// Project full path.
    #[must_use]
    pub const fn project(&self) -> &ProjectPath {
        &self.project
    }

    /// Merge request iid.
    #[must_use]
    pub const fn iid(&self) -> MergeRequestIid {
        self.iid
    }

    /// Stable textual key, `<project>!<iid>`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}!{}", self.project.as_str(), self.iid)
    }

    pub(crate) fn merge_request_path(&self) -> String {
        format!(
            "projects/{}/merge_requests/{}",
            self.project.url_encoded(),
            self.iid
        )
    }

    pub(crate) fn diffs_path(&self) -> String {
        format!("{}/diffs", self.merge_request_path())
    }

    pub(crate) fn approvals_path(&self) -> String {
        format!("{}/approvals", self.merge_request_path())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.cache_key())
    }
}

/// A parsed merge request web URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestUrl {
    /// Instance root, e.g. `https://gitlab.com/`.
    pub base_url: Url,
    /// Project path and iid extracted from the URL.
    pub fingerprint: Fingerprint,
}

/// Personal, project or group access token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::AuthError`](super::ErrorKind::AuthError) when
    /// the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, GitLabError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(GitLabError::new(
                super::ErrorKind::AuthError,
                "access token is required",
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("AccessToken(***)")
    }
}

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}
