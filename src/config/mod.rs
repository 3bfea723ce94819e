//! Application configuration loaded from CLI, environment, and files.
//!
//! Values are merged with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.mergelens.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `MERGELENS_BASE_URL`, `MERGELENS_TOKEN`, or
//!    legacy `GITLAB_URL` / `GITLAB_TOKEN`
//! 4. **Command-line arguments** – `--base-url`/`-b`, `--token`/`-t`, ...
//!
//! # Configuration File
//!
//! ```toml
//! base_url = "https://gitlab.example.com"
//! token = "glpat-example"
//! project = "group/app"
//! mr_iid = "123"
//! retries = 3
//! view_ttl_seconds = 30
//! ```

use std::env;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::gitlab::cache::{CacheTtls, DEFAULT_CAPACITY, DEFAULT_DIFF_TTL, DEFAULT_VIEW_TTL};
use crate::gitlab::locator::{AccessToken, Fingerprint};
use crate::gitlab::transport::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_RETRIES, GitLabConnection, RetryPolicy,
};
use crate::gitlab::views::{Enrichment, PageSizes, ViewOptions};

/// Legacy environment variable consulted when no token is configured.
pub const LEGACY_TOKEN_VAR: &str = "GITLAB_TOKEN";
/// Legacy environment variable consulted when no base URL is configured.
pub const LEGACY_URL_VAR: &str = "GITLAB_URL";

/// Configuration problems detected before any request is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No GitLab base URL was supplied.
    #[error("GitLab base URL is required (use --base-url, MERGELENS_BASE_URL or GITLAB_URL)")]
    MissingBaseUrl,
    /// The base URL is not an absolute http(s) URL.
    #[error("invalid GitLab base URL `{value}`: {message}")]
    InvalidBaseUrl {
        /// Offending value.
        value: String,
        /// Parser detail.
        message: String,
    },
    /// No access token was supplied.
    #[error("GitLab token is required (use --token, MERGELENS_TOKEN or GITLAB_TOKEN)")]
    MissingToken,
    /// Neither a merge request URL nor project plus iid was supplied.
    #[error("merge request is required (use --mr-url, or --project with --mr-iid)")]
    MissingMergeRequest,
    /// The merge request reference is malformed.
    #[error("invalid merge request reference: {message}")]
    InvalidMergeRequest {
        /// Validation detail.
        message: String,
    },
    /// ortho-config failed to parse arguments or read files.
    #[error("failed to load configuration: {message}")]
    Load {
        /// Loader detail.
        message: String,
    },
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use mergelens::MergelensConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = MergelensConfig::load().expect("failed to load configuration");
/// let connection = config.connection().expect("base URL and token required");
/// let fingerprint = config.fingerprint().expect("merge request required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "MERGELENS",
    discovery(
        dotfile_name = ".mergelens.toml",
        config_file_name = "mergelens.toml",
        app_name = "mergelens"
    )
)]
pub struct MergelensConfig {
    /// GitLab instance root, e.g. `https://gitlab.com`.
    ///
    /// Can be provided via:
    /// - CLI: `--base-url <URL>` or `-b <URL>`
    /// - Environment: `MERGELENS_BASE_URL` or `GITLAB_URL` (legacy)
    /// - Config file: `base_url = "..."`
    #[ortho_config(cli_short = 'b')]
    pub base_url: Option<String>,

    /// Access token for the GitLab API.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `MERGELENS_TOKEN` or `GITLAB_TOKEN` (legacy)
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Merge request web URL; supplies project, iid and base URL at once.
    #[ortho_config(cli_short = 'u')]
    pub mr_url: Option<String>,

    /// Project full path, e.g. `group/subgroup/app`.
    #[ortho_config(cli_short = 'p')]
    pub project: Option<String>,

    /// Merge request iid within `project`.
    #[ortho_config(cli_short = 'i')]
    pub mr_iid: Option<String>,

    /// Retries after the first attempt of each request.
    #[ortho_config()]
    pub retries: u32,

    /// Base backoff delay in milliseconds.
    #[ortho_config()]
    pub base_delay_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[ortho_config()]
    pub request_timeout_seconds: u64,

    /// Entries per cache space.
    #[ortho_config()]
    pub cache_capacity: usize,

    /// TTL of cached views, in seconds.
    #[ortho_config()]
    pub view_ttl_seconds: u64,

    /// TTL of cached diffs, in seconds.
    #[ortho_config()]
    pub diff_ttl_seconds: u64,

    /// Page size for commit and discussion walks (clamped to 1..=100).
    #[ortho_config()]
    pub page_size: u32,

    /// Bypass the cache lookup.
    ///
    /// Note: `ortho_config` does not load boolean values from the
    /// environment, so use the CLI flag or the config file.
    #[ortho_config(cli_short = 'f')]
    pub force_refresh: bool,

    /// Fetch file diffs over REST.
    #[ortho_config()]
    pub with_diffs: bool,

    /// Fetch approval state over REST.
    #[ortho_config()]
    pub with_approvals: bool,
}

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_VIEW_TTL_SECONDS: u64 = DEFAULT_VIEW_TTL.as_secs();
const DEFAULT_DIFF_TTL_SECONDS: u64 = DEFAULT_DIFF_TTL.as_secs();
const DEFAULT_PAGE_SIZE: u32 = 50;

impl Default for MergelensConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            mr_url: None,
            project: None,
            mr_iid: None,
            retries: DEFAULT_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            cache_capacity: DEFAULT_CAPACITY,
            view_ttl_seconds: DEFAULT_VIEW_TTL_SECONDS,
            diff_ttl_seconds: DEFAULT_DIFF_TTL_SECONDS,
            page_size: DEFAULT_PAGE_SIZE,
            force_refresh: false,
            with_diffs: false,
            with_approvals: false,
        }
    }
}

impl MergelensConfig {
    /// Loads configuration from CLI, environment, and files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when ortho-config fails.
    pub fn load_layers() -> Result<Self, ConfigError> {
        Self::load().map_err(|error| ConfigError::Load {
            message: error.to_string(),
        })
    }

    /// Resolves the token from configuration or the legacy `GITLAB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] when no source provides a
    /// non-blank value.
    pub fn resolve_token(&self) -> Result<AccessToken, ConfigError> {
        self.token
            .clone()
            .or_else(|| env::var(LEGACY_TOKEN_VAR).ok())
            .and_then(|value| AccessToken::new(value).ok())
            .ok_or(ConfigError::MissingToken)
    }

    /// Resolves the instance URL from configuration, `GITLAB_URL`, or the
    /// host of `mr_url`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBaseUrl`] when nothing is configured and
    /// [`ConfigError::InvalidBaseUrl`] for a non-http(s) or relative URL.
    pub fn resolve_base_url(&self) -> Result<Url, ConfigError> {
        let configured = self
            .base_url
            .clone()
            .or_else(|| env::var(LEGACY_URL_VAR).ok())
            .filter(|value| !value.trim().is_empty());

        let Some(value) = configured else {
            return self
                .mr_url
                .as_deref()
                .and_then(|mr_url| Fingerprint::parse_url(mr_url).ok())
                .map(|parsed| parsed.base_url)
                .ok_or(ConfigError::MissingBaseUrl);
        };

        let url = Url::parse(value.trim()).map_err(|error| ConfigError::InvalidBaseUrl {
            value: value.clone(),
            message: error.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl {
                value,
                message: "expected an http or https URL with a host".to_owned(),
            });
        }
        Ok(url)
    }

    /// Validates base URL and token into a connection.
    ///
    /// # Errors
    ///
    /// See [`resolve_base_url`](Self::resolve_base_url) and
    /// [`resolve_token`](Self::resolve_token).
    pub fn connection(&self) -> Result<GitLabConnection, ConfigError> {
        let base_url = self.resolve_base_url()?;
        let token = self.resolve_token()?;
        Ok(GitLabConnection::new(base_url, token))
    }

    /// Identifies the merge request from `mr_url`, or `project` plus
    /// `mr_iid`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingMergeRequest`] when neither form is
    /// present and [`ConfigError::InvalidMergeRequest`] when it is malformed.
    pub fn fingerprint(&self) -> Result<Fingerprint, ConfigError> {
        let invalid = |error: crate::gitlab::GitLabError| ConfigError::InvalidMergeRequest {
            message: error.message,
        };
        if let Some(mr_url) = self.mr_url.as_deref() {
            return Fingerprint::parse_url(mr_url)
                .map(|parsed| parsed.fingerprint)
                .map_err(invalid);
        }
        match (self.project.as_deref(), self.mr_iid.as_deref()) {
            (Some(project), Some(iid)) => Fingerprint::new(project, iid).map_err(invalid),
            _ => Err(ConfigError::MissingMergeRequest),
        }
    }

    /// Retry policy with the configured budget and base delay.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.base_delay_ms))
    }

    /// HTTP timeout for a single request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Per-space cache TTLs.
    #[must_use]
    pub const fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            view: Duration::from_secs(self.view_ttl_seconds),
            diffs: Duration::from_secs(self.diff_ttl_seconds),
        }
    }

    /// Page sizes derived from `page_size`.
    #[must_use]
    pub fn page_sizes(&self) -> PageSizes {
        PageSizes::uniform(self.page_size)
    }

    /// View options derived from `force_refresh` and `page_size`.
    #[must_use]
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            force_refresh: self.force_refresh,
            use_cache: true,
            page_sizes: self.page_sizes(),
        }
    }

    /// REST enrichment requested by `with_diffs` and `with_approvals`.
    #[must_use]
    pub const fn enrichment(&self) -> Enrichment {
        Enrichment {
            diffs: self.with_diffs,
            approvals: self.with_approvals,
        }
    }
}

#[cfg(test)]
mod tests;
