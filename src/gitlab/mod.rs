//! GitLab merge request access: resilient transport, pagination,
//! normalization, caching and the view orchestrator.
//!
//! Data is read through the GraphQL API with REST for diffs, approvals and
//! as a fallback for the view itself. Responses from either API normalize
//! into one [`NormalizedView`], which is cached briefly per [`Fingerprint`].
//! Every failure is a [`GitLabError`] carrying an [`ErrorKind`].

pub mod cache;
pub mod clock;
pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;
pub mod normalize;
pub mod pagination;
mod queries;
pub mod transport;
pub mod views;
pub mod watch;

pub use cache::{CacheStats, CacheTtls, ViewCache, shared_cache};
pub use clock::{Clock, TokioClock, system_clock};
pub use error::{ErrorKind, GitLabError};
pub use gateway::{GitLabGateway, MergeRequestGateway, PageSizes};
pub use locator::{AccessToken, Fingerprint, MergeRequestIid, MergeRequestUrl, ProjectPath};
pub use models::{
    ApprovalInfo, Commit, Discussion, FileDiff, Note, NormalizedView, Pipeline, UserRef,
};
pub use transport::{GitLabConnection, HttpTransport, ReqwestTransport, ResilientClient, RetryPolicy};
pub use views::{Enrichment, MergeRequestViews, ViewOptions};
pub use watch::{ViewWatcher, WatchHandle};

#[cfg(any(test, feature = "test-support"))]
pub use clock::ManualClock;
#[cfg(test)]
pub use gateway::MockMergeRequestGateway;
