//! Mergelens CLI entrypoint: load one merge request view and summarize it.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use mergelens::gitlab::{GitLabGateway, ReqwestTransport, TokioClock};
use mergelens::{
    ConfigError, GitLabError, MergeRequestViews, MergelensConfig, NormalizedView, ResilientClient,
    ViewCache,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "mergelens=info";

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    GitLab(#[from] GitLabError),
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<(), AppError> {
    let config = MergelensConfig::load_layers()?;
    let connection = config.connection()?;
    let fingerprint = config.fingerprint()?;

    let transport = ReqwestTransport::new(config.request_timeout())
        .map_err(|failure| GitLabError::network(failure.message))?;
    let client = ResilientClient::new(connection, Arc::new(transport))
        .with_clock(Arc::new(TokioClock))
        .with_policy(config.retry_policy());
    let cache = ViewCache::new(Arc::new(TokioClock))
        .with_capacity(config.cache_capacity)
        .with_ttls(config.cache_ttls());
    let views = MergeRequestViews::new(Arc::new(GitLabGateway::new(client)), Arc::new(cache));

    tracing::info!(key = %fingerprint, "loading merge request");
    let view = views
        .get_view_enriched(&fingerprint, config.view_options(), config.enrichment())
        .await?;

    write_summary(&view)?;
    Ok(())
}

fn write_summary(view: &NormalizedView) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    let author = view
        .author
        .as_ref()
        .map_or("unknown author", |author| author.username.as_str());
    let url = view.web_url.as_deref().unwrap_or("no web URL provided");
    let pipeline = view
        .pipelines
        .first()
        .map_or("none", |pipeline| pipeline.status.as_str());
    let labels = if view.labels.is_empty() {
        "none".to_owned()
    } else {
        view.labels.join(", ")
    };

    writeln!(
        stdout,
        "Loaded !{} by {author}: {}\nState: {} ({} -> {})\nURL: {url}\nLabels: {labels}\nPipeline: {pipeline}\nApproved: {}\nCommits: {}  Discussions: {}  Diffs: {}",
        view.iid,
        view.title,
        view.state,
        view.source_branch,
        view.target_branch,
        view.approvals.approved,
        view.commits.len(),
        view.discussions.len(),
        view.diffs.len(),
    )?;
    Ok(())
}
