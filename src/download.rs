//! Download phase entry point: stage, fetch, assemble.
//!
//! Accepted bodies are written into a run-scoped temporary directory first.
//! Only after the last batch finishes are they copied into the destination
//! with their final names. The staging directory is removed when this
//! function returns, whether assembly succeeded or not.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::assemble::assemble;
use crate::config::{Config, DEFAULT_USER_AGENT};
use crate::fetch::{batch_sizes, fetch_all};
use crate::filter::AllowedExtensions;
use crate::models::{CandidateChain, DownloadSummary};
use crate::progress::ProgressReporter;

/// Everything the download phase needs besides the chains themselves.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub allowed: AllowedExtensions,
    pub dest: PathBuf,
    /// Budget for a single attempt, body included.
    pub timeout: Duration,
    /// Batch size: the number of chains in flight at once.
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DownloadOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allowed: config.download.allowed(),
            dest: config.download.output_dir.clone(),
            timeout: Duration::from_secs(config.download.timeout_secs),
            concurrency: config.download.concurrency,
            user_agent: if config.search.user_agent.is_empty() {
                DEFAULT_USER_AGENT.to_string()
            } else {
                config.search.user_agent.clone()
            },
        }
    }
}

/// Download `chains` into `options.dest`, keeping at most `limit` files.
///
/// Every chain is fetched, so chains past `limit` can stand in for exhausted
/// ones. `limit` is capped at `chains.len()`. Returns the number of files
/// written and the number of the `limit` slots left empty. Only local
/// filesystem failures are errors.
pub async fn download_images(
    chains: &[CandidateChain],
    limit: usize,
    options: &DownloadOptions,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<DownloadSummary> {
    let limit = limit.min(chains.len());
    info!(
        total = chains.len(),
        limit,
        batches = batch_sizes(chains.len(), options.concurrency).len(),
        dest = %options.dest.display(),
        "starting image download"
    );

    let staging = tempfile::Builder::new()
        .prefix("harvest-staging-")
        .tempdir()
        .context("Failed to create staging directory")?;

    let report = fetch_all(chains, staging.path(), options, reporter).await;
    info!(
        accepted = report.accepted(),
        exhausted = report.exhausted(),
        "all batches complete"
    );

    let summary = assemble(staging.path(), &options.dest, limit)?;

    info!(success = summary.success, "images downloaded");
    if summary.failed > 0 {
        error!(failed = summary.failed, "images failed to download");
    }

    Ok(summary)
}
