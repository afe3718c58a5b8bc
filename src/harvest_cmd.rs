//! Bodies of the `harvest fetch` and `harvest urls` commands.

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::warn;

use crate::config::Config;
use crate::download::{download_images, DownloadOptions};
use crate::filter::AllowedExtensions;
use crate::progress::ProgressMode;
use crate::query::acquire;

/// Per-invocation overrides of the configuration file.
#[derive(Debug, Clone, Default)]
pub struct FetchOverrides {
    pub output_dir: Option<PathBuf>,
    pub allow: Option<String>,
    pub timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub thumbnails_only: bool,
}

impl FetchOverrides {
    /// Fold the overrides into a copy of `config` and re-validate it.
    pub fn apply(&self, config: &Config) -> Result<Config> {
        let mut config = config.clone();
        if let Some(dir) = &self.output_dir {
            config.download.output_dir = dir.clone();
        }
        if let Some(allow) = &self.allow {
            config.download.allowed_extensions =
                AllowedExtensions::parse(allow).iter().map(String::from).collect();
        }
        if let Some(secs) = self.timeout_secs {
            config.search.timeout_secs = secs;
            config.download.timeout_secs = secs;
        }
        if let Some(n) = self.concurrency {
            config.download.concurrency = n;
        }
        if self.thumbnails_only {
            config.download.original = false;
        }
        crate::config::validate(&config)?;
        Ok(config)
    }
}

/// Number of chains to acquire when `count` images are wanted. The surplus
/// replaces chains whose every candidate fails.
pub fn acquisition_target(count: usize) -> usize {
    count + count / 2
}

pub async fn run_fetch(
    config: &Config,
    keyword: &str,
    count: usize,
    overrides: &FetchOverrides,
    progress: ProgressMode,
) -> Result<()> {
    let config = overrides.apply(config)?;
    let reporter = progress.reporter();

    let acquisition = acquire(
        &config.search,
        keyword,
        acquisition_target(count),
        config.download.original,
        reporter.as_ref(),
    )
    .await;

    if !acquisition.reachable {
        if acquisition.chains.is_empty() {
            bail!("search endpoint unreachable: {}", config.search.base_url);
        }
        warn!(
            resolved = acquisition.chains.len(),
            "continuing with partial results"
        );
    }

    let options = DownloadOptions::from_config(&config);
    let summary = download_images(&acquisition.chains, count, &options, reporter).await?;

    println!("fetch {}", keyword);
    println!("  requested: {}", count);
    println!("  resolved: {}", acquisition.chains.len());
    println!("  downloaded: {}", summary.success);
    println!("  failed: {}", summary.failed);
    println!("  output: {}", options.dest.display());
    println!("ok");

    Ok(())
}

pub async fn run_urls(
    config: &Config,
    keyword: &str,
    count: usize,
    thumbnails_only: bool,
) -> Result<()> {
    let want_original = config.download.original && !thumbnails_only;
    let mut acquisition = acquire(
        &config.search,
        keyword,
        count,
        want_original,
        &crate::progress::NoProgress,
    )
    .await;
    acquisition.chains.truncate(count);

    println!("{}", serde_json::to_string_pretty(&acquisition)?);

    if !acquisition.reachable && acquisition.chains.is_empty() {
        bail!("search endpoint unreachable: {}", config.search.base_url);
    }
    Ok(())
}
