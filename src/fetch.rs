//! Concurrent fetcher: resolves each candidate chain to at most one staged file.
//!
//! # State machine
//!
//! Each chain walks its candidates strictly in order. An attempt is accepted
//! when the response is `200 OK` and its `Content-Type` passes the whitelist;
//! anything else (other status, redirect, transport error, timeout, rejected
//! type) moves on to the next candidate. A chain with no candidates left is
//! exhausted.
//!
//! # Scheduling
//!
//! Chains are split into fixed-size batches. Every chain in a batch runs
//! concurrently on a [`JoinSet`], and the next batch starts only after the
//! whole batch has finished, which bounds the number of open connections.
//!
//! Every attempt gets its own client (no connection reuse) and its own
//! timeout budget. Accepted bodies are streamed to
//! `<staging>/<index + 1>.<ext>`; each chain owns its file name.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::download::DownloadOptions;
use crate::filter::classify;
use crate::models::{Candidate, CandidateChain, FetchOutcome};
use crate::progress::{ProgressEvent, ProgressReporter};

/// What happened to every chain, plus the batch layout used.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// One terminal outcome per input chain, in input order.
    pub outcomes: Vec<FetchOutcome>,
    /// Size of each dispatched batch, in dispatch order.
    pub batches: Vec<usize>,
}

impl FetchReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn exhausted(&self) -> usize {
        self.outcomes.len() - self.accepted()
    }
}

/// Sizes of the batches `total` chains are split into.
pub fn batch_sizes(total: usize, batch_size: usize) -> Vec<usize> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| batch_size.min(total - start))
        .collect()
}

/// Name of the staging file for the chain at position `index`.
pub fn staged_file_name(index: usize, extension: &str) -> String {
    format!("{}.{}", index + 1, extension)
}

/// Fetch every chain into `staging`, batch by batch.
pub async fn fetch_all(
    chains: &[CandidateChain],
    staging: &Path,
    options: &DownloadOptions,
    reporter: Arc<dyn ProgressReporter>,
) -> FetchReport {
    let options = Arc::new(options.clone());
    let accepted = Arc::new(AtomicU64::new(0));
    let total = chains.len() as u64;
    let batch_size = options.concurrency.max(1);

    let mut outcomes: Vec<Option<FetchOutcome>> = vec![None; chains.len()];
    let mut batches = Vec::new();

    for (batch_no, batch) in chains.chunks(batch_size).enumerate() {
        let first = batch_no * batch_size;
        debug!(batch = batch_no, size = batch.len(), "dispatching batch");

        let mut tasks = JoinSet::new();
        for (offset, chain) in batch.iter().enumerate() {
            let index = first + offset;
            let chain = chain.clone();
            let staging = staging.to_path_buf();
            let options = Arc::clone(&options);
            let accepted = Arc::clone(&accepted);
            let reporter = Arc::clone(&reporter);

            tasks.spawn(async move {
                let result = fetch_chain(index, &chain, &staging, &options).await;
                if matches!(result, Ok(FetchOutcome::Accepted { .. })) {
                    let n = accepted.fetch_add(1, Ordering::Relaxed) + 1;
                    reporter.report(ProgressEvent::Downloading { n, total });
                }
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(outcome))) => outcomes[index] = Some(outcome),
                Ok((index, Err(e))) => {
                    error!(index, error = %e, "download task failed");
                    outcomes[index] = Some(FetchOutcome::Exhausted { index });
                }
                Err(join_err) => {
                    // The slot stays empty and is marked exhausted below.
                    error!(error = %join_err, "download task panicked");
                }
            }
        }

        batches.push(batch.len());
    }

    let outcomes = outcomes
        .into_iter()
        .enumerate()
        .map(|(index, o)| o.unwrap_or(FetchOutcome::Exhausted { index }))
        .collect();

    FetchReport { outcomes, batches }
}

/// Walk one chain until a candidate is accepted or none remain.
///
/// Only local I/O failures are returned as `Err`.
async fn fetch_chain(
    index: usize,
    chain: &CandidateChain,
    staging: &Path,
    options: &DownloadOptions,
) -> Result<FetchOutcome> {
    for (attempt, candidate) in chain.candidates().iter().enumerate() {
        if let Some(extension) = try_candidate(index, candidate, staging, options).await? {
            return Ok(FetchOutcome::Accepted {
                index,
                extension: extension.to_string(),
            });
        }
        debug!(index, attempt, url = %candidate.url, "candidate rejected");
    }

    debug!(index, "chain exhausted");
    Ok(FetchOutcome::Exhausted { index })
}

/// One attempt. `Ok(Some(ext))` when the body was staged, `Ok(None)` when
/// the candidate was rejected.
async fn try_candidate(
    index: usize,
    candidate: &Candidate,
    staging: &Path,
    options: &DownloadOptions,
) -> Result<Option<&'static str>> {
    let client = match reqwest::Client::builder()
        .timeout(options.timeout)
        .redirect(Policy::none())
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            debug!(index, error = %e, "failed to build http client");
            return Ok(None);
        }
    };

    let mut response = match client
        .get(&candidate.url)
        .header(USER_AGENT, &options.user_agent)
        .header(REFERER, &candidate.referer)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            debug!(index, error = %e, "request failed");
            return Ok(None);
        }
    };

    if response.status() != StatusCode::OK {
        debug!(index, status = %response.status(), "non-success status");
        return Ok(None);
    }

    let classification = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| classify(ct, &options.allowed));

    let extension = match classification {
        Some(c) if c.accepted => match c.extension {
            Some(ext) => ext,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };

    let path = staging.join(staged_file_name(index, extension));
    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("Failed to create staging file: {}", path.display()))?;

    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                debug!(index, error = %e, "body read failed");
                drop(file);
                remove_partial(&path).await;
                return Ok(None);
            }
        };
        if let Err(e) = file.write_all(&chunk).await {
            drop(file);
            remove_partial(&path).await;
            return Err(e).with_context(|| format!("Failed to write {}", path.display()));
        }
    }

    if let Err(e) = file.flush().await {
        drop(file);
        remove_partial(&path).await;
        return Err(e).with_context(|| format!("Failed to flush {}", path.display()));
    }

    Ok(Some(extension))
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "failed to remove partial file");
    }
}
