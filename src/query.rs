//! Query paginator: turns a keyword and a target count into candidate chains.
//!
//! # Workflow
//!
//! 1. Probe the search endpoint once and read the provider's reported total
//!    (`"displayNum":<n>`); clamp the requested count to it.
//! 2. Split `[0, count)` into page-size windows and request every window
//!    concurrently.
//! 3. Sanitize each page body, parse the `data` array, drop records without a
//!    thumbnail, and resolve the rest into chains.
//! 4. Merge pages in offset order.
//!
//! Pages are requested in whole windows, so the result may hold more chains
//! than the clamped count. Callers that want fewer slice the result.
//!
//! Network failures never surface as errors. A failed probe returns an empty,
//! unreachable [`Acquisition`]; a failed page clears `reachable` but the
//! pages that did succeed are still merged.

use std::sync::OnceLock;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use reqwest::StatusCode;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::models::{Acquisition, CandidateChain, RawRecord};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::resolve::resolve;

/// Immutable description of one search request.
///
/// A fresh value is built per call and per page; nothing is shared between
/// concurrent page requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub page_size: usize,
    pub offset: usize,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>, page_size: usize) -> Self {
        Self {
            keyword: keyword.into(),
            page_size,
            offset: 0,
        }
    }

    /// Copy of this query positioned at `offset`.
    pub fn at_offset(&self, offset: usize) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    /// Query-string parameters expected by the provider.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("tn", "resultjson_com".to_string()),
            ("ipn", "rj".to_string()),
            ("ie", "utf-8".to_string()),
            ("oe", "utf-8".to_string()),
            ("face", "0".to_string()),
            ("pn", self.offset.to_string()),
            ("rn", self.page_size.to_string()),
            ("queryWord", self.keyword.clone()),
            ("word", self.keyword.clone()),
        ]
    }

    /// Offsets of every page window needed to cover `[0, count)`.
    pub fn page_offsets(&self, count: usize) -> Vec<usize> {
        (0..count).step_by(self.page_size.max(1)).collect()
    }
}

/// Run the acquisition phase for `keyword`.
///
/// `count` is clamped to the provider's reported total and decides how many
/// page windows are requested. `satisfied` reports whether the clamped count
/// was reached; the chains are not truncated to it.
pub async fn acquire(
    config: &SearchConfig,
    keyword: &str,
    count: usize,
    want_original: bool,
    reporter: &dyn ProgressReporter,
) -> Acquisition {
    let query = SearchQuery::new(keyword, config.page_size);

    info!(keyword, count, "acquiring image urls");

    let reported = match probe_total(config, &query).await {
        Ok(total) => total,
        Err(e) => {
            error!(keyword, error = %e, "search endpoint unreachable");
            return Acquisition::default();
        }
    };

    if reported < count {
        warn!(keyword, reported, "provider reports fewer images than requested");
    }
    let count = count.min(reported);
    debug!(keyword, reported, clamped = count, "probe complete");

    let client = match build_client(config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to build http client");
            return Acquisition::default();
        }
    };

    let mut loaded = 0u64;
    let mut reachable = true;
    let mut pages: Vec<(usize, Vec<CandidateChain>)> = Vec::new();
    let mut tasks = JoinSet::new();

    for offset in query.page_offsets(count) {
        let client = client.clone();
        let base_url = config.base_url.clone();
        let page = query.at_offset(offset);
        tasks.spawn(async move {
            let result = fetch_page(&client, &base_url, &page, want_original).await;
            (offset, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((offset, Ok(chains))) => {
                loaded += chains.len() as u64;
                reporter.report(ProgressEvent::Acquiring {
                    loaded: loaded.min(count as u64),
                    total: count as u64,
                });
                pages.push((offset, chains));
            }
            Ok((offset, Err(e))) => {
                warn!(offset, error = %e, "page request failed");
                reachable = false;
            }
            Err(join_err) => {
                error!(error = %join_err, "page task panicked");
                reachable = false;
            }
        }
    }

    if !reachable {
        error!(keyword, "search endpoint unreachable for some pages");
    }

    let chains = merge_pages(pages);
    let satisfied = chains.len() >= count;
    if satisfied {
        info!(keyword, resolved = chains.len(), "image urls acquired");
    } else {
        warn!(
            keyword,
            resolved = chains.len(),
            requested = count,
            "fewer image urls than requested"
        );
    }

    Acquisition {
        reachable,
        satisfied,
        chains,
    }
}

fn build_client(config: &SearchConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()?)
}

/// Issue the probe request and return the reported total.
async fn probe_total(config: &SearchConfig, query: &SearchQuery) -> Result<usize> {
    let client = build_client(config)?;
    let response = client
        .get(&config.base_url)
        .query(&query.params())
        .send()
        .await
        .context("probe request failed")?;

    let status = response.status();
    if status != StatusCode::OK {
        bail!("probe returned status {}", status);
    }

    let text = response.text().await.context("probe body unreadable")?;
    parse_reported_total(&text).ok_or_else(|| anyhow!("probe response has no displayNum"))
}

/// Extract the provider's reported total from a raw page body.
pub fn parse_reported_total(text: &str) -> Option<usize> {
    static DISPLAY_NUM: OnceLock<Regex> = OnceLock::new();
    let re = DISPLAY_NUM.get_or_init(|| {
        Regex::new(r#""displayNum":(\d+)"#).expect("displayNum pattern is valid")
    });
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

async fn fetch_page(
    client: &reqwest::Client,
    base_url: &str,
    query: &SearchQuery,
    want_original: bool,
) -> Result<Vec<CandidateChain>> {
    let response = client
        .get(base_url)
        .query(&query.params())
        .send()
        .await
        .with_context(|| format!("page request at offset {} failed", query.offset))?;

    let status = response.status();
    if status != StatusCode::OK {
        bail!("page at offset {} returned status {}", query.offset, status);
    }

    let text = response.text().await?;
    parse_page(&text, want_original)
}

/// Parse a raw page body into candidate chains.
pub fn parse_page(text: &str, want_original: bool) -> Result<Vec<CandidateChain>> {
    let clean = sanitize(text);
    let json: serde_json::Value =
        serde_json::from_str(&clean).context("page body is not valid JSON")?;

    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("page response missing data array"))?;

    let chains = data
        .iter()
        .filter_map(|item| match serde_json::from_value::<RawRecord>(item.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, "skipping malformed record");
                None
            }
        })
        .filter(RawRecord::has_thumbnail)
        .map(|record| resolve(&record, want_original))
        .collect();

    Ok(chains)
}

/// Strip the provider's stray `\'` escapes and turn raw control characters
/// into whitespace so the body parses as JSON.
pub fn sanitize(text: &str) -> String {
    text.replace(r"\'", "")
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn merge_pages(mut pages: Vec<(usize, Vec<CandidateChain>)>) -> Vec<CandidateChain> {
    pages.sort_by_key(|(offset, _)| *offset);
    pages.into_iter().flat_map(|(_, chains)| chains).collect()
}
