//! Core data models used throughout Image Harvest.
//!
//! These types represent the search records, candidate chains, and run
//! results that flow through the acquisition and download pipeline.

use serde::{Deserialize, Serialize};

/// Per-image payload returned by the search endpoint.
///
/// Every field is optional; the provider omits keys freely. Records without a
/// non-empty `thumb_url` are dropped before resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    /// Obfuscated original-quality URL.
    #[serde(rename = "objURL")]
    pub obj_url: Option<String>,
    /// Obfuscated URL of the page the image was found on.
    #[serde(rename = "fromURL")]
    pub from_url: Option<String>,
    #[serde(rename = "replaceUrl")]
    pub replace_url: Option<Vec<ReplaceUrl>>,
    #[serde(rename = "middleURL")]
    pub middle_url: Option<String>,
    #[serde(rename = "thumbURL")]
    pub thumb_url: Option<String>,
}

impl RawRecord {
    /// Whether the record carries the low-resolution fallback.
    pub fn has_thumbnail(&self) -> bool {
        self.thumb_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Alternate-quality URL pair (already in clear text).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplaceUrl {
    #[serde(rename = "ObjURL")]
    pub obj_url: Option<String>,
    #[serde(rename = "FromURL")]
    pub from_url: Option<String>,
}

/// One download attempt: the object URL plus the `Referer` to send with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub url: String,
    pub referer: String,
}

impl Candidate {
    pub fn new(url: impl Into<String>, referer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referer: referer.into(),
        }
    }
}

/// Ordered fallback list for one logical image, best fidelity first.
///
/// Always ends with the thumbnail candidate (empty referer) when built by
/// [`crate::resolve::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateChain(pub Vec<Candidate>);

impl CandidateChain {
    pub fn candidates(&self) -> &[Candidate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.0.push(candidate);
    }
}

/// Terminal state of one chain after the fetcher is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A candidate was accepted and staged as `<index>.<extension>`.
    Accepted { index: usize, extension: String },
    /// Every candidate failed.
    Exhausted { index: usize },
}

impl FetchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FetchOutcome::Accepted { .. })
    }
}

/// Result of the acquisition phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Acquisition {
    /// False when the probe or any page request failed.
    pub reachable: bool,
    /// False when fewer chains than the clamped count were resolved.
    pub satisfied: bool,
    pub chains: Vec<CandidateChain>,
}

/// Result of the download phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    pub success: usize,
    pub failed: usize,
}
