//! Builds the candidate chain for one search record.

use crate::decode::decode;
use crate::models::{Candidate, CandidateChain, RawRecord};

/// Resolve a record into its fallback chain, best fidelity first.
///
/// 1. Original quality (only when `want_original`): the decoded `objURL` with
///    its decoded `fromURL` as referer, or else the second entry of a
///    two-element `replaceUrl` list taken verbatim.
/// 2. The mid-resolution URL, if non-empty.
/// 3. The thumbnail URL, always last.
///
/// Callers filter out records without a thumbnail (see
/// [`RawRecord::has_thumbnail`]); for such a record the thumbnail step is
/// skipped and the chain may come back empty.
pub fn resolve(record: &RawRecord, want_original: bool) -> CandidateChain {
    let mut chain = CandidateChain::default();

    if want_original {
        if let Some(original) = original_candidate(record) {
            chain.push(original);
        }
    }

    if let Some(middle) = record.middle_url.as_deref().filter(|u| !u.is_empty()) {
        chain.push(Candidate::new(middle, ""));
    }

    if let Some(thumb) = record.thumb_url.as_deref().filter(|u| !u.is_empty()) {
        chain.push(Candidate::new(thumb, ""));
    }

    chain
}

fn original_candidate(record: &RawRecord) -> Option<Candidate> {
    if let Some(obj_url) = record.obj_url.as_deref() {
        let referer = record.from_url.as_deref().map(decode).unwrap_or_default();
        return Some(Candidate::new(decode(obj_url), referer));
    }

    match record.replace_url.as_deref() {
        Some([_, second]) => {
            let url = second.obj_url.clone()?;
            Some(Candidate::new(url, second.from_url.clone().unwrap_or_default()))
        }
        _ => None,
    }
}
