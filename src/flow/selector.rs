//! Best-match selection among candidate flows
//!
//! Candidates have already passed every condition evaluator; the selector
//! only ranks them. The longest declared path is taken as the most specific
//! match, mirroring longest-prefix routing. Equal-length paths keep their
//! input order (stable sort, no secondary tie-break).

use std::sync::Arc;

use crate::flow::types::Flow;

/// Select the single most specific flow, or `None` for an empty candidate
/// list. The input is never reordered.
pub fn select(candidates: &[Arc<Flow>]) -> Option<Arc<Flow>> {
    let mut ranked: Vec<&Arc<Flow>> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.effective_path().len().cmp(&a.effective_path().len()));
    ranked.first().map(|flow| Arc::clone(flow))
}
