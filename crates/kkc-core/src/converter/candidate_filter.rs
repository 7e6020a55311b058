use std::collections::HashSet;

use crate::segments::{Candidate, CandidateAttributes};
use crate::settings::NBestSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    Keep,
    Drop,
    /// Nothing after this candidate can be kept.
    Stop,
}

/// Per-segment gate between the N-best generator and the candidate list.
///
/// Candidates arrive in non-decreasing cost order and are never reordered.
pub struct CandidateFilter {
    max_candidates: usize,
    max_cost_diff: i64,
    max_structure_cost: i64,
    seen: HashSet<String>,
    top_cost: Option<i64>,
    kept: usize,
    has_known: bool,
}

impl CandidateFilter {
    pub fn new(settings: &NBestSettings) -> Self {
        Self {
            max_candidates: settings.max_candidates,
            max_cost_diff: settings.max_cost_diff,
            max_structure_cost: settings.max_structure_cost,
            seen: HashSet::new(),
            top_cost: None,
            kept: 0,
            has_known: false,
        }
    }

    /// Forget everything seen so far, for reuse on the next segment.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.top_cost = None;
        self.kept = 0;
        self.has_known = false;
    }

    pub fn kept(&self) -> usize {
        self.kept
    }

    pub fn filter(&mut self, candidate: &Candidate) -> FilterResult {
        if self.kept >= self.max_candidates {
            return FilterResult::Stop;
        }
        if self.seen.contains(&candidate.value) {
            return FilterResult::Drop;
        }
        let unknown = candidate.attributes.contains(CandidateAttributes::UNKNOWN);
        if unknown && self.has_known {
            return FilterResult::Drop;
        }
        if let Some(top) = self.top_cost {
            // Costs only grow from here.
            if candidate.cost - top > self.max_cost_diff {
                return FilterResult::Stop;
            }
            // Single-node candidates have no structure cost.
            if candidate.structure_cost > self.max_structure_cost {
                return FilterResult::Drop;
            }
        }

        self.seen.insert(candidate.value.clone());
        self.top_cost.get_or_insert(candidate.cost);
        self.kept += 1;
        if !unknown {
            self.has_known = true;
        }
        FilterResult::Keep
    }
}
