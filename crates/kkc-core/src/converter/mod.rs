//! Kana-to-kanji conversion via lattice construction and Viterbi search.
//!
//! `ImmutableConverter` builds a lattice for the key, runs one forward
//! Viterbi pass, cuts the best path into segments where the segmenter
//! requires a boundary, and fills each segment with N-best candidates.

mod candidate_filter;
mod lattice;
mod nbest;
mod resize;
#[cfg(test)]
pub(crate) mod testutil;
mod viterbi;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::{debug, debug_span};

use crate::dict::{Connector, Dictionary, Segmenter};
use crate::key_corrector::KeyCorrector;
use crate::segments::{Candidate, CandidateAttributes, Segment, SegmentType, Segments, SegmentsError};
use crate::settings::Settings;
use crate::unicode::{hiragana_to_katakana, is_kana_reading};

pub use candidate_filter::{CandidateFilter, FilterResult};
pub use lattice::{FixedValue, Lattice, LatticeBuilder, LatticeConstraints, Node, NodeId, NodeKind};
pub use nbest::{collect_nbest, BoundaryCheck, NBestGenerator, NBestOptions};
pub use viterbi::{viterbi, BestPathEntry};

use nbest::make_candidate;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("key too long: {len} characters (max {max})")]
    KeyTooLong { len: usize, max: usize },
    #[error("invalid segments: {0}")]
    InvalidSegments(String),
    #[error("no path through the lattice")]
    NoPath,
    #[error(transparent)]
    Segments(#[from] SegmentsError),
}

/// One output segment of a conversion: byte span of the converted key and
/// the segment type it should carry.
#[derive(Debug, Clone)]
struct Span {
    begin: usize,
    end: usize,
    segment_type: SegmentType,
    /// The input segment, kept as is for fixed values.
    fixed: Option<Segment>,
}

/// Conversion engine over shared, read-only tables.
///
/// Holds no per-call state; each call owns its lattice, so one converter
/// can serve many threads.
pub struct ImmutableConverter {
    dictionary: Arc<dyn Dictionary>,
    connector: Arc<Connector>,
    segmenter: Arc<Segmenter>,
    corrector: KeyCorrector,
    settings: Settings,
}

impl ImmutableConverter {
    pub fn new(
        dictionary: Arc<dyn Dictionary>,
        connector: Arc<Connector>,
        segmenter: Arc<Segmenter>,
    ) -> Self {
        Self::with_settings(dictionary, connector, segmenter, Settings::default())
    }

    pub fn with_settings(
        dictionary: Arc<dyn Dictionary>,
        connector: Arc<Connector>,
        segmenter: Arc<Segmenter>,
        settings: Settings,
    ) -> Self {
        let corrector = KeyCorrector::new(settings.correction.enabled, settings.correction.max_key_len);
        Self {
            dictionary,
            connector,
            segmenter,
            corrector,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Convert `key` into fresh segments. An empty key yields no segments.
    pub fn convert(&self, key: &str) -> Result<Segments, ConvertError> {
        let mut segments = Segments::new(self.settings.segments.max_history_segments_size);
        if !key.is_empty() {
            segments.push_segment(Segment::new(key, SegmentType::Free));
        }
        self.convert_segments(&mut segments)?;
        Ok(segments)
    }

    /// Reconvert the conversion segments of `segments` in place.
    ///
    /// `FixedBoundary` segments keep their span, `FixedValue` segments keep
    /// their span and candidates, and `Free` segments are re-partitioned.
    /// History segments supply the left context. On error `segments` is
    /// left untouched.
    pub fn convert_segments(&self, segments: &mut Segments) -> Result<(), ConvertError> {
        let key = segments.key();
        let _span = debug_span!("convert_segments", len = key.len()).entered();
        if key.is_empty() {
            segments.clear_conversion_segments();
            return Ok(());
        }
        self.check_key_len(&key)?;

        let mut constraints = LatticeConstraints::new();
        let mut fixed_spans = Vec::new();
        let mut offset = 0;
        for segment in segments.conversion_segments() {
            if segment.key().is_empty() {
                return Err(ConvertError::InvalidSegments("empty segment key".to_string()));
            }
            let (begin, end) = (offset, offset + segment.key().len());
            offset = end;
            match segment.segment_type() {
                SegmentType::FixedBoundary => {
                    constraints.add_cut(begin);
                    constraints.add_cut(end);
                }
                SegmentType::FixedValue => {
                    let top = segment.top().ok_or_else(|| {
                        ConvertError::InvalidSegments(format!(
                            "fixed segment '{}' has no candidate",
                            segment.key()
                        ))
                    })?;
                    constraints.add_fixed_value(FixedValue {
                        begin,
                        end,
                        value: top.value.clone(),
                        lid: top.lid,
                        rid: top.rid,
                        wcost: top.wcost,
                    });
                }
                _ => continue,
            }
            fixed_spans.push(Span {
                begin,
                end,
                segment_type: segment.segment_type(),
                fixed: (segment.segment_type() == SegmentType::FixedValue).then(|| segment.clone()),
            });
        }

        let left_rid = left_context_rid(segments.history_segments());
        let (lattice, path) = self.run(&key, &constraints, left_rid, 0)?;
        let spans = self.partition(&lattice, &path, &constraints, fixed_spans);

        let mut out = Vec::with_capacity(spans.len());
        for span in spans {
            if let Some(fixed) = span.fixed {
                out.push(fixed);
                continue;
            }
            let candidates = self.segment_candidates(&lattice, &path, &constraints, &span);
            out.push(Segment::with_candidates(
                &key[span.begin..span.end],
                span.segment_type,
                candidates,
            ));
        }
        debug!(segment_count = out.len(), "converted");
        segments.replace_conversion_segments(out);
        Ok(())
    }

    /// Change the length of conversion segment `index` to `new_len`
    /// characters, taking characters from or giving them to the next
    /// segment. Only `index` and `index + 1` are touched.
    pub fn resize_segment(
        &self,
        segments: &mut Segments,
        index: usize,
        new_len: usize,
    ) -> Result<(), ConvertError> {
        resize::resize_segment(self, segments, index, new_len)
    }

    /// Build the lattice for `key` and run the Viterbi pass. Returns the
    /// lattice and its best path.
    pub fn build_lattice(&self, key: &str) -> Result<(Lattice, Vec<NodeId>), ConvertError> {
        self.check_key_len(key)?;
        self.run(key, &LatticeConstraints::new(), 0, 0)
    }

    /// Raw N-best paths over the whole key, unfiltered.
    pub fn nbest_paths(&self, key: &str, limit: usize) -> Result<Vec<Candidate>, ConvertError> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let (lattice, _) = self.build_lattice(key)?;
        let generator = NBestGenerator::new(
            &lattice,
            &self.connector,
            &self.segmenter,
            lattice.bos(),
            lattice.eos(),
            NBestOptions {
                boundary_check: BoundaryCheck::OnlyEdge,
                check_left_edge: false,
                check_right_edge: false,
                max_trial: self.settings.nbest.max_trial,
            },
        );
        Ok(collect_nbest(generator, limit))
    }

    fn check_key_len(&self, key: &str) -> Result<(), ConvertError> {
        let len = key.chars().count();
        let max = self.settings.segments.max_key_len;
        if len > max {
            return Err(ConvertError::KeyTooLong { len, max });
        }
        Ok(())
    }

    /// Build and search a lattice. When never-co-occur pruning leaves EOS
    /// unreachable the search is repeated without pruning.
    fn run(
        &self,
        key: &str,
        constraints: &LatticeConstraints,
        left_rid: u16,
        right_lid: u16,
    ) -> Result<(Lattice, Vec<NodeId>), ConvertError> {
        let builder = LatticeBuilder {
            dictionary: self.dictionary.as_ref(),
            corrector: &self.corrector,
            cost: &self.settings.cost,
        };
        let mut lattice = builder.build(key, constraints, left_rid, right_lid);
        if let Some(path) = viterbi(&mut lattice, &self.connector, &self.segmenter) {
            return Ok((lattice, path));
        }
        lattice.prune_never_co_occur = false;
        let path = viterbi(&mut lattice, &self.connector, &self.segmenter).ok_or(ConvertError::NoPath)?;
        Ok((lattice, path))
    }

    /// Cut the best path into segment spans.
    ///
    /// Cuts fall at every constraint cut and between consecutive path nodes
    /// that the segmenter separates, except inside a fixed span.
    fn partition(
        &self,
        lattice: &Lattice,
        path: &[NodeId],
        constraints: &LatticeConstraints,
        fixed_spans: Vec<Span>,
    ) -> Vec<Span> {
        let len = lattice.len();
        let inside_fixed =
            |p: usize| fixed_spans.iter().any(|s| s.begin < p && p < s.end);

        let mut cuts: Vec<usize> = constraints.cuts().to_vec();
        for pair in path.windows(2) {
            let (l, r) = (lattice.node(pair[0]), lattice.node(pair[1]));
            if self.segmenter.is_boundary(l.rid, r.lid) && !inside_fixed(l.end) {
                cuts.push(l.end);
            }
        }
        cuts.push(0);
        cuts.push(len);
        cuts.sort_unstable();
        cuts.dedup();

        cuts.windows(2)
            .map(|w| {
                let (begin, end) = (w[0], w[1]);
                match fixed_spans.iter().find(|s| s.begin == begin && s.end == end) {
                    Some(s) => s.clone(),
                    None => Span {
                        begin,
                        end,
                        segment_type: SegmentType::Free,
                        fixed: None,
                    },
                }
            })
            .collect()
    }

    /// N-best candidates for one span of a searched lattice.
    fn segment_candidates(
        &self,
        lattice: &Lattice,
        path: &[NodeId],
        constraints: &LatticeConstraints,
        span: &Span,
    ) -> Vec<Candidate> {
        let begin_node = path
            .iter()
            .copied()
            .find(|&id| lattice.node(id).end == span.begin)
            .unwrap_or(lattice.bos());
        let end_node = path
            .iter()
            .copied()
            .find(|&id| lattice.node(id).begin == span.end)
            .unwrap_or(lattice.eos());
        let boundary_check = match span.segment_type {
            SegmentType::FixedBoundary => BoundaryCheck::OnlyEdge,
            _ => self.settings.nbest.boundary_check,
        };
        let options = NBestOptions {
            boundary_check,
            check_left_edge: !constraints.is_cut(span.begin),
            check_right_edge: !constraints.is_cut(span.end),
            max_trial: self.settings.nbest.max_trial,
        };
        let key = &lattice.key()[span.begin..span.end];
        let _span = debug_span!("segment_candidates", key).entered();

        let generator = NBestGenerator::new(
            lattice,
            &self.connector,
            &self.segmenter,
            begin_node,
            end_node,
            options,
        );
        let mut filter = CandidateFilter::new(&self.settings.nbest);
        let mut candidates = Vec::new();
        for candidate in generator {
            match filter.filter(&candidate) {
                FilterResult::Keep => candidates.push(candidate),
                FilterResult::Drop => {}
                FilterResult::Stop => break,
            }
        }

        if candidates.is_empty() {
            // The best path itself always spans the segment.
            let inner: Vec<NodeId> = path
                .iter()
                .copied()
                .filter(|&id| {
                    let n = lattice.node(id);
                    span.begin <= n.begin && n.end <= span.end
                })
                .collect();
            let cost = lattice.best_cost(end_node).unwrap_or_default();
            let wcost = inner.iter().map(|&id| lattice.node(id).wcost).sum();
            let structure_cost = inner
                .windows(2)
                .map(|w| {
                    i64::from(
                        self.connector
                            .cost(lattice.node(w[0]).rid, lattice.node(w[1]).lid),
                    )
                })
                .sum();
            debug!("no N-best candidate passed, using best path");
            candidates.push(make_candidate(
                lattice,
                &self.connector,
                &inner,
                cost - lattice.node(end_node).wcost,
                structure_cost,
                wcost,
            ));
        }

        if self.settings.segments.insert_dummy_candidates {
            insert_dummy_candidates(key, &mut candidates, self.settings.nbest.max_candidates);
        }
        debug!(candidate_count = candidates.len());
        candidates
    }
}

/// Right id of the last history segment's top candidate, or 0.
fn left_context_rid(history: &[Segment]) -> u16 {
    history
        .last()
        .and_then(|s| s.top())
        .map_or(0, |c| c.rid)
}

/// Append the reading and its katakana form when the top candidate is a
/// dictionary word and the key is kana. Dummies count against `limit`.
fn insert_dummy_candidates(key: &str, candidates: &mut Vec<Candidate>, limit: usize) {
    let Some(top) = candidates.first() else {
        return;
    };
    if top.attributes.contains(CandidateAttributes::UNKNOWN) || !is_kana_reading(key) {
        return;
    }
    let (lid, rid) = (top.lid, top.rid);
    for value in [key.to_string(), hiragana_to_katakana(key)] {
        if candidates.len() >= limit {
            break;
        }
        if candidates.iter().any(|c| c.value == value) {
            continue;
        }
        let cost = candidates.last().map_or(0, |c| c.cost) + 1;
        let mut dummy = Candidate::new(key, value);
        dummy.lid = lid;
        dummy.rid = rid;
        dummy.cost = cost;
        dummy.wcost = cost;
        dummy.attributes = CandidateAttributes::DUMMY;
        candidates.push(dummy);
    }
}
