//! Conversion output shared with the layers above the converter.
//!
//! `Segments` is passed by value or `&mut` into each converter call and is
//! never retained by the converter afterwards.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentsError {
    #[error("segment index {index} out of range (have {len})")]
    SegmentOutOfRange { index: usize, len: usize },
    #[error("candidate index {index} out of range (have {len})")]
    CandidateOutOfRange { index: usize, len: usize },
    #[error("invalid segment length {requested} (allowed 1..={max})")]
    InvalidLength { requested: usize, max: usize },
    #[error("segment {0} has a fixed value and cannot be resized")]
    NotResizable(usize),
}

bitflags::bitflags! {
    /// Flags describing how a candidate was produced.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
    pub struct CandidateAttributes: u32 {
        /// Made only of synthesized fallback nodes.
        const UNKNOWN = 1 << 0;
        /// Contains a node found through a corrected key.
        const KEY_CORRECTED = 1 << 1;
        /// Reading or transliteration appended after N-best enumeration.
        const DUMMY = 1 << 2;
        /// Contains a node from the full-suffix exact lookup.
        const EXACT_MATCH = 1 << 3;
    }
}

/// One inner word of a multi-word candidate, decoded from
/// `Candidate::inner_segment_boundary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerSegment<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub content_key: &'a str,
    pub content_value: &'a str,
}

/// A ranked conversion of one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub key: String,
    pub value: String,
    /// Key without trailing function words.
    pub content_key: String,
    /// Value without trailing function words.
    pub content_value: String,
    pub lid: u16,
    pub rid: u16,
    /// Total path cost, including the segment's left and right context.
    pub cost: i64,
    /// Sum of word costs.
    pub wcost: i64,
    /// Sum of transition costs between the candidate's own nodes.
    pub structure_cost: i64,
    pub attributes: CandidateAttributes,
    /// Packed `(key_len, value_len, content_key_len, content_value_len)`
    /// byte lengths, one entry per inner word. Empty for single-word
    /// candidates or when a length does not fit in a byte.
    pub inner_segment_boundary: Vec<u32>,
}

impl Candidate {
    /// A candidate whose content parts equal its key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        Self {
            content_key: key.clone(),
            content_value: value.clone(),
            key,
            value,
            lid: 0,
            rid: 0,
            cost: 0,
            wcost: 0,
            structure_cost: 0,
            attributes: CandidateAttributes::empty(),
            inner_segment_boundary: Vec::new(),
        }
    }

    /// Pack one inner-word entry. Returns `None` when a length exceeds 255.
    pub fn encode_inner_boundary(
        key_len: usize,
        value_len: usize,
        content_key_len: usize,
        content_value_len: usize,
    ) -> Option<u32> {
        let k = u8::try_from(key_len).ok()?;
        let v = u8::try_from(value_len).ok()?;
        let ck = u8::try_from(content_key_len).ok()?;
        let cv = u8::try_from(content_value_len).ok()?;
        Some(u32::from_le_bytes([k, v, ck, cv]))
    }

    /// Decode a packed entry into `(key_len, value_len, content_key_len,
    /// content_value_len)`.
    pub fn decode_inner_boundary(encoded: u32) -> (usize, usize, usize, usize) {
        let [k, v, ck, cv] = encoded.to_le_bytes();
        (k as usize, v as usize, ck as usize, cv as usize)
    }

    /// Inner words of this candidate. A candidate without an inner boundary
    /// list yields itself as the single inner word.
    pub fn inner_segments(&self) -> Vec<InnerSegment<'_>> {
        if self.inner_segment_boundary.is_empty() {
            return vec![InnerSegment {
                key: &self.key,
                value: &self.value,
                content_key: &self.content_key,
                content_value: &self.content_value,
            }];
        }
        let mut out = Vec::with_capacity(self.inner_segment_boundary.len());
        let (mut ko, mut vo) = (0, 0);
        for &encoded in &self.inner_segment_boundary {
            let (k, v, ck, cv) = Self::decode_inner_boundary(encoded);
            let (Some(key), Some(value), Some(content_key), Some(content_value)) = (
                self.key.get(ko..ko + k),
                self.value.get(vo..vo + v),
                self.key.get(ko..ko + ck),
                self.value.get(vo..vo + cv),
            ) else {
                break;
            };
            out.push(InnerSegment {
                key,
                value,
                content_key,
                content_value,
            });
            ko += k;
            vo += v;
        }
        out
    }

    /// Whether the inner boundary list is consistent with the key and value.
    pub fn is_inner_boundary_valid(&self) -> bool {
        if self.inner_segment_boundary.is_empty() {
            return true;
        }
        let (mut ko, mut vo) = (0, 0);
        for &encoded in &self.inner_segment_boundary {
            let (k, v, ck, cv) = Self::decode_inner_boundary(encoded);
            if ck > k || cv > v {
                return false;
            }
            ko += k;
            vo += v;
        }
        ko == self.key.len() && vo == self.value.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// Boundary and candidates chosen by the converter.
    Free,
    /// Boundary set by the user; candidates still chosen by the converter.
    FixedBoundary,
    /// Boundary and value set by the user.
    FixedValue,
    /// Already committed; used as left context.
    History,
    /// Committed from the current composition; used as left context.
    Submitted,
}

impl SegmentType {
    pub fn is_history(self) -> bool {
        matches!(self, Self::History | Self::Submitted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    key: String,
    segment_type: SegmentType,
    candidates: Vec<Candidate>,
}

impl Segment {
    pub fn new(key: impl Into<String>, segment_type: SegmentType) -> Self {
        Self {
            key: key.into(),
            segment_type,
            candidates: Vec::new(),
        }
    }

    pub fn with_candidates(
        key: impl Into<String>,
        segment_type: SegmentType,
        candidates: Vec<Candidate>,
    ) -> Self {
        Self {
            key: key.into(),
            segment_type,
            candidates,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key length in characters.
    pub fn key_len(&self) -> usize {
        self.key.chars().count()
    }

    pub fn segment_type(&self) -> SegmentType {
        self.segment_type
    }

    pub fn set_segment_type(&mut self, segment_type: SegmentType) {
        self.segment_type = segment_type;
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidates_size(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidate(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    /// The best candidate.
    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn push_candidate(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    pub fn clear_candidates(&mut self) {
        self.candidates.clear();
    }

    /// Move the candidate at `index` to the top, keeping the others in order.
    pub fn move_candidate_to_top(&mut self, index: usize) -> Result<(), SegmentsError> {
        if index >= self.candidates.len() {
            return Err(SegmentsError::CandidateOutOfRange {
                index,
                len: self.candidates.len(),
            });
        }
        let c = self.candidates.remove(index);
        self.candidates.insert(0, c);
        Ok(())
    }
}

/// History segments followed by conversion segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segments {
    segments: Vec<Segment>,
    max_history_segments_size: usize,
}

impl Default for Segments {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Segments {
    pub fn new(max_history_segments_size: usize) -> Self {
        Self {
            segments: Vec::new(),
            max_history_segments_size,
        }
    }

    pub fn max_history_segments_size(&self) -> usize {
        self.max_history_segments_size
    }

    pub fn set_max_history_segments_size(&mut self, size: usize) {
        self.max_history_segments_size = size;
        self.trim_history();
    }

    pub fn history_segments_size(&self) -> usize {
        self.segments
            .iter()
            .take_while(|s| s.segment_type.is_history())
            .count()
    }

    pub fn conversion_segments_size(&self) -> usize {
        self.segments.len() - self.history_segments_size()
    }

    pub fn history_segments(&self) -> &[Segment] {
        &self.segments[..self.history_segments_size()]
    }

    pub fn conversion_segments(&self) -> &[Segment] {
        &self.segments[self.history_segments_size()..]
    }

    pub fn conversion_segments_mut(&mut self) -> &mut [Segment] {
        let h = self.history_segments_size();
        &mut self.segments[h..]
    }

    pub fn conversion_segment(&self, index: usize) -> Option<&Segment> {
        self.conversion_segments().get(index)
    }

    pub fn conversion_segment_mut(&mut self, index: usize) -> Option<&mut Segment> {
        self.conversion_segments_mut().get_mut(index)
    }

    /// All segments, history first.
    pub fn all(&self) -> &[Segment] {
        &self.segments
    }

    /// Concatenated keys of the conversion segments.
    pub fn key(&self) -> String {
        self.conversion_segments()
            .iter()
            .map(|s| s.key.as_str())
            .collect()
    }

    /// Concatenated top values of the conversion segments.
    pub fn top_value(&self) -> String {
        self.conversion_segments()
            .iter()
            .filter_map(|s| s.top().map(|c| c.value.as_str()))
            .collect()
    }

    /// Append a conversion segment.
    pub fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Append a committed segment to the history, before any conversion
    /// segments.
    pub fn push_history_segment(&mut self, mut segment: Segment) {
        if !segment.segment_type.is_history() {
            segment.segment_type = SegmentType::History;
        }
        let h = self.history_segments_size();
        self.segments.insert(h, segment);
        self.trim_history();
    }

    pub fn clear_conversion_segments(&mut self) {
        let h = self.history_segments_size();
        self.segments.truncate(h);
    }

    pub fn clear_history_segments(&mut self) {
        let h = self.history_segments_size();
        self.segments.drain(..h);
    }

    pub(crate) fn replace_conversion_segments(&mut self, segments: Vec<Segment>) {
        self.clear_conversion_segments();
        self.segments.extend(segments);
    }

    /// Replace conversion segments `[index, index + count)` with `segments`.
    pub(crate) fn splice_conversion_segments(
        &mut self,
        index: usize,
        count: usize,
        segments: Vec<Segment>,
    ) {
        let h = self.history_segments_size();
        self.segments
            .splice(h + index..h + index + count, segments);
    }

    /// Fix the value of a conversion segment to one of its candidates.
    pub fn commit_segment_value(
        &mut self,
        index: usize,
        candidate_index: usize,
    ) -> Result<(), SegmentsError> {
        let len = self.conversion_segments_size();
        let segment = self
            .conversion_segment_mut(index)
            .ok_or(SegmentsError::SegmentOutOfRange { index, len })?;
        segment.move_candidate_to_top(candidate_index)?;
        segment.segment_type = SegmentType::FixedValue;
        Ok(())
    }

    /// Mark the first `count` conversion segments as submitted. Their top
    /// candidates become left context for the rest of the composition.
    pub fn submit_segments(&mut self, count: usize) -> Result<(), SegmentsError> {
        let len = self.conversion_segments_size();
        if count > len {
            return Err(SegmentsError::SegmentOutOfRange { index: count, len });
        }
        for segment in self.conversion_segments_mut().iter_mut().take(count) {
            segment.segment_type = SegmentType::Submitted;
            segment.candidates.truncate(1);
        }
        self.trim_history();
        Ok(())
    }

    /// Turn every conversion segment into history, keeping only its top
    /// candidate, then drop the oldest history beyond the limit.
    pub fn submit_history(&mut self) {
        for segment in self.segments.iter_mut() {
            segment.segment_type = SegmentType::History;
            segment.candidates.truncate(1);
        }
        self.trim_history();
    }

    fn trim_history(&mut self) {
        let h = self.history_segments_size();
        if h > self.max_history_segments_size {
            self.segments.drain(..h - self.max_history_segments_size);
        }
    }
}

impl fmt::Display for Segments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.conversion_segments().iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            match s.top() {
                Some(c) => f.write_str(&c.value)?,
                None => f.write_str(&s.key)?,
            }
        }
        Ok(())
    }
}
