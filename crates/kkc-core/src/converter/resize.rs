use tracing::{debug, debug_span};

use crate::segments::{Segment, SegmentType, Segments, SegmentsError};

use super::{left_context_rid, ConvertError, ImmutableConverter, LatticeConstraints, Span};

/// Re-split conversion segments `index` and `index + 1` so that `index`
/// is `new_len` characters long.
///
/// When `index` is the last segment it can only shrink; the remainder
/// becomes a new segment. The resized segment becomes `FixedBoundary`, the
/// one after it `Free`. Segments outside the pair are not modified, and
/// nothing is modified on error.
pub(super) fn resize_segment(
    converter: &ImmutableConverter,
    segments: &mut Segments,
    index: usize,
    new_len: usize,
) -> Result<(), ConvertError> {
    let _span = debug_span!("resize_segment", index, new_len).entered();
    let conversion = segments.conversion_segments();
    let count = conversion.len();
    let current = conversion
        .get(index)
        .ok_or(SegmentsError::SegmentOutOfRange { index, len: count })?;
    if current.segment_type() == SegmentType::FixedValue {
        return Err(SegmentsError::NotResizable(index).into());
    }
    let next = conversion.get(index + 1);
    if next.is_some_and(|s| s.segment_type() == SegmentType::FixedValue) {
        return Err(SegmentsError::NotResizable(index + 1).into());
    }

    let total = current.key_len() + next.map_or(0, Segment::key_len);
    let max = total.saturating_sub(1);
    if new_len == 0 || new_len > max {
        return Err(SegmentsError::InvalidLength {
            requested: new_len,
            max,
        }
        .into());
    }

    let mut key = current.key().to_string();
    if let Some(n) = next {
        key.push_str(n.key());
    }
    let split = key
        .char_indices()
        .nth(new_len)
        .map_or(key.len(), |(i, _)| i);

    let left_rid = match index.checked_sub(1) {
        Some(prev) => conversion[prev].top().map_or(0, |c| c.rid),
        None => left_context_rid(segments.history_segments()),
    };
    let right_lid = conversion
        .get(index + 2)
        .and_then(Segment::top)
        .map_or(0, |c| c.lid);
    let replaced = if next.is_some() { 2 } else { 1 };

    converter.check_key_len(&key)?;
    let mut constraints = LatticeConstraints::new();
    constraints.add_cut(split);
    let (lattice, path) = converter.run(&key, &constraints, left_rid, right_lid)?;

    let spans = [
        Span {
            begin: 0,
            end: split,
            segment_type: SegmentType::FixedBoundary,
            fixed: None,
        },
        Span {
            begin: split,
            end: key.len(),
            segment_type: SegmentType::Free,
            fixed: None,
        },
    ];
    let resized: Vec<Segment> = spans
        .iter()
        .map(|span| {
            let candidates = converter.segment_candidates(&lattice, &path, &constraints, span);
            Segment::with_candidates(&key[span.begin..span.end], span.segment_type, candidates)
        })
        .collect();

    debug!(split, "segment resized");
    segments.splice_conversion_segments(index, replaced, resized);
    Ok(())
}
