//! Structural properties over random kana keys.

use std::collections::HashSet;

use proptest::prelude::*;

use super::*;
use crate::converter::testutil::test_converter;

const KANA: &[&str] = &[
    "き", "ょ", "う", "は", "い", "て", "ん", "わ", "た", "し", "が", "く", "せ", "で", "す", "み",
    "あ", "っ", "ぬ", "ー", ">",
];

fn arb_key() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(KANA.to_vec()), 0..12).prop_map(|v| v.concat())
}

fn check_segments(key: &str, segments: &Segments) {
    // 1. keys concatenate to the input with no empty segment
    assert_eq!(segments.key(), key);
    for segment in segments.conversion_segments() {
        assert!(!segment.key().is_empty(), "empty segment for {key:?}");
        // 2. at least one candidate
        assert!(segment.candidates_size() >= 1, "no candidate for {key:?}");
        // 4. no duplicate values
        let mut seen = HashSet::new();
        for c in segment.candidates() {
            assert!(seen.insert(c.value.as_str()), "duplicate {:?} in {key:?}", c.value);
            assert_eq!(c.key, segment.key());
            assert!(c.is_inner_boundary_valid());
        }
        // candidates are ranked by cost
        for w in segment.candidates().windows(2) {
            assert!(w[0].cost <= w[1].cost, "unordered candidates for {key:?}");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn segments_cover_key(key in arb_key()) {
        let converter = test_converter();
        let segments = converter.convert(&key).unwrap();
        check_segments(&key, &segments);
    }

    #[test]
    fn conversion_is_deterministic(key in arb_key()) {
        let converter = test_converter();
        let a = converter.convert(&key).unwrap();
        let b = converter.convert(&key).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn nbest_is_monotone_and_repeatable(key in arb_key()) {
        let converter = test_converter();
        let a = converter.nbest_paths(&key, 30).unwrap();
        let b = converter.nbest_paths(&key, 30).unwrap();
        prop_assert_eq!(&a, &b);
        for w in a.windows(2) {
            prop_assert!(w[0].cost <= w[1].cost);
        }
        if !key.is_empty() {
            let (lattice, _) = converter.build_lattice(&key).unwrap();
            prop_assert_eq!(Some(a[0].cost), lattice.best_cost(lattice.eos()));
        }
    }

    #[test]
    fn resize_touches_only_two_segments(
        key in arb_key(),
        pick in any::<prop::sample::Index>(),
        new_len in 1usize..6,
    ) {
        let converter = test_converter();
        let mut segments = converter.convert(&key).unwrap();
        let before = segments.clone();
        let count = before.conversion_segments_size();
        let index = if count == 0 { 0 } else { pick.index(count) };
        match converter.resize_segment(&mut segments, index, new_len) {
            Ok(()) => {
                check_segments(&key, &segments);
                let old = before.conversion_segments();
                let new = segments.conversion_segments();
                let replaced = if index + 1 < old.len() { 2 } else { 1 };
                prop_assert_eq!(new.len(), old.len() - replaced + 2);
                // segments before the resized pair keep keys, types and candidates
                prop_assert_eq!(&old[..index], &new[..index]);
                // segments after the resized pair are unchanged
                prop_assert_eq!(&old[index + replaced..], &new[index + 2..]);
                prop_assert_eq!(new[index].key_len(), new_len);
                prop_assert_eq!(new[index].segment_type(), SegmentType::FixedBoundary);
                prop_assert_eq!(new[index + 1].segment_type(), SegmentType::Free);
            }
            Err(_) => prop_assert_eq!(segments, before),
        }
    }
}
