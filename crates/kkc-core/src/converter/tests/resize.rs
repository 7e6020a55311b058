use super::*;
use crate::converter::testutil::test_converter;

fn keys(segments: &Segments) -> Vec<&str> {
    segments.conversion_segments().iter().map(|s| s.key()).collect()
}

#[test]
fn test_shrink_moves_chars_to_next() {
    let converter = test_converter();
    let mut segments = converter.convert("きょうはいいてんき").unwrap();
    assert_eq!(keys(&segments), vec!["きょうは", "いい", "てんき"]);
    let third = segments.conversion_segment(2).unwrap().clone();

    converter.resize_segment(&mut segments, 0, 3).unwrap();
    assert_eq!(keys(&segments), vec!["きょう", "はいい", "てんき"]);
    let first = segments.conversion_segment(0).unwrap();
    assert_eq!(first.segment_type(), SegmentType::FixedBoundary);
    assert_eq!(first.top().unwrap().value, "今日");
    let second = segments.conversion_segment(1).unwrap();
    assert_eq!(second.segment_type(), SegmentType::Free);
    assert!(second.candidates_size() >= 1);
    assert_eq!(second.top().unwrap().value, "は良い");
    assert_eq!(segments.conversion_segment(2).unwrap(), &third);
}

#[test]
fn test_grow_takes_chars_from_next() {
    let converter = test_converter();
    let mut segments = converter.convert("きょうはいいてんき").unwrap();
    converter.resize_segment(&mut segments, 0, 3).unwrap();
    let third = segments.conversion_segment(2).unwrap().clone();

    converter.resize_segment(&mut segments, 0, 4).unwrap();
    assert_eq!(keys(&segments), vec!["きょうは", "いい", "てんき"]);
    assert_eq!(segments.conversion_segment(0).unwrap().top().unwrap().value, "今日は");
    assert_eq!(segments.conversion_segment(1).unwrap().top().unwrap().value, "良い");
    assert_eq!(segments.conversion_segment(2).unwrap(), &third);
}

#[test]
fn test_shrink_last_segment_splits() {
    let converter = test_converter();
    let mut segments = converter.convert("てんき").unwrap();
    assert_eq!(keys(&segments), vec!["てんき"]);

    converter.resize_segment(&mut segments, 0, 2).unwrap();
    assert_eq!(keys(&segments), vec!["てん", "き"]);
    assert_eq!(segments.conversion_segment(0).unwrap().top().unwrap().value, "天");
    assert_eq!(segments.conversion_segment(1).unwrap().top().unwrap().value, "木");
    assert_eq!(segments.key(), "てんき");
}

#[test]
fn test_invalid_resize_leaves_segments_unchanged() {
    let converter = test_converter();
    let mut segments = converter.convert("きょうはいいてんき").unwrap();
    let before = segments.clone();

    let err = converter.resize_segment(&mut segments, 5, 1).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Segments(SegmentsError::SegmentOutOfRange { index: 5, len: 3 })
    ));
    let err = converter.resize_segment(&mut segments, 0, 0).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Segments(SegmentsError::InvalidLength { requested: 0, .. })
    ));
    // would leave nothing for "いい"
    let err = converter.resize_segment(&mut segments, 0, 6).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Segments(SegmentsError::InvalidLength { requested: 6, max: 5 })
    ));
    // the last segment cannot grow
    let err = converter.resize_segment(&mut segments, 2, 3).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Segments(SegmentsError::InvalidLength { requested: 3, max: 2 })
    ));
    assert_eq!(segments, before);
}

#[test]
fn test_fixed_value_not_resizable() {
    let converter = test_converter();
    let mut segments = converter.convert("きょうはいいてんき").unwrap();
    segments.commit_segment_value(1, 0).unwrap();
    let before = segments.clone();

    let err = converter.resize_segment(&mut segments, 1, 1).unwrap_err();
    assert!(matches!(err, ConvertError::Segments(SegmentsError::NotResizable(1))));
    let err = converter.resize_segment(&mut segments, 0, 3).unwrap_err();
    assert!(matches!(err, ConvertError::Segments(SegmentsError::NotResizable(1))));
    assert_eq!(segments, before);
}

#[test]
fn test_resize_uses_history_context() {
    let converter = test_converter();
    let mut segments = Segments::default();
    let mut c = Candidate::new("ー", "ー");
    c.lid = 52;
    c.rid = 52;
    segments.push_history_segment(Segment::with_candidates("ー", SegmentType::History, vec![c]));
    segments.push_segment(Segment::new(">てん", SegmentType::Free));
    converter.convert_segments(&mut segments).unwrap();
    assert_eq!(keys(&segments), vec![">", "てん"]);

    converter.resize_segment(&mut segments, 1, 1).unwrap();
    assert_eq!(keys(&segments), vec![">", "て", "ん"]);
    converter.resize_segment(&mut segments, 0, 1).unwrap();
    assert_eq!(segments.conversion_segment(0).unwrap().top().unwrap().value, "→");
}
