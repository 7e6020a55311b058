use super::*;
use crate::converter::testutil::test_converter;

fn history_segment(key: &str, value: &str, id: u16) -> Segment {
    let mut c = Candidate::new(key, value);
    c.lid = id;
    c.rid = id;
    Segment::with_candidates(key, SegmentType::History, vec![c])
}

fn top_values(segment: &Segment) -> Vec<&str> {
    segment.candidates().iter().map(|c| c.value.as_str()).collect()
}

#[test]
fn test_symbol_without_context() {
    let converter = test_converter();
    let segments = converter.convert(">").unwrap();
    let segment = segments.conversion_segment(0).unwrap();
    assert_eq!(top_values(segment), vec![">", "→"]);
}

#[test]
fn test_symbol_after_history_segment() {
    let converter = test_converter();
    let mut segments = Segments::default();
    segments.push_history_segment(history_segment("ー", "ー", 52));
    segments.push_segment(Segment::new(">", SegmentType::Free));

    converter.convert_segments(&mut segments).unwrap();
    assert_eq!(segments.history_segments_size(), 1);
    assert_eq!(segments.history_segments()[0].key(), "ー");
    let segment = segments.conversion_segment(0).unwrap();
    assert_eq!(top_values(segment), vec!["→", ">"]);
    // ー→">" costs 3000 on top of the word cost
    assert_eq!(segment.candidates()[1].cost, 4000);
}

#[test]
fn test_symbol_context_within_one_key() {
    let converter = test_converter();
    let segments = converter.convert("ー>").unwrap();
    let keys: Vec<&str> = segments.conversion_segments().iter().map(|s| s.key()).collect();
    assert_eq!(keys, vec!["ー", ">"]);
    let second = segments.conversion_segment(1).unwrap();
    assert_eq!(second.top().unwrap().value, "→");
}

#[test]
fn test_submitted_history_is_context() {
    let converter = test_converter();
    let mut segments = converter.convert("ー").unwrap();
    segments.submit_history();
    assert_eq!(segments.conversion_segments_size(), 0);
    segments.push_segment(Segment::new(">", SegmentType::Free));
    converter.convert_segments(&mut segments).unwrap();
    assert_eq!(segments.conversion_segment(0).unwrap().top().unwrap().value, "→");
}

#[test]
fn test_only_last_history_segment_counts() {
    let converter = test_converter();
    let mut segments = Segments::default();
    segments.push_history_segment(history_segment("ー", "ー", 52));
    segments.push_history_segment(history_segment("て", "手", 10));
    segments.push_segment(Segment::new(">", SegmentType::Free));
    converter.convert_segments(&mut segments).unwrap();
    assert_eq!(segments.conversion_segment(0).unwrap().top().unwrap().value, ">");
}

#[test]
fn test_convert_keeps_history() {
    let converter = test_converter();
    let mut segments = Segments::new(2);
    segments.push_history_segment(history_segment("ー", "ー", 52));
    segments.push_segment(Segment::new("てん", SegmentType::Free));
    converter.convert_segments(&mut segments).unwrap();
    segments.submit_history();
    segments.push_segment(Segment::new("き", SegmentType::Free));
    converter.convert_segments(&mut segments).unwrap();

    let history: Vec<&str> = segments.history_segments().iter().map(|s| s.key()).collect();
    assert_eq!(history, vec!["ー", "てん"]);
    assert_eq!(segments.key(), "き");
}
