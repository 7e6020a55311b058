use crate::dict::segmenter::{Segmenter, SegmenterBuilder};
use crate::dict::DictError;

/// Ids 20..=29 are particles: no boundary before them.
fn sample_builder() -> SegmenterBuilder {
    let mut b = SegmenterBuilder::new(32);
    b.set_boundary_range((1, 31), (20, 29), false);
    b.set_never_co_occur(20, 21, true);
    b
}

#[test]
fn test_default_is_boundary() {
    let seg = SegmenterBuilder::new(8).build().unwrap();
    for r in 0..8 {
        for l in 0..8 {
            assert!(seg.is_boundary(r, l));
            assert!(!seg.never_co_occur(r, l));
        }
    }
    // Everything collapses into a single class on each side.
    assert_eq!(seg.class_counts(), (1, 1));
}

#[test]
fn test_rules() {
    let seg = sample_builder().build().unwrap();
    assert!(!seg.is_boundary(10, 20));
    assert!(!seg.is_boundary(20, 21));
    assert!(seg.is_boundary(20, 10));
    assert!(seg.is_boundary(10, 10));
    assert!(seg.never_co_occur(20, 21));
    assert!(!seg.never_co_occur(21, 20));
}

#[test]
fn test_sentence_boundary_id() {
    let seg = sample_builder().build().unwrap();
    // id 0 always separates, even where the rules say otherwise
    assert!(seg.is_boundary(0, 20));
    assert!(seg.is_boundary(10, 0));
    assert!(!seg.never_co_occur(0, 21));
}

#[test]
fn test_out_of_range_ids() {
    let seg = sample_builder().build().unwrap();
    assert!(seg.is_boundary(100, 20));
    assert!(!seg.never_co_occur(20, 100));
}

#[test]
fn test_class_compression() {
    let seg = sample_builder().build().unwrap();
    let (r, l) = seg.class_counts();
    // Right: id 0 (all boundary), id 20 (with never rule), the rest.
    assert_eq!(r, 3);
    // Left: content ids, particle ids, id 21 (never rule).
    assert_eq!(l, 3);
}

#[test]
fn test_serialize_roundtrip() {
    let seg = sample_builder().build().unwrap();
    let seg2 = Segmenter::from_bytes(&seg.to_bytes()).unwrap();
    for r in 0..32 {
        for l in 0..32 {
            assert_eq!(seg.is_boundary(r, l), seg2.is_boundary(r, l));
            assert_eq!(seg.never_co_occur(r, l), seg2.never_co_occur(r, l));
        }
    }
}

#[test]
fn test_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.seg");
    let seg = sample_builder().build().unwrap();
    seg.save(&path).unwrap();
    let seg2 = Segmenter::open(&path).unwrap();
    assert_eq!(seg2.num_ids(), 32);
    assert!(!seg2.is_boundary(10, 25));
}

#[test]
fn test_from_text() {
    let text = "\
32
# particles attach to the preceding word
* 20-29 N
20 21 X
";
    let seg = SegmenterBuilder::from_text(text).unwrap().build().unwrap();
    assert!(!seg.is_boundary(10, 25));
    assert!(seg.is_boundary(10, 30));
    assert!(seg.never_co_occur(20, 21));
}

#[test]
fn test_from_text_errors() {
    assert!(matches!(
        SegmenterBuilder::from_text(""),
        Err(DictError::Parse(_))
    ));
    assert!(matches!(
        SegmenterBuilder::from_text("4\n1 2\n"),
        Err(DictError::Parse(_))
    ));
    assert!(matches!(
        SegmenterBuilder::from_text("4\n1 9 N\n"),
        Err(DictError::Parse(_))
    ));
    assert!(matches!(
        SegmenterBuilder::from_text("4\n1 2 Q\n"),
        Err(DictError::Parse(_))
    ));
}

#[test]
fn test_truncated() {
    let bytes = sample_builder().build().unwrap().to_bytes();
    let result = Segmenter::from_bytes(&bytes[..bytes.len() - 3]);
    assert!(matches!(result, Err(DictError::Truncated { .. })));
}

#[test]
fn test_corrupt_class_table() {
    let mut bytes = sample_builder().build().unwrap().to_bytes();
    // r_table starts right after the 11-byte header; point id 0 past the class count.
    bytes[11] = 0xff;
    bytes[12] = 0x00;
    let result = Segmenter::from_bytes(&bytes);
    assert!(matches!(result, Err(DictError::Corrupt(_))));
}

#[test]
fn test_invalid_magic() {
    let mut bytes = sample_builder().build().unwrap().to_bytes();
    bytes[..4].copy_from_slice(b"KKCN");
    assert!(matches!(
        Segmenter::from_bytes(&bytes),
        Err(DictError::InvalidMagic { .. })
    ));
}
