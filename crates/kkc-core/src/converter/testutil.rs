//! Small synthetic dictionary and tables shared by converter tests.
//!
//! POS ids: 1 unknown, 10 noun, 20..=29 function words (20 は, 21 です,
//! 22 が), 30 adjective, 50 "→", 51 ">", 52 "ー".

use std::sync::Arc;

use crate::dict::{Connector, DictEntry, MemoryDictionary, Segmenter, SegmenterBuilder};
use crate::settings::Settings;

use super::ImmutableConverter;

pub const NUM_IDS: u16 = 64;

pub fn test_entries() -> Vec<DictEntry> {
    vec![
        DictEntry::new("きょう", "今日", 3000, 10, 10),
        DictEntry::new("きょう", "京", 5000, 10, 10),
        DictEntry::new("き", "木", 4500, 10, 10),
        DictEntry::new("は", "は", 2000, 20, 20),
        DictEntry::new("いい", "良い", 3500, 30, 30),
        DictEntry::new("てんき", "天気", 4000, 10, 10),
        DictEntry::new("てん", "天", 4000, 10, 10),
        DictEntry::new("てん", "点", 4200, 10, 10),
        DictEntry::new("てん", "転", 4500, 10, 10),
        DictEntry::new("て", "手", 3500, 10, 10),
        DictEntry::new("わたし", "私", 3000, 10, 10),
        DictEntry::new("がくせい", "学生", 3500, 10, 10),
        DictEntry::new("です", "です", 2000, 21, 21),
        DictEntry::new("が", "が", 2000, 22, 22),
        DictEntry::new("みんな", "皆", 4000, 10, 10),
        DictEntry::new(">", "→", 2000, 50, 50),
        DictEntry::new(">", ">", 1000, 51, 51),
        DictEntry::new("ー", "ー", 1000, 52, 52),
    ]
}

pub fn test_dictionary() -> MemoryDictionary {
    MemoryDictionary::from_entries(test_entries()).unwrap()
}

/// All transitions cost 0 except "ー" → ">" (3000).
pub fn test_connector() -> Connector {
    let n = NUM_IDS as usize;
    let mut costs = vec![0u16; n * n];
    costs[52 * n + 51] = 3000;
    Connector::from_dense_with_metadata(NUM_IDS, NUM_IDS, &costs, 5000, 20, 29)
        .expect("test connector")
}

/// Every pair is a boundary except a word followed by a function word and
/// runs of unknown characters.
pub fn test_segmenter() -> Segmenter {
    let mut builder = SegmenterBuilder::new(NUM_IDS);
    builder.set_boundary_range((1, NUM_IDS - 1), (20, 29), false);
    builder.set_boundary(1, 1, false);
    builder.build().expect("test segmenter")
}

pub fn test_converter() -> ImmutableConverter {
    test_converter_with(Settings::default())
}

pub fn test_converter_with(settings: Settings) -> ImmutableConverter {
    ImmutableConverter::with_settings(
        Arc::new(test_dictionary()),
        Arc::new(test_connector()),
        Arc::new(test_segmenter()),
        settings,
    )
}
