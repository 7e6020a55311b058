//! Statistical kana-kanji conversion core.
//!
//! A key (kana reading) goes through lattice construction over dictionary
//! lookups, a Viterbi pass scored by the `Connector` transition table,
//! segmentation by the `Segmenter` boundary table, and per-segment N-best
//! enumeration into `Segments`.

pub mod converter;
pub mod dict;
pub mod key_corrector;
pub mod segments;
pub mod settings;
pub mod unicode;
