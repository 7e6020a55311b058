//! Dictionary interface and the compiled cost tables.
//!
//! `Dictionary` is the lookup collaborator consumed by lattice construction;
//! `MemoryDictionary` is a small reference implementation used by tests and
//! the CLI. `Connector` stores POS transition costs for Viterbi scoring and
//! `Segmenter` decides where segment boundaries fall.

pub mod connector;
mod connector_io;
mod entry;
mod memory;
mod memory_io;
pub mod segmenter;
mod segmenter_io;
mod table;
#[cfg(test)]
mod tests;

pub use connector::Connector;
pub use entry::DictEntry;
pub use memory::MemoryDictionary;
pub use segmenter::{Segmenter, SegmenterBuilder};

use std::io;

/// Unified error type for dictionary and table binary I/O.
///
/// Covers loading/saving `MemoryDictionary` (KKDX), `Connector` (KKCN)
/// and `Segmenter` (KKSG) files. A table that fails to load is fatal for
/// the engine: conversion is never attempted without valid tables.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected {expected})")]
    InvalidMagic { expected: &'static str },

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("truncated data: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("corrupt table: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Lookup collaborator for lattice construction.
///
/// Offsets are byte positions into `key` and always fall on char
/// boundaries. Results must be deterministic for a given key and offset;
/// each returned entry's `key` must be a prefix of `key[offset..]`.
pub trait Dictionary: Send + Sync {
    /// All entries whose key is a prefix of `key[offset..]`, any length.
    fn lookup_prefix(&self, key: &str, offset: usize) -> Vec<DictEntry>;

    /// Entries whose key is exactly `key[offset..]`.
    fn lookup_exact(&self, key: &str, offset: usize) -> Vec<DictEntry>;
}
