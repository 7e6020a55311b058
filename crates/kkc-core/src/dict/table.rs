//! Byte storage and little-endian readers shared by the compiled tables.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

use super::DictError;

/// Backing storage for a compiled table: either owned or memory-mapped.
pub(super) enum TableStorage {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl TableStorage {
    pub(super) fn map(path: &Path) -> Result<Self, DictError> {
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and the mapping is immutable.
        // We hold the Mmap for the lifetime of the table, so the data remains
        // valid. The file must not be modified while the engine is running.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self::Mapped(mmap))
    }
}

impl Deref for TableStorage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Owned(v) => v,
            Self::Mapped(m) => m,
        }
    }
}

pub(super) fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

pub(super) fn u32_at(data: &[u8], offset: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(b)
}

pub(super) fn u64_at(data: &[u8], offset: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(b)
}

/// Check magic and version, returning an error for the first mismatch.
pub(super) fn check_preamble(
    data: &[u8],
    magic: &'static [u8; 4],
    version: u8,
    header_size: usize,
) -> Result<(), DictError> {
    if data.len() < header_size {
        return Err(DictError::InvalidHeader);
    }
    if &data[..4] != magic {
        return Err(DictError::InvalidMagic {
            expected: std::str::from_utf8(magic).unwrap_or("????"),
        });
    }
    if data[4] != version {
        return Err(DictError::UnsupportedVersion(data[4]));
    }
    Ok(())
}

/// Verify that the table is exactly `expected` bytes long.
pub(super) fn check_len(data: &[u8], expected: usize) -> Result<(), DictError> {
    if data.len() != expected {
        return Err(DictError::Truncated {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Number of u64 words needed to hold `bits` bits.
pub(super) fn words_for(bits: usize) -> usize {
    bits.div_ceil(64)
}
