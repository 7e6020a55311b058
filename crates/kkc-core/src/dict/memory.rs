use std::collections::BTreeMap;

use yada::builder::DoubleArrayBuilder;
use yada::DoubleArray;

use super::{DictEntry, DictError, Dictionary};

pub(super) const MAGIC: &[u8; 4] = b"KKDX";
pub(super) const VERSION: u8 = 2;
/// magic(4) + version(1) + trie_len(4) + values_len(4).
pub(super) const HEADER_SIZE: usize = 4 + 1 + 4 + 4;

/// Reading index over a double-array trie.
///
/// Each trie value is an index into `values`, the entry list of that
/// reading. Entries under one reading are kept sorted by cost (stable), so
/// lookups return them in a deterministic order.
pub struct MemoryDictionary {
    /// `None` for a dictionary without entries.
    pub(super) trie: Option<DoubleArray<Vec<u8>>>,
    pub(super) values: Vec<Vec<DictEntry>>,
}

impl MemoryDictionary {
    pub fn from_entries(entries: impl IntoIterator<Item = DictEntry>) -> Result<Self, DictError> {
        let mut map: BTreeMap<String, Vec<DictEntry>> = BTreeMap::new();
        for e in entries {
            if e.key.is_empty() {
                continue;
            }
            if e.key.contains('\0') {
                return Err(DictError::Parse(format!("NUL byte in key {:?}", e.key)));
            }
            map.entry(e.key.clone()).or_default().push(e);
        }
        for list in map.values_mut() {
            list.sort_by_key(|e| e.cost);
        }

        // BTreeMap iteration is already in byte order, as the builder needs.
        let keyset: Vec<(&[u8], u32)> = map
            .keys()
            .enumerate()
            .map(|(id, key)| (key.as_bytes(), id as u32))
            .collect();
        let trie = if keyset.is_empty() {
            None
        } else {
            let bytes = DoubleArrayBuilder::build(&keyset)
                .ok_or_else(|| DictError::Corrupt("failed to build reading trie".to_string()))?;
            Some(DoubleArray::new(bytes))
        };
        let values = map.into_values().collect();
        Ok(Self { trie, values })
    }

    /// Parse Mozc-style TSV: `key \t lid \t rid \t cost \t value` per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_text(text: &str) -> Result<Self, DictError> {
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 5 {
                return Err(DictError::Parse(format!(
                    "line {}: expected 5 tab-separated fields, got {}",
                    lineno + 1,
                    fields.len()
                )));
            }
            let parse_u16 = |s: &str, name: &str| -> Result<u16, DictError> {
                s.trim().parse().map_err(|e| {
                    DictError::Parse(format!("line {}: invalid {name} '{s}': {e}", lineno + 1))
                })
            };
            let lid = parse_u16(fields[1], "lid")?;
            let rid = parse_u16(fields[2], "rid")?;
            let cost = parse_u16(fields[3], "cost")?;
            entries.push(DictEntry::new(fields[0], fields[4], cost, lid, rid));
        }
        Self::from_entries(entries)
    }

    /// Returns (reading_count, entry_count).
    pub fn stats(&self) -> (usize, usize) {
        let entries = self.values.iter().map(|v| v.len()).sum();
        (self.values.len(), entries)
    }

    fn entries(&self, id: u32) -> &[DictEntry] {
        self.values.get(id as usize).map(Vec::as_slice).unwrap_or_default()
    }
}

impl Dictionary for MemoryDictionary {
    fn lookup_prefix(&self, key: &str, offset: usize) -> Vec<DictEntry> {
        let (Some(trie), Some(suffix)) = (&self.trie, key.get(offset..)) else {
            return Vec::new();
        };
        // Matches come shortest first.
        trie.common_prefix_search(&suffix.as_bytes())
            .flat_map(|(id, _len)| self.entries(id).iter().cloned())
            .collect()
    }

    fn lookup_exact(&self, key: &str, offset: usize) -> Vec<DictEntry> {
        let (Some(trie), Some(suffix)) = (&self.trie, key.get(offset..)) else {
            return Vec::new();
        };
        if suffix.is_empty() {
            return Vec::new();
        }
        trie.exact_match_search(&suffix.as_bytes())
            .map(|id| self.entries(id).to_vec())
            .unwrap_or_default()
    }
}
