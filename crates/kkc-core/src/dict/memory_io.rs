use std::fs::{self, File};
use std::path::Path;

use memmap2::Mmap;
use yada::DoubleArray;

use super::memory::{MemoryDictionary, HEADER_SIZE, MAGIC, VERSION};
use super::table::{check_len, check_preamble, u32_at};
use super::{DictEntry, DictError};

impl MemoryDictionary {
    /// Serialize as `KKDX`: header, trie units, then the bincode entry lists.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DictError> {
        let trie_data: &[u8] = self.trie.as_ref().map(|t| &t.0[..]).unwrap_or_default();
        let values_data = bincode::serialize(&self.values).map_err(DictError::Serialize)?;

        let trie_len: u32 = trie_data
            .len()
            .try_into()
            .map_err(|_| DictError::Parse("trie data exceeds u32::MAX".to_string()))?;
        let values_len: u32 = values_data
            .len()
            .try_into()
            .map_err(|_| DictError::Parse("values data exceeds u32::MAX".to_string()))?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + trie_data.len() + values_data.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&trie_len.to_le_bytes());
        buf.extend_from_slice(&values_len.to_le_bytes());
        buf.extend_from_slice(trie_data);
        buf.extend_from_slice(&values_data);
        Ok(buf)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DictError> {
        check_preamble(data, MAGIC, VERSION, HEADER_SIZE)?;
        let trie_len = u32_at(data, 5) as usize;
        let values_len = u32_at(data, 9) as usize;
        check_len(data, HEADER_SIZE + trie_len + values_len)?;
        if trie_len % 4 != 0 {
            return Err(DictError::Corrupt(format!(
                "trie length {trie_len} is not a multiple of 4"
            )));
        }

        let trie_start = HEADER_SIZE;
        let values_start = trie_start + trie_len;
        let values: Vec<Vec<DictEntry>> =
            bincode::deserialize(&data[values_start..values_start + values_len])
                .map_err(DictError::Deserialize)?;
        let trie = match (trie_len, values.is_empty()) {
            (0, true) => None,
            (0, false) | (_, true) => {
                return Err(DictError::Corrupt(
                    "trie and entry lists disagree on emptiness".to_string(),
                ));
            }
            _ => Some(DoubleArray::new(
                data[trie_start..trie_start + trie_len].to_vec(),
            )),
        };
        Ok(Self { trie, values })
    }

    /// Open a dictionary file through a read-only mapping.
    pub fn open(path: &Path) -> Result<Self, DictError> {
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and the mapping is immutable.
        // The Mmap is dropped after deserialization completes below.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_bytes(&mmap)
    }

    pub fn save(&self, path: &Path) -> Result<(), DictError> {
        Ok(fs::write(path, self.to_bytes()?)?)
    }
}
