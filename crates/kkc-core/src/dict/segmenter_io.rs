use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::segmenter::{Segmenter, SegmenterBuilder, HEADER_SIZE, MAGIC, VERSION};
use super::table::{check_len, check_preamble, u16_at, words_for, TableStorage};
use super::DictError;

impl SegmenterBuilder {
    /// Parse rules from text.
    ///
    /// Line 1 is `num_ids`; each following line is `prev next kind` where
    /// `prev` / `next` are an id, an inclusive range `a-b`, or `*`, and
    /// `kind` is `B` (boundary), `N` (no boundary) or `X` (never co-occur).
    /// `#` starts a comment.
    pub fn from_text(text: &str) -> Result<Self, DictError> {
        let mut lines = text
            .lines()
            .map(|l| l.split('#').next().unwrap_or("").trim())
            .filter(|l| !l.is_empty());
        let header = lines
            .next()
            .ok_or_else(|| DictError::Parse("empty file".to_string()))?;
        let num_ids: u16 = header
            .parse()
            .map_err(|e| DictError::Parse(format!("invalid num_ids: {e}")))?;
        let mut builder = Self::new(num_ids);

        for line in lines {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(DictError::Parse(format!(
                    "expected 3 fields, got {} in '{line}'",
                    fields.len()
                )));
            }
            let prev = parse_id_range(fields[0], num_ids)?;
            let next = parse_id_range(fields[1], num_ids)?;
            match fields[2] {
                "B" => {
                    builder.set_boundary_range(prev, next, true);
                }
                "N" => {
                    builder.set_boundary_range(prev, next, false);
                }
                "X" => {
                    for r in prev.0..=prev.1 {
                        for l in next.0..=next.1 {
                            builder.set_never_co_occur(r, l, true);
                        }
                    }
                }
                other => {
                    return Err(DictError::Parse(format!("unknown rule kind '{other}'")));
                }
            }
        }
        Ok(builder)
    }

    /// Compress ids into classes and encode the bit arrays.
    ///
    /// Right ids with identical rows share a class, as do left ids with
    /// identical columns. Classes are numbered in first-seen id order.
    pub fn build(&self) -> Result<Segmenter, DictError> {
        let n = self.num_ids as usize;
        let cell = |r: usize, l: usize| (self.boundary[r * n + l], self.never[r * n + l]);

        let mut r_classes: HashMap<Vec<(bool, bool)>, u16> = HashMap::new();
        let mut r_table = Vec::with_capacity(n);
        let mut r_repr = Vec::new();
        for r in 0..n {
            let row: Vec<(bool, bool)> = (0..n).map(|l| cell(r, l)).collect();
            let next = r_classes.len() as u16;
            let class = *r_classes.entry(row).or_insert_with(|| {
                r_repr.push(r);
                next
            });
            r_table.push(class);
        }

        let mut l_classes: HashMap<Vec<(bool, bool)>, u16> = HashMap::new();
        let mut l_table = Vec::with_capacity(n);
        let mut l_repr = Vec::new();
        for l in 0..n {
            let col: Vec<(bool, bool)> = (0..n).map(|r| cell(r, l)).collect();
            let next = l_classes.len() as u16;
            let class = *l_classes.entry(col).or_insert_with(|| {
                l_repr.push(l);
                next
            });
            l_table.push(class);
        }

        let r_count = r_repr.len();
        let l_count = l_repr.len();
        let bits = r_count * l_count;
        let mut boundary = vec![0u64; words_for(bits)];
        let mut never = vec![0u64; words_for(bits)];
        for (rc, &r) in r_repr.iter().enumerate() {
            for (lc, &l) in l_repr.iter().enumerate() {
                let idx = rc * l_count + lc;
                let (b, x) = cell(r, l);
                if b {
                    boundary[idx / 64] |= 1u64 << (idx % 64);
                }
                if x {
                    never[idx / 64] |= 1u64 << (idx % 64);
                }
            }
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE + n * 4 + boundary.len() * 16);
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&self.num_ids.to_le_bytes());
        buf.extend_from_slice(&(r_count as u16).to_le_bytes());
        buf.extend_from_slice(&(l_count as u16).to_le_bytes());
        for c in &r_table {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for c in &l_table {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for w in boundary.iter().chain(never.iter()) {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        Segmenter::from_storage(TableStorage::Owned(buf))
    }
}

impl Segmenter {
    fn from_storage(storage: TableStorage) -> Result<Self, DictError> {
        let data: &[u8] = &storage;
        check_preamble(data, MAGIC, VERSION, HEADER_SIZE)?;
        let num_ids = u16_at(data, 5);
        let r_class_count = u16_at(data, 7);
        let l_class_count = u16_at(data, 9);

        let n = num_ids as usize;
        let bit_words = words_for(r_class_count as usize * l_class_count as usize);
        let r_table_offset = HEADER_SIZE;
        let l_table_offset = r_table_offset + n * 2;
        let boundary_offset = l_table_offset + n * 2;
        let never_offset = boundary_offset + bit_words * 8;
        check_len(data, never_offset + bit_words * 8)?;

        for i in 0..n {
            let r = u16_at(data, r_table_offset + i * 2);
            if r >= r_class_count {
                return Err(DictError::Corrupt(format!(
                    "right class {r} of id {i} exceeds {r_class_count}"
                )));
            }
            let l = u16_at(data, l_table_offset + i * 2);
            if l >= l_class_count {
                return Err(DictError::Corrupt(format!(
                    "left class {l} of id {i} exceeds {l_class_count}"
                )));
            }
        }

        Ok(Self {
            num_ids,
            r_class_count,
            l_class_count,
            r_table_offset,
            l_table_offset,
            boundary_offset,
            never_offset,
            storage,
        })
    }

    /// Load from compiled binary format using memory-mapped I/O.
    pub fn open(path: &Path) -> Result<Self, DictError> {
        Self::from_storage(TableStorage::map(path)?)
    }

    /// Parse from compiled binary format into an owned representation.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DictError> {
        Self::from_storage(TableStorage::Owned(data.to_vec()))
    }

    /// Serialize to compiled binary format.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.storage.to_vec()
    }

    /// Save compiled binary to file.
    pub fn save(&self, path: &Path) -> Result<(), DictError> {
        Ok(fs::write(path, self.to_bytes())?)
    }
}

fn parse_id_range(s: &str, num_ids: u16) -> Result<(u16, u16), DictError> {
    if s == "*" {
        return Ok((0, num_ids.saturating_sub(1)));
    }
    let parse = |v: &str| -> Result<u16, DictError> {
        v.parse()
            .map_err(|e| DictError::Parse(format!("invalid id '{v}': {e}")))
    };
    let (lo, hi) = match s.split_once('-') {
        Some((a, b)) => (parse(a)?, parse(b)?),
        None => {
            let v = parse(s)?;
            (v, v)
        }
    };
    if lo > hi || hi >= num_ids {
        return Err(DictError::Parse(format!("id range '{s}' out of bounds")));
    }
    Ok((lo, hi))
}
