use std::fs;
use std::path::Path;

use super::connector::{Connector, HEADER_SIZE, MAGIC, VERSION};
use super::table::{check_len, check_preamble, u16_at, u32_at, u64_at, words_for, TableStorage};
use super::DictError;

impl Connector {
    /// Build from a text file.
    ///
    /// Supports two formats (auto-detected):
    /// - **Mozc**: Line 1 is `n` (or `rows cols`), then one cost per line in
    ///   row-major order (row = previous right id, column = next left id).
    /// - **MeCab**: Line 1 is `rows cols`, then `prev_rid next_lid cost` per
    ///   line; cells that are not listed are absent.
    ///
    /// Costs at or above `default_cost` are not stored, so they read back
    /// as `default_cost`. Negative costs are rejected.
    pub fn from_text(text: &str, default_cost: u16) -> Result<Self, DictError> {
        Self::from_text_with_metadata(text, default_cost, 0, 0)
    }

    /// Build from a text file with function-word id range metadata.
    pub fn from_text_with_metadata(
        text: &str,
        default_cost: u16,
        fw_min: u16,
        fw_max: u16,
    ) -> Result<Self, DictError> {
        let mut lines = text.lines().peekable();

        let header = lines
            .next()
            .ok_or_else(|| DictError::Parse("empty file".to_string()))?;
        let parts: Vec<&str> = header.split_whitespace().collect();
        let parse_dim = |s: &str, name: &str| -> Result<u16, DictError> {
            s.parse()
                .map_err(|e| DictError::Parse(format!("invalid {name}: {e}")))
        };
        let (rows, cols) = match parts.len() {
            1 => {
                let n = parse_dim(parts[0], "size")?;
                (n, n)
            }
            2 => (parse_dim(parts[0], "rows")?, parse_dim(parts[1], "cols")?),
            _ => {
                return Err(DictError::Parse(format!(
                    "expected 1 or 2 values in header, got {}",
                    parts.len()
                )));
            }
        };
        let expected = rows as usize * cols as usize;

        // Auto-detect format: skip empty lines then peek at first data line
        while lines.peek().is_some_and(|line| line.trim().is_empty()) {
            lines.next();
        }
        let is_triplet = lines
            .peek()
            .is_some_and(|line| line.split_whitespace().count() == 3);

        let mut cells: Vec<Option<u16>> = vec![None; expected];
        if is_triplet {
            for line in lines {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() != 3 {
                    return Err(DictError::Parse(format!(
                        "expected 3 fields, got {}",
                        fields.len()
                    )));
                }
                let prev: usize = fields[0]
                    .parse()
                    .map_err(|e| DictError::Parse(format!("prev_rid: {e}")))?;
                let next: usize = fields[1]
                    .parse()
                    .map_err(|e| DictError::Parse(format!("next_lid: {e}")))?;
                let cost = parse_cost(fields[2])?;
                if prev >= rows as usize || next >= cols as usize {
                    return Err(DictError::Parse(format!(
                        "index out of bounds: ({prev}, {next})"
                    )));
                }
                cells[prev * cols as usize + next] = Some(cost);
            }
        } else {
            let mut count = 0;
            for line in lines {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if count >= expected {
                    return Err(DictError::Parse(format!(
                        "expected {expected} costs, got more"
                    )));
                }
                cells[count] = Some(parse_cost(line)?);
                count += 1;
            }
            if count != expected {
                return Err(DictError::Parse(format!(
                    "expected {expected} costs, got {count}"
                )));
            }
        }

        Self::build(rows, cols, default_cost, fw_min, fw_max, |r, c| {
            cells[r * cols as usize + c]
        })
    }

    /// Build from a dense row-major cost array of `rows * cols` entries.
    pub fn from_dense(
        rows: u16,
        cols: u16,
        costs: &[u16],
        default_cost: u16,
    ) -> Result<Self, DictError> {
        Self::from_dense_with_metadata(rows, cols, costs, default_cost, 0, 0)
    }

    pub fn from_dense_with_metadata(
        rows: u16,
        cols: u16,
        costs: &[u16],
        default_cost: u16,
        fw_min: u16,
        fw_max: u16,
    ) -> Result<Self, DictError> {
        let expected = rows as usize * cols as usize;
        if costs.len() != expected {
            return Err(DictError::Parse(format!(
                "expected {expected} costs, got {}",
                costs.len()
            )));
        }
        Self::build(rows, cols, default_cost, fw_min, fw_max, |r, c| {
            Some(costs[r * cols as usize + c])
        })
    }

    /// Encode cells into the compiled layout and load the result.
    fn build(
        rows: u16,
        cols: u16,
        default_cost: u16,
        fw_min: u16,
        fw_max: u16,
        cell: impl Fn(usize, usize) -> Option<u16>,
    ) -> Result<Self, DictError> {
        let words_per_row = words_for(cols as usize);
        let mut words = vec![0u64; rows as usize * words_per_row];
        let mut values: Vec<u16> = Vec::new();
        for r in 0..rows as usize {
            for c in 0..cols as usize {
                let Some(cost) = cell(r, c) else {
                    continue;
                };
                if cost >= default_cost {
                    continue;
                }
                words[r * words_per_row + c / 64] |= 1u64 << (c % 64);
                values.push(cost);
            }
        }
        let value_count: u32 = values
            .len()
            .try_into()
            .map_err(|_| DictError::Parse("too many connector values".to_string()))?;

        let mut buf =
            Vec::with_capacity(HEADER_SIZE + words.len() * 12 + values.len() * 2);
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&rows.to_le_bytes());
        buf.extend_from_slice(&cols.to_le_bytes());
        buf.extend_from_slice(&default_cost.to_le_bytes());
        buf.extend_from_slice(&fw_min.to_le_bytes());
        buf.extend_from_slice(&fw_max.to_le_bytes());
        buf.extend_from_slice(&value_count.to_le_bytes());
        for w in &words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        let mut rank = 0u32;
        for w in &words {
            buf.extend_from_slice(&rank.to_le_bytes());
            rank += w.count_ones();
        }
        for v in &values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Self::from_storage(TableStorage::Owned(buf))
    }

    /// Validate the compiled layout and compute section offsets.
    fn from_storage(storage: TableStorage) -> Result<Self, DictError> {
        let data: &[u8] = &storage;
        check_preamble(data, MAGIC, VERSION, HEADER_SIZE)?;
        let num_left = u16_at(data, 5);
        let num_right = u16_at(data, 7);
        let default_cost = u16_at(data, 9);
        let fw_min = u16_at(data, 11);
        let fw_max = u16_at(data, 13);
        let value_count = u32_at(data, 15) as usize;

        let words_per_row = words_for(num_right as usize);
        let word_count = num_left as usize * words_per_row;
        let bits_offset = HEADER_SIZE;
        let rank_offset = bits_offset + word_count * 8;
        let values_offset = rank_offset + word_count * 4;
        check_len(data, values_offset + value_count * 2)?;

        // Rank directory must match the bit-vectors, and padding bits past
        // the last column of a row must be clear.
        let tail_bits = num_right as usize % 64;
        let tail_mask = if tail_bits == 0 {
            0
        } else {
            !((1u64 << tail_bits) - 1)
        };
        let mut running = 0usize;
        for i in 0..word_count {
            let word = u64_at(data, bits_offset + i * 8);
            let rank = u32_at(data, rank_offset + i * 4) as usize;
            if rank != running {
                return Err(DictError::Corrupt(format!(
                    "rank directory mismatch at word {i}: {rank} != {running}"
                )));
            }
            if (i + 1) % words_per_row == 0 && word & tail_mask != 0 {
                return Err(DictError::Corrupt(format!(
                    "padding bits set in row {}",
                    i / words_per_row
                )));
            }
            running += word.count_ones() as usize;
        }
        if running != value_count {
            return Err(DictError::Corrupt(format!(
                "value count {value_count} does not match {running} set bits"
            )));
        }

        Ok(Self {
            num_left,
            num_right,
            default_cost,
            fw_min,
            fw_max,
            value_count,
            words_per_row,
            bits_offset,
            rank_offset,
            values_offset,
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

fn parse_cost(s: &str) -> Result<u16, DictError> {
    let v: i64 = s
        .parse()
        .map_err(|e| DictError::Parse(format!("invalid cost '{s}': {e}")))?;
    if v < 0 {
        return Err(DictError::Parse(format!("negative cost '{s}'")));
    }
    u16::try_from(v).map_err(|_| DictError::Parse(format!("cost out of range '{s}'")))
}
