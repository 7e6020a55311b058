use super::table::{u16_at, u32_at, u64_at, TableStorage};

pub(super) const MAGIC: &[u8; 4] = b"KKCN";
pub(super) const VERSION: u8 = 1;
/// magic(4) + version(1) + num_left(2) + num_right(2) + default_cost(2)
/// + fw_min(2) + fw_max(2) + value_count(4).
pub(super) const HEADER_SIZE: usize = 4 + 1 + 2 + 2 + 2 + 2 + 2 + 4;

/// Sparse transition-cost table between POS boundary classes.
///
/// Rows are indexed by the previous node's right id, columns by the next
/// node's left id. Each row is a bit-vector marking which columns carry an
/// explicit cost; a rank directory (set bits before each u64 word) turns a
/// present bit into an index into the packed value array. Columns without
/// an explicit cost, and ids outside the table, cost `default_cost`: a
/// large finite value that discourages a transition without making the
/// lattice disconnected.
pub struct Connector {
    pub(super) num_left: u16,
    pub(super) num_right: u16,
    pub(super) default_cost: u16,
    pub(super) fw_min: u16,
    pub(super) fw_max: u16,
    pub(super) value_count: usize,
    pub(super) words_per_row: usize,
    pub(super) bits_offset: usize,
    pub(super) rank_offset: usize,
    pub(super) values_offset: usize,
    pub(super) storage: TableStorage,
}

impl Connector {
    /// Transition cost from a node with right id `prev_rid` to a node with
    /// left id `next_lid`.
    pub fn cost(&self, prev_rid: u16, next_lid: u16) -> u16 {
        if prev_rid >= self.num_left || next_lid >= self.num_right {
            return self.default_cost;
        }
        let col = next_lid as usize;
        let word_idx = prev_rid as usize * self.words_per_row + col / 64;
        let word = u64_at(&self.storage, self.bits_offset + word_idx * 8);
        let bit = col % 64;
        if word & (1u64 << bit) == 0 {
            return self.default_cost;
        }
        let below = word & ((1u64 << bit) - 1);
        let rank = u32_at(&self.storage, self.rank_offset + word_idx * 4) as usize
            + below.count_ones() as usize;
        u16_at(&self.storage, self.values_offset + rank * 2)
    }

    /// Number of right ids (rows) covered by the table.
    pub fn num_left(&self) -> u16 {
        self.num_left
    }

    /// Number of left ids (columns) covered by the table.
    pub fn num_right(&self) -> u16 {
        self.num_right
    }

    /// Cost returned for absent entries.
    pub fn default_cost(&self) -> u16 {
        self.default_cost
    }

    /// Number of explicitly stored costs.
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    /// Function-word POS id range (inclusive); `(0, 0)` when unset.
    pub fn function_word_range(&self) -> (u16, u16) {
        (self.fw_min, self.fw_max)
    }

    /// Check whether a POS id falls in the function-word range (particles,
    /// auxiliary verbs). Returns `false` when no range is set.
    pub fn is_function_word(&self, id: u16) -> bool {
        self.fw_min != 0 && self.fw_min <= id && id <= self.fw_max
    }

    /// Bytes held by the table (mapped or owned).
    pub fn byte_len(&self) -> usize {
        self.storage.len()
    }
}
