use super::table::{u16_at, u64_at, TableStorage};

pub(super) const MAGIC: &[u8; 4] = b"KKSG";
pub(super) const VERSION: u8 = 1;
/// magic(4) + version(1) + num_ids(2) + r_class_count(2) + l_class_count(2).
pub(super) const HEADER_SIZE: usize = 4 + 1 + 2 + 2 + 2;

/// Segment-boundary permission table.
///
/// Ids are first compressed into classes (`r_table` maps a right id to its
/// class, `l_table` a left id), then two bit arrays over
/// `r_class_count * l_class_count` answer the queries. Id 0 is the
/// sentence boundary and always separates segments.
pub struct Segmenter {
    pub(super) num_ids: u16,
    pub(super) r_class_count: u16,
    pub(super) l_class_count: u16,
    pub(super) r_table_offset: usize,
    pub(super) l_table_offset: usize,
    pub(super) boundary_offset: usize,
    pub(super) never_offset: usize,
    pub(super) storage: TableStorage,
}

impl Segmenter {
    /// Whether a segment boundary must separate a node with right id
    /// `prev_rid` from a following node with left id `next_lid`.
    pub fn is_boundary(&self, prev_rid: u16, next_lid: u16) -> bool {
        if prev_rid == 0 || next_lid == 0 {
            return true;
        }
        match self.bit_index(prev_rid, next_lid) {
            Some(idx) => self.bit(self.boundary_offset, idx),
            None => true,
        }
    }

    /// Whether the two classes can never be adjacent. Such edges are
    /// skipped during the shortest-path search.
    pub fn never_co_occur(&self, prev_rid: u16, next_lid: u16) -> bool {
        if prev_rid == 0 || next_lid == 0 {
            return false;
        }
        match self.bit_index(prev_rid, next_lid) {
            Some(idx) => self.bit(self.never_offset, idx),
            None => false,
        }
    }

    pub fn num_ids(&self) -> u16 {
        self.num_ids
    }

    /// Number of distinct (right, left) classes after compression.
    pub fn class_counts(&self) -> (u16, u16) {
        (self.r_class_count, self.l_class_count)
    }

    fn bit_index(&self, prev_rid: u16, next_lid: u16) -> Option<usize> {
        if prev_rid >= self.num_ids || next_lid >= self.num_ids {
            return None;
        }
        let r = u16_at(&self.storage, self.r_table_offset + prev_rid as usize * 2) as usize;
        let l = u16_at(&self.storage, self.l_table_offset + next_lid as usize * 2) as usize;
        Some(r * self.l_class_count as usize + l)
    }

    fn bit(&self, base: usize, idx: usize) -> bool {
        let word = u64_at(&self.storage, base + (idx / 64) * 8);
        word & (1u64 << (idx % 64)) != 0
    }
}

/// Dense rule matrix compiled into a `Segmenter`.
///
/// Starts with every pair marked as a boundary and no pair marked as
/// never co-occurring.
pub struct SegmenterBuilder {
    pub(super) num_ids: u16,
    pub(super) boundary: Vec<bool>,
    pub(super) never: Vec<bool>,
}

impl SegmenterBuilder {
    pub fn new(num_ids: u16) -> Self {
        let n = num_ids as usize * num_ids as usize;
        Self {
            num_ids,
            boundary: vec![true; n],
            never: vec![false; n],
        }
    }

    pub fn set_boundary(&mut self, prev_rid: u16, next_lid: u16, value: bool) -> &mut Self {
        if let Some(idx) = self.index(prev_rid, next_lid) {
            self.boundary[idx] = value;
        }
        self
    }

    pub fn set_never_co_occur(&mut self, prev_rid: u16, next_lid: u16, value: bool) -> &mut Self {
        if let Some(idx) = self.index(prev_rid, next_lid) {
            self.never[idx] = value;
        }
        self
    }

    /// Mark every pair in the two inclusive id ranges.
    pub fn set_boundary_range(
        &mut self,
        prev: (u16, u16),
        next: (u16, u16),
        value: bool,
    ) -> &mut Self {
        for r in prev.0..=prev.1 {
            for l in next.0..=next.1 {
                self.set_boundary(r, l, value);
            }
        }
        self
    }

    fn index(&self, prev_rid: u16, next_lid: u16) -> Option<usize> {
        if prev_rid >= self.num_ids || next_lid >= self.num_ids {
            return None;
        }
        Some(prev_rid as usize * self.num_ids as usize + next_lid as usize)
    }
}
