use serde::Serialize;
use tracing::{debug, debug_span};

use crate::dict::{DictEntry, Dictionary};
use crate::key_corrector::KeyCorrector;
use crate::settings::CostSettings;

use super::viterbi::BestPathEntry;

/// Index of a node in `Lattice::nodes`.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Virtual start node ending at offset 0.
    Bos,
    /// Virtual end node beginning at the key length.
    Eos,
    /// Dictionary entry (or a user-fixed value).
    Word,
    /// Synthesized single-character fallback.
    Unknown,
}

/// A candidate morpheme over the byte range `[begin, end)` of the key.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub begin: usize,
    pub end: usize,
    /// Reading slice of the original key.
    pub key: String,
    pub value: String,
    pub lid: u16,
    pub rid: u16,
    pub wcost: i64,
    pub kind: NodeKind,
    /// Found by looking up a corrected key.
    pub key_corrected: bool,
    /// Came from the full-suffix exact lookup.
    pub exact_match: bool,
}

impl Node {
    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, NodeKind::Bos | NodeKind::Eos)
    }
}

/// Fixed segment constraints for one lattice build.
///
/// `cuts` are byte offsets that every path must pass through (no node may
/// span them). A fixed value replaces all nodes in its span with a single
/// node carrying that value.
#[derive(Debug, Clone, Default)]
pub struct LatticeConstraints {
    cuts: Vec<usize>,
    fixed_values: Vec<FixedValue>,
}

#[derive(Debug, Clone)]
pub struct FixedValue {
    pub begin: usize,
    pub end: usize,
    pub value: String,
    pub lid: u16,
    pub rid: u16,
    pub wcost: i64,
}

impl LatticeConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a segment boundary at `offset`.
    pub fn add_cut(&mut self, offset: usize) {
        if let Err(pos) = self.cuts.binary_search(&offset) {
            self.cuts.insert(pos, offset);
        }
    }

    /// Pin `[begin, end)` to a single value. Implies cuts at both ends.
    pub fn add_fixed_value(&mut self, fixed: FixedValue) {
        self.add_cut(fixed.begin);
        self.add_cut(fixed.end);
        self.fixed_values.push(fixed);
    }

    pub fn is_cut(&self, offset: usize) -> bool {
        self.cuts.binary_search(&offset).is_ok()
    }

    pub fn cuts(&self) -> &[usize] {
        &self.cuts
    }

    /// Whether a node over `[begin, end)` would span a cut.
    pub fn crosses(&self, begin: usize, end: usize) -> bool {
        let first_after = self.cuts.partition_point(|&c| c <= begin);
        self.cuts.get(first_after).is_some_and(|&c| c < end)
    }

    fn fixed_value_covering(&self, offset: usize) -> Option<&FixedValue> {
        self.fixed_values
            .iter()
            .find(|f| f.begin <= offset && offset < f.end)
    }
}

/// All candidate nodes for one key.
///
/// Nodes live in an arena; `begin_nodes[p]` and `end_nodes[p]` list the
/// ids of nodes beginning / ending at byte offset `p` in insertion order.
/// BOS is registered as ending at 0 and EOS as beginning at `len`.
pub struct Lattice {
    key: String,
    nodes: Vec<Node>,
    begin_nodes: Vec<Vec<NodeId>>,
    end_nodes: Vec<Vec<NodeId>>,
    bos: NodeId,
    eos: NodeId,
    pub(crate) best: Vec<BestPathEntry>,
    pub(crate) prune_never_co_occur: bool,
}

impl Lattice {
    /// An empty lattice with BOS/EOS carrying the surrounding context ids.
    pub fn new(key: &str, left_rid: u16, right_lid: u16) -> Self {
        let len = key.len();
        let mut lattice = Self {
            key: key.to_string(),
            nodes: Vec::new(),
            begin_nodes: vec![Vec::new(); len + 1],
            end_nodes: vec![Vec::new(); len + 1],
            bos: 0,
            eos: 0,
            best: Vec::new(),
            prune_never_co_occur: true,
        };
        lattice.bos = lattice.push(Node {
            begin: 0,
            end: 0,
            key: String::new(),
            value: String::new(),
            lid: 0,
            rid: left_rid,
            wcost: 0,
            kind: NodeKind::Bos,
            key_corrected: false,
            exact_match: false,
        });
        lattice.end_nodes[0].push(lattice.bos);
        lattice.eos = lattice.push(Node {
            begin: len,
            end: len,
            key: String::new(),
            value: String::new(),
            lid: right_lid,
            rid: 0,
            wcost: 0,
            kind: NodeKind::Eos,
            key_corrected: false,
            exact_match: false,
        });
        lattice.begin_nodes[len].push(lattice.eos);
        lattice
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Insert a word node. Returns `None` when the range is empty or out of
    /// bounds.
    pub fn insert(&mut self, node: Node) -> Option<NodeId> {
        if node.begin >= node.end || node.end > self.key.len() {
            return None;
        }
        let (begin, end) = (node.begin, node.end);
        let id = self.push(node);
        self.begin_nodes[begin].push(id);
        self.end_nodes[end].push(id);
        Some(id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of word and fallback nodes (BOS/EOS excluded).
    pub fn word_node_count(&self) -> usize {
        self.nodes.len() - 2
    }

    pub fn begin_nodes(&self, offset: usize) -> &[NodeId] {
        self.begin_nodes.get(offset).map_or(&[], Vec::as_slice)
    }

    pub fn end_nodes(&self, offset: usize) -> &[NodeId] {
        self.end_nodes.get(offset).map_or(&[], Vec::as_slice)
    }

    pub fn bos(&self) -> NodeId {
        self.bos
    }

    pub fn eos(&self) -> NodeId {
        self.eos
    }

    /// Best forward cost to `id` (including its own word cost). Only valid
    /// after the Viterbi pass.
    pub fn best_cost(&self, id: NodeId) -> Option<i64> {
        self.best.get(id).map(|e| e.cost)
    }

    fn has_node(&self, begin: usize, end: usize, value: &str, lid: u16, rid: u16) -> Option<NodeId> {
        self.begin_nodes[begin].iter().copied().find(|&id| {
            let n = &self.nodes[id];
            n.end == end && n.value == value && n.lid == lid && n.rid == rid
        })
    }
}

/// Everything lattice construction reads besides the key.
pub struct LatticeBuilder<'a> {
    pub dictionary: &'a dyn Dictionary,
    pub corrector: &'a KeyCorrector,
    pub cost: &'a CostSettings,
}

impl LatticeBuilder<'_> {
    /// Build a lattice for `key`.
    ///
    /// At each char boundary `p`: prefix lookup, then the exact full-suffix
    /// lookup, then a 1-char fallback node when no 1-char node begins at
    /// `p`. Nodes found through corrected keys are added afterwards. Nodes
    /// crossing a cut are never inserted.
    pub fn build(
        &self,
        key: &str,
        constraints: &LatticeConstraints,
        left_rid: u16,
        right_lid: u16,
    ) -> Lattice {
        let _span = debug_span!("build_lattice", len = key.len()).entered();
        let mut lattice = Lattice::new(key, left_rid, right_lid);

        let offsets: Vec<usize> = key.char_indices().map(|(i, _)| i).collect();
        for (ci, &p) in offsets.iter().enumerate() {
            if let Some(fixed) = constraints.fixed_value_covering(p) {
                if fixed.begin == p {
                    lattice.insert(Node {
                        begin: fixed.begin,
                        end: fixed.end,
                        key: key[fixed.begin..fixed.end].to_string(),
                        value: fixed.value.clone(),
                        lid: fixed.lid,
                        rid: fixed.rid,
                        wcost: fixed.wcost.max(0),
                        kind: NodeKind::Word,
                        key_corrected: false,
                        exact_match: false,
                    });
                }
                continue;
            }

            for entry in self.dictionary.lookup_prefix(key, p) {
                if let Some(node) = self.entry_node(key, p, &entry, constraints) {
                    lattice.insert(node);
                }
            }

            for entry in self.dictionary.lookup_exact(key, p) {
                let Some(mut node) = self.entry_node(key, p, &entry, constraints) else {
                    continue;
                };
                if node.end != key.len() {
                    continue;
                }
                let bonus = self.cost.exact_match_bonus;
                match lattice.has_node(node.begin, node.end, &node.value, node.lid, node.rid) {
                    Some(id) => {
                        let existing = lattice.node_mut(id);
                        if !existing.exact_match {
                            existing.exact_match = true;
                            existing.wcost = (existing.wcost - bonus).max(0);
                        }
                    }
                    None => {
                        node.exact_match = true;
                        node.wcost = (node.wcost - bonus).max(0);
                        lattice.insert(node);
                    }
                }
            }

            let next = offsets.get(ci + 1).copied().unwrap_or(key.len());
            let has_single = lattice
                .begin_nodes(p)
                .iter()
                .any(|&id| lattice.node(id).end == next);
            if !has_single {
                lattice.insert(Node {
                    begin: p,
                    end: next,
                    key: key[p..next].to_string(),
                    value: key[p..next].to_string(),
                    lid: self.cost.unknown_id,
                    rid: self.cost.unknown_id,
                    wcost: self.cost.unknown_word_cost,
                    kind: NodeKind::Unknown,
                    key_corrected: false,
                    exact_match: false,
                });
            }
        }

        let corrected = self.add_corrected_nodes(&mut lattice, constraints);
        debug!(
            node_count = lattice.word_node_count(),
            corrected,
            "lattice built"
        );
        lattice
    }

    /// Node for a dictionary entry at `p`, or `None` if the entry does not
    /// match the key there or would span a cut.
    fn entry_node(
        &self,
        key: &str,
        p: usize,
        entry: &DictEntry,
        constraints: &LatticeConstraints,
    ) -> Option<Node> {
        let end = p + entry.key.len();
        if entry.key.is_empty() || key.get(p..end) != Some(entry.key.as_str()) {
            return None;
        }
        if constraints.crosses(p, end) {
            return None;
        }
        Some(Node {
            begin: p,
            end,
            key: entry.key.clone(),
            value: entry.value.clone(),
            lid: entry.lid,
            rid: entry.rid,
            wcost: i64::from(entry.cost),
            kind: NodeKind::Word,
            key_corrected: false,
            exact_match: false,
        })
    }

    /// Look up every corrected key and insert nodes whose span touches a
    /// rewrite, mapped back to original offsets. Returns the number added.
    fn add_corrected_nodes(&self, lattice: &mut Lattice, constraints: &LatticeConstraints) -> usize {
        let key = lattice.key().to_string();
        let mut added = 0;
        for corrected in self.corrector.correct(&key) {
            if corrected.is_identity() {
                continue;
            }
            let ckey = corrected.key.as_str();
            for (q, _) in ckey.char_indices() {
                for entry in self.dictionary.lookup_prefix(ckey, q) {
                    let cend = q + entry.key.len();
                    if ckey.get(q..cend) != Some(entry.key.as_str())
                        || !corrected.overlaps_change(q, cend)
                    {
                        continue;
                    }
                    let Some((begin, end)) = corrected.original_range(q, cend) else {
                        continue;
                    };
                    if constraints.crosses(begin, end)
                        || constraints.fixed_value_covering(begin).is_some()
                        || constraints
                            .fixed_value_covering(end.saturating_sub(1))
                            .is_some()
                    {
                        continue;
                    }
                    let inserted = lattice.insert(Node {
                        begin,
                        end,
                        key: key[begin..end].to_string(),
                        value: entry.value.clone(),
                        lid: entry.lid,
                        rid: entry.rid,
                        wcost: i64::from(entry.cost) + self.cost.key_correction_penalty,
                        kind: NodeKind::Word,
                        key_corrected: true,
                        exact_match: false,
                    });
                    if inserted.is_some() {
                        added += 1;
                    }
                }
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::testutil::test_dictionary;
    use crate::settings::Settings;

    fn build(key: &str, constraints: &LatticeConstraints) -> Lattice {
        let dict = test_dictionary();
        let settings = Settings::default();
        let corrector = KeyCorrector::default();
        LatticeBuilder {
            dictionary: &dict,
            corrector: &corrector,
            cost: &settings.cost,
        }
        .build(key, constraints, 0, 0)
    }

    fn values_at(lattice: &Lattice, p: usize) -> Vec<&str> {
        lattice
            .begin_nodes(p)
            .iter()
            .map(|&id| lattice.node(id).value.as_str())
            .collect()
    }

    #[test]
    fn test_prefix_nodes() {
        let lattice = build("きょうは", &LatticeConstraints::new());
        let at0 = values_at(&lattice, 0);
        assert!(at0.contains(&"今日"));
        assert!(at0.contains(&"京"));
        assert!(at0.contains(&"木"));
        assert_eq!(values_at(&lattice, 9), vec!["は"]);
    }

    #[test]
    fn test_every_offset_has_a_node() {
        let key = "きょうはいいてんき";
        let lattice = build(key, &LatticeConstraints::new());
        for (p, _) in key.char_indices() {
            assert!(!lattice.begin_nodes(p).is_empty(), "no node begins at {p}");
        }
        for node in lattice.nodes() {
            assert!(node.end <= key.len());
        }
    }

    #[test]
    fn test_unknown_fallback() {
        let lattice = build("ぬ", &LatticeConstraints::new());
        assert_eq!(lattice.word_node_count(), 1);
        let id = lattice.begin_nodes(0)[0];
        let node = lattice.node(id);
        assert_eq!(node.kind, NodeKind::Unknown);
        assert_eq!(node.value, "ぬ");
        assert_eq!(node.wcost, 10000);
        assert_eq!(node.lid, 1);
    }

    #[test]
    fn test_fallback_added_when_only_longer_match() {
        // "きょ" has no 1-char entry for "ょ"
        let lattice = build("きょう", &LatticeConstraints::new());
        let at3: Vec<NodeKind> = lattice
            .begin_nodes(3)
            .iter()
            .map(|&id| lattice.node(id).kind)
            .collect();
        assert_eq!(at3, vec![NodeKind::Unknown]);
    }

    #[test]
    fn test_bos_eos_buckets() {
        let lattice = build("てん", &LatticeConstraints::new());
        assert_eq!(lattice.end_nodes(0), &[lattice.bos()]);
        assert!(lattice.begin_nodes(6).contains(&lattice.eos()));
        assert_eq!(lattice.node(lattice.eos()).begin, 6);
    }

    #[test]
    fn test_exact_match_flag() {
        let lattice = build("てん", &LatticeConstraints::new());
        let ten: Vec<&Node> = lattice
            .begin_nodes(0)
            .iter()
            .map(|&id| lattice.node(id))
            .filter(|n| n.end == 6)
            .collect();
        assert_eq!(ten.len(), 3);
        assert!(ten.iter().all(|n| n.exact_match));
        // "て" is a prefix entry only
        let te = lattice
            .begin_nodes(0)
            .iter()
            .map(|&id| lattice.node(id))
            .find(|n| n.end == 3)
            .unwrap();
        assert!(!te.exact_match);
    }

    #[test]
    fn test_cut_blocks_crossing_nodes() {
        let mut constraints = LatticeConstraints::new();
        constraints.add_cut(3);
        let lattice = build("てん", &constraints);
        assert!(lattice
            .nodes()
            .iter()
            .all(|n| n.is_virtual() || n.end <= 3 || n.begin >= 3));
        assert!(constraints.crosses(0, 6));
        assert!(!constraints.crosses(0, 3));
        assert!(!constraints.crosses(3, 6));
    }

    #[test]
    fn test_fixed_value_span() {
        let mut constraints = LatticeConstraints::new();
        constraints.add_fixed_value(FixedValue {
            begin: 0,
            end: 9,
            value: "京".to_string(),
            lid: 10,
            rid: 10,
            wcost: 5000,
        });
        let lattice = build("きょうは", &constraints);
        assert_eq!(values_at(&lattice, 0), vec!["京"]);
        assert!(lattice.begin_nodes(3).is_empty());
        assert_eq!(values_at(&lattice, 9), vec!["は"]);
    }

    #[test]
    fn test_corrected_nodes() {
        let lattice = build("みんあ", &LatticeConstraints::new());
        let corrected: Vec<&Node> = lattice
            .nodes()
            .iter()
            .filter(|n| n.key_corrected)
            .collect();
        assert_eq!(corrected.len(), 1);
        assert_eq!(corrected[0].value, "皆");
        assert_eq!(corrected[0].key, "みんあ");
        assert_eq!((corrected[0].begin, corrected[0].end), (0, 9));
        assert_eq!(corrected[0].wcost, 4000 + 3000);
    }
}
