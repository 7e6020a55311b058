use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::dict::{Connector, Segmenter};
use crate::segments::{Candidate, CandidateAttributes};

use super::lattice::{Lattice, Node, NodeId, NodeKind};
use super::viterbi::{edge_allowed, INF};

/// Which segmenter checks a candidate path must pass.
///
/// Mid transitions are the ones between a candidate's own nodes; edge
/// transitions connect it to the neighbouring nodes outside the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCheck {
    /// Mid transitions must not be boundaries and edges must be.
    Strict,
    /// Only mid transitions are checked.
    OnlyMid,
    /// Only edge transitions are checked.
    OnlyEdge,
}

#[derive(Debug, Clone, Copy)]
pub struct NBestOptions {
    pub boundary_check: BoundaryCheck,
    /// Check the transition from the left neighbour. Disabled at
    /// user-fixed boundaries.
    pub check_left_edge: bool,
    pub check_right_edge: bool,
    /// Maximum number of queue expansions.
    pub max_trial: usize,
}

struct QueueElement {
    node: NodeId,
    next: Option<usize>,
    /// Cost from this node's right edge to the end neighbour.
    g: i64,
    structure_cost: i64,
    wcost: i64,
}

#[derive(PartialEq, Eq)]
struct Agenda {
    f: i64,
    g: i64,
    seq: u64,
    element: usize,
}

// Reversed so that `BinaryHeap` pops the smallest (f, g, seq).
impl Ord for Agenda {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.g.cmp(&self.g))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Agenda {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lazy enumeration of paths over one segment, cheapest first.
///
/// Runs A* backwards from the node right of the segment towards the node
/// left of it. The forward Viterbi cost of each frontier node is an exact
/// lower bound on the rest of the path, so complete paths pop in
/// non-decreasing total cost. A candidate's `cost` is the full path cost
/// from BOS through the segment to the right neighbour's left edge.
pub struct NBestGenerator<'a> {
    lattice: &'a Lattice,
    connector: &'a Connector,
    segmenter: &'a Segmenter,
    begin_node: NodeId,
    end_node: NodeId,
    begin: usize,
    options: NBestOptions,
    elements: Vec<QueueElement>,
    agenda: BinaryHeap<Agenda>,
    seq: u64,
    trials: usize,
    done: bool,
}

impl<'a> NBestGenerator<'a> {
    /// Enumerate paths between `begin_node` (ending at the segment start)
    /// and `end_node` (beginning at the segment end). The lattice must
    /// have been through the Viterbi pass.
    pub fn new(
        lattice: &'a Lattice,
        connector: &'a Connector,
        segmenter: &'a Segmenter,
        begin_node: NodeId,
        end_node: NodeId,
        options: NBestOptions,
    ) -> Self {
        let begin = lattice.node(begin_node).end;
        let end = lattice.node(end_node).begin;
        let mut generator = Self {
            lattice,
            connector,
            segmenter,
            begin_node,
            end_node,
            begin,
            options,
            elements: Vec::new(),
            agenda: BinaryHeap::new(),
            seq: 0,
            trials: 0,
            done: begin >= end,
        };
        if !generator.done {
            generator.push(
                QueueElement {
                    node: end_node,
                    next: None,
                    g: 0,
                    structure_cost: 0,
                    wcost: 0,
                },
                0,
            );
        }
        generator
    }

    fn push(&mut self, element: QueueElement, f: i64) {
        let g = element.g;
        self.elements.push(element);
        self.agenda.push(Agenda {
            f,
            g,
            seq: self.seq,
            element: self.elements.len() - 1,
        });
        self.seq += 1;
    }

    fn boundary_ok(&self, left: NodeId, right: NodeId) -> bool {
        let is_left_edge = left == self.begin_node;
        let is_right_edge = right == self.end_node;
        let l = self.lattice.node(left);
        let r = self.lattice.node(right);
        if is_left_edge || is_right_edge {
            if self.options.boundary_check == BoundaryCheck::OnlyMid {
                return true;
            }
            let checked = if is_left_edge {
                self.options.check_left_edge
            } else {
                self.options.check_right_edge
            };
            if !checked || l.kind == NodeKind::Bos || r.kind == NodeKind::Eos {
                return true;
            }
            self.segmenter.is_boundary(l.rid, r.lid)
        } else {
            if self.options.boundary_check == BoundaryCheck::OnlyEdge {
                return true;
            }
            !self.segmenter.is_boundary(l.rid, r.lid)
        }
    }

    fn expand(&mut self, index: usize) {
        let (right, g, structure_cost, wcost) = {
            let e = &self.elements[index];
            (e.node, e.g, e.structure_cost, e.wcost)
        };
        let lattice = self.lattice;
        let r = lattice.node(right);
        let right_is_end = right == self.end_node;
        let at_begin = r.begin == self.begin;

        for &left in lattice.end_nodes(r.begin) {
            let l = lattice.node(left);
            let is_goal = left == self.begin_node;
            if at_begin != is_goal {
                continue;
            }
            if !is_goal && (l.is_virtual() || l.begin < self.begin) {
                continue;
            }
            let h = match lattice.best_cost(left) {
                Some(h) if h < INF => h,
                _ => continue,
            };
            if !edge_allowed(self.segmenter, lattice.prune_never_co_occur, l, r)
                || !self.boundary_ok(left, right)
            {
                continue;
            }
            let transition = i64::from(self.connector.cost(l.rid, r.lid));
            let word = if right_is_end { 0 } else { r.wcost };
            let mid = !is_goal && !right_is_end;
            let element = QueueElement {
                node: left,
                next: Some(index),
                g: g + transition + word,
                structure_cost: structure_cost + if mid { transition } else { 0 },
                wcost: wcost + word,
            };
            let f = element.g + h;
            self.push(element, f);
        }
    }

    fn candidate_at(&self, index: usize, cost: i64) -> Candidate {
        let mut nodes = Vec::new();
        let mut cur = self.elements[index].next;
        while let Some(i) = cur {
            let e = &self.elements[i];
            if e.node == self.end_node {
                break;
            }
            nodes.push(e.node);
            cur = e.next;
        }
        let e = &self.elements[index];
        make_candidate(
            self.lattice,
            self.connector,
            &nodes,
            cost,
            e.structure_cost,
            e.wcost,
        )
    }
}

impl Iterator for NBestGenerator<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        while !self.done {
            let Some(top) = self.agenda.pop() else {
                self.done = true;
                break;
            };
            if self.elements[top.element].node == self.begin_node {
                return Some(self.candidate_at(top.element, top.f));
            }
            self.trials += 1;
            if self.trials > self.options.max_trial {
                debug!(trials = self.trials, "nbest trial limit reached");
                self.done = true;
                break;
            }
            self.expand(top.element);
        }
        None
    }
}

/// Build a candidate from consecutive lattice nodes.
///
/// Trailing function-word nodes are stripped from the content key/value.
/// Multi-node candidates record one inner boundary per content word and
/// the function words following it.
pub(crate) fn make_candidate(
    lattice: &Lattice,
    connector: &Connector,
    nodes: &[NodeId],
    cost: i64,
    structure_cost: i64,
    wcost: i64,
) -> Candidate {
    let nodes: Vec<_> = nodes.iter().map(|&id| lattice.node(id)).collect();
    let key: String = nodes.iter().map(|n| n.key.as_str()).collect();
    let value: String = nodes.iter().map(|n| n.value.as_str()).collect();

    let is_fw = |n: &&Node| {
        n.kind == NodeKind::Word && connector.is_function_word(n.lid)
    };
    let content_len = nodes
        .iter()
        .rposition(|n| !is_fw(n))
        .map_or(nodes.len(), |i| i + 1);
    let content_key: String = nodes[..content_len].iter().map(|n| n.key.as_str()).collect();
    let content_value: String = nodes[..content_len]
        .iter()
        .map(|n| n.value.as_str())
        .collect();

    let mut attributes = CandidateAttributes::empty();
    if !nodes.is_empty() && nodes.iter().all(|n| n.kind == NodeKind::Unknown) {
        attributes.insert(CandidateAttributes::UNKNOWN);
    }
    if nodes.iter().any(|n| n.key_corrected) {
        attributes.insert(CandidateAttributes::KEY_CORRECTED);
    }
    if nodes.iter().any(|n| n.exact_match) {
        attributes.insert(CandidateAttributes::EXACT_MATCH);
    }

    let mut inner_segment_boundary = Vec::new();
    if nodes.len() > 1 {
        // (key_len, value_len, content_key_len, content_value_len)
        let mut groups: Vec<(usize, usize, usize, usize)> = Vec::new();
        for n in &nodes {
            match groups.last_mut() {
                Some(g) if is_fw(n) => {
                    g.0 += n.key.len();
                    g.1 += n.value.len();
                }
                _ => groups.push((n.key.len(), n.value.len(), n.key.len(), n.value.len())),
            }
        }
        // Any length over 255 bytes drops the whole list.
        let encoded: Option<Vec<u32>> = groups
            .iter()
            .map(|&(k, v, ck, cv)| Candidate::encode_inner_boundary(k, v, ck, cv))
            .collect();
        inner_segment_boundary = encoded.unwrap_or_default();
    }

    Candidate {
        key,
        value,
        content_key,
        content_value,
        lid: nodes.first().map_or(0, |n| n.lid),
        rid: nodes.last().map_or(0, |n| n.rid),
        cost,
        wcost,
        structure_cost,
        attributes,
        inner_segment_boundary,
    }
}

/// Run a generator to completion, collecting at most `limit` candidates.
pub fn collect_nbest(generator: NBestGenerator<'_>, limit: usize) -> Vec<Candidate> {
    let _span = debug_span!("collect_nbest", limit).entered();
    let out: Vec<Candidate> = generator.take(limit).collect();
    debug!(count = out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::lattice::{LatticeBuilder, LatticeConstraints};
    use crate::converter::testutil::{test_connector, test_dictionary, test_segmenter};
    use crate::converter::viterbi::viterbi;
    use crate::key_corrector::KeyCorrector;
    use crate::settings::Settings;

    fn lattice_for(key: &str) -> Lattice {
        let dict = test_dictionary();
        let settings = Settings::default();
        let corrector = KeyCorrector::default();
        let mut lattice = LatticeBuilder {
            dictionary: &dict,
            corrector: &corrector,
            cost: &settings.cost,
        }
        .build(key, &LatticeConstraints::new(), 0, 0);
        viterbi(&mut lattice, &test_connector(), &test_segmenter()).unwrap();
        lattice
    }

    fn options(boundary_check: BoundaryCheck) -> NBestOptions {
        NBestOptions {
            boundary_check,
            check_left_edge: true,
            check_right_edge: true,
            max_trial: 500,
        }
    }

    #[test]
    fn test_costs_non_decreasing() {
        let lattice = lattice_for("てん");
        let connector = test_connector();
        let segmenter = test_segmenter();
        let generator = NBestGenerator::new(
            &lattice,
            &connector,
            &segmenter,
            lattice.bos(),
            lattice.eos(),
            options(BoundaryCheck::OnlyEdge),
        );
        let cands: Vec<Candidate> = generator.collect();
        assert!(cands.len() >= 4);
        let values: Vec<&str> = cands.iter().take(3).map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["天", "点", "転"]);
        assert_eq!(cands[0].cost, 4000);
        for w in cands.windows(2) {
            assert!(w[0].cost <= w[1].cost);
        }
    }

    #[test]
    fn test_repeatable() {
        let lattice = lattice_for("きょうはいいてんき");
        let connector = test_connector();
        let segmenter = test_segmenter();
        let run = || {
            NBestGenerator::new(
                &lattice,
                &connector,
                &segmenter,
                lattice.bos(),
                lattice.eos(),
                options(BoundaryCheck::OnlyEdge),
            )
            .take(20)
            .map(|c| (c.value, c.cost))
            .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_first_candidate_is_best_path() {
        let lattice = lattice_for("きょうはいいてんき");
        let connector = test_connector();
        let segmenter = test_segmenter();
        let first = NBestGenerator::new(
            &lattice,
            &connector,
            &segmenter,
            lattice.bos(),
            lattice.eos(),
            options(BoundaryCheck::OnlyEdge),
        )
        .next()
        .unwrap();
        assert_eq!(first.value, "今日は良い天気");
        assert_eq!(Some(first.cost), lattice.best_cost(lattice.eos()));
    }

    #[test]
    fn test_strict_rejects_inner_boundary() {
        // 今日|は is joined (particle follows), は|良い is a boundary.
        let lattice = lattice_for("きょうはいい");
        let connector = test_connector();
        let segmenter = test_segmenter();
        let strict: Vec<String> = NBestGenerator::new(
            &lattice,
            &connector,
            &segmenter,
            lattice.bos(),
            lattice.eos(),
            options(BoundaryCheck::Strict),
        )
        .map(|c| c.value)
        .collect();
        assert!(!strict.iter().any(|v| v == "今日は良い"));

        let only_edge: Vec<String> = NBestGenerator::new(
            &lattice,
            &connector,
            &segmenter,
            lattice.bos(),
            lattice.eos(),
            options(BoundaryCheck::OnlyEdge),
        )
        .map(|c| c.value)
        .collect();
        assert_eq!(only_edge[0], "今日は良い");
    }

    #[test]
    fn test_content_and_inner_boundary() {
        let lattice = lattice_for("きょうは");
        let connector = test_connector();
        let segmenter = test_segmenter();
        let first = NBestGenerator::new(
            &lattice,
            &connector,
            &segmenter,
            lattice.bos(),
            lattice.eos(),
            options(BoundaryCheck::Strict),
        )
        .next()
        .unwrap();
        assert_eq!(first.value, "今日は");
        assert_eq!(first.content_value, "今日");
        assert_eq!(first.content_key, "きょう");
        assert_eq!(first.inner_segment_boundary.len(), 1);
        assert!(first.is_inner_boundary_valid());
        assert_eq!(first.lid, 10);
        assert_eq!(first.rid, 20);
    }

    #[test]
    fn test_trial_limit() {
        let lattice = lattice_for("きょうはいいてんき");
        let connector = test_connector();
        let segmenter = test_segmenter();
        let mut opts = options(BoundaryCheck::OnlyEdge);
        opts.max_trial = 1;
        let cands: Vec<Candidate> = NBestGenerator::new(
            &lattice,
            &connector,
            &segmenter,
            lattice.bos(),
            lattice.eos(),
            opts,
        )
        .collect();
        assert!(cands.is_empty());
    }
}
