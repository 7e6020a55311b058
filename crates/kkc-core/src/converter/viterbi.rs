use tracing::{debug, debug_span};

use crate::dict::{Connector, Segmenter};

use super::lattice::{Lattice, Node, NodeId, NodeKind};

/// Cost of a node with no reachable predecessor.
pub(crate) const INF: i64 = i64::MAX / 4;

/// Minimum accumulated cost from BOS to a node (its own word cost
/// included) and the predecessor on that path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestPathEntry {
    pub cost: i64,
    pub prev: Option<NodeId>,
}

/// Whether the edge `prev → next` may be traversed.
///
/// Class pairs marked "never co-occur" are pruned unless either side is a
/// virtual or fallback node; fallback nodes keep the lattice connected.
pub(crate) fn edge_allowed(
    segmenter: &Segmenter,
    prune_never_co_occur: bool,
    prev: &Node,
    next: &Node,
) -> bool {
    if !prune_never_co_occur {
        return true;
    }
    let exempt = |n: &Node| matches!(n.kind, NodeKind::Bos | NodeKind::Eos | NodeKind::Unknown);
    exempt(prev) || exempt(next) || !segmenter.never_co_occur(prev.rid, next.lid)
}

/// Forward DP over byte offsets, then backtrack from EOS.
///
/// Offsets are visited in increasing order, so every node ending at `p` is
/// final before any node beginning at `p` is relaxed. Predecessors are
/// scanned in insertion order and replaced only on a strictly lower cost,
/// which keeps ties on the earliest-constructed node.
///
/// Returns the best path without BOS/EOS, or `None` when EOS is
/// unreachable.
pub fn viterbi(
    lattice: &mut Lattice,
    connector: &Connector,
    segmenter: &Segmenter,
) -> Option<Vec<NodeId>> {
    let len = lattice.len();
    let _span = debug_span!("viterbi", len).entered();
    let prune = lattice.prune_never_co_occur;

    let mut best = vec![
        BestPathEntry {
            cost: INF,
            prev: None,
        };
        lattice.nodes().len()
    ];
    best[lattice.bos()] = BestPathEntry {
        cost: 0,
        prev: None,
    };

    for p in 0..=len {
        for &next_id in lattice.begin_nodes(p) {
            let next = lattice.node(next_id);
            let mut entry = BestPathEntry {
                cost: INF,
                prev: None,
            };
            for &prev_id in lattice.end_nodes(p) {
                let prev_cost = best[prev_id].cost;
                if prev_cost >= INF {
                    continue;
                }
                let prev = lattice.node(prev_id);
                if !edge_allowed(segmenter, prune, prev, next) {
                    continue;
                }
                let cost = prev_cost + i64::from(connector.cost(prev.rid, next.lid)) + next.wcost;
                if cost < entry.cost {
                    entry = BestPathEntry {
                        cost,
                        prev: Some(prev_id),
                    };
                }
            }
            best[next_id] = entry;
        }
    }

    let eos = lattice.eos();
    let total = best[eos].cost;
    lattice.best = best;
    if total >= INF {
        debug!("EOS unreachable");
        return None;
    }

    let mut path = Vec::new();
    let mut cur = lattice.best[eos].prev;
    while let Some(id) = cur {
        if id == lattice.bos() {
            break;
        }
        path.push(id);
        cur = lattice.best[id].prev;
    }
    path.reverse();
    debug!(best_cost = total, path_len = path.len());
    Some(path)
}
