//! Liveness: forward-reachability BFS from a supplied set of source
//! node ids along wire direction.
//!
//! A node is live if it is reachable from any of the seed sources by
//! following wires forward; every other node is dead and evaluates to a
//! constant zero output rather than being dropped from the graph.

#[cfg(not(feature = "std"))]
use alloc::collections::{BTreeMap as Map, BTreeSet as Set, VecDeque};
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::collections::{HashMap as Map, HashSet as Set, VecDeque};

use crate::graph::Wire;
use crate::ids::NodeId;

/// Returns the set of node ids forward-reachable from `source_ids` along
/// wire direction, including the sources themselves. Used by the cycle
/// evaluator to substitute zero outputs for nodes unreachable from any
/// input connection point.
pub fn compute_live_nodes(wires: &[Wire], source_ids: &[NodeId]) -> Set<NodeId> {
    let mut adjacency: Map<&NodeId, Vec<&NodeId>> = Map::new();
    for wire in wires {
        adjacency
            .entry(&wire.source.node_id)
            .or_default()
            .push(&wire.target.node_id);
    }

    let mut live: Set<NodeId> = source_ids.iter().cloned().collect();
    let mut queue: VecDeque<NodeId> = source_ids.iter().cloned().collect();

    while let Some(current) = queue.pop_front() {
        if let Some(successors) = adjacency.get(&current) {
            for &succ in successors {
                if !live.contains(succ) {
                    live.insert(succ.clone());
                    queue.push_back(succ.clone());
                }
            }
        }
    }

    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PortRef;

    fn wire(from: &str, to: &str) -> Wire {
        Wire::new(
            format!("{from}->{to}"),
            PortRef::new(from, 0),
            PortRef::new(to, 0),
        )
    }

    #[cfg(feature = "std")]
    use std::format;
    #[cfg(not(feature = "std"))]
    use alloc::format;

    #[test]
    fn reaches_transitively() {
        let wires = vec![wire("a", "b"), wire("b", "c")];
        let live = compute_live_nodes(&wires, &[NodeId::new("a")]);
        assert!(live.contains(&NodeId::new("a")));
        assert!(live.contains(&NodeId::new("b")));
        assert!(live.contains(&NodeId::new("c")));
    }

    #[test]
    fn disconnected_subgraph_is_not_live() {
        let wires = vec![wire("a", "b"), wire("x", "y")];
        let live = compute_live_nodes(&wires, &[NodeId::new("a")]);
        assert!(!live.contains(&NodeId::new("x")));
        assert!(!live.contains(&NodeId::new("y")));
    }

    #[test]
    fn sources_alone_are_live_with_no_wires() {
        let live = compute_live_nodes(&[], &[NodeId::new("only")]);
        assert_eq!(live.len(), 1);
        assert!(live.contains(&NodeId::new("only")));
    }
}
