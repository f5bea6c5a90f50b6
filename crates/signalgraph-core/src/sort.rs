//! Topological sort: Kahn-order of a node id set under a directed edge
//! list, with per-node depth and concrete cycle-path diagnostics.
//!
//! Kahn's algorithm over a vector in-degree array, queue seeded with
//! zero-in-degree nodes; a cycle is detected when the sorted count falls
//! short of the active count. The queue discipline is FIFO so zero-in-degree
//! nodes are processed stably in input order. On failure, a concrete cycle
//! path is reconstructed by DFS over whatever remained unsorted.

#[cfg(not(feature = "std"))]
use alloc::collections::{BTreeMap as Map, VecDeque};
#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::collections::{HashMap as Map, VecDeque};

use crate::graph::Wire;
use crate::ids::NodeId;

/// Topological order plus per-node depth, returned by
/// [`topological_sort_with_depths`].
#[derive(Debug, Clone)]
pub struct TopoOrder {
    /// Node ids in Kahn order: zero-in-degree nodes first, stably in input
    /// order; disconnected nodes are included with depth 0.
    pub order: Vec<NodeId>,
    /// Depth of each node: `max(depth(pred) + 1)` over direct predecessors,
    /// 0 for roots. Populated only by [`topological_sort_with_depths`];
    /// empty for plain [`topological_sort`].
    pub depths: Map<NodeId, u32>,
    /// The maximum depth across all nodes, or 0 for an empty/depthless order.
    pub max_depth: u32,
}

/// A cycle was found while sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortError {
    /// A concrete cycle path (node ids), discovered by DFS over the
    /// unprocessed remainder once Kahn's algorithm stalls.
    pub cycle_path: Vec<NodeId>,
}

impl core::fmt::Display for SortError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "cycle detected: ")?;
        for (i, id) in self.cycle_path.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SortError {}

/// Builds adjacency (outgoing successors) and in-degree for the given node
/// set under `wires`. Self-edges count toward in-degree like any other edge,
/// so a self-loop node never reaches zero in-degree and is always reported
/// as a cycle.
fn build_adjacency<'a>(
    node_ids: &'a [NodeId],
    wires: &[Wire],
) -> (Map<&'a NodeId, Vec<&'a NodeId>>, Map<&'a NodeId, u32>) {
    let mut adjacency: Map<&NodeId, Vec<&NodeId>> = Map::new();
    let mut in_degree: Map<&NodeId, u32> = Map::new();
    for id in node_ids {
        adjacency.insert(id, Vec::new());
        in_degree.insert(id, 0);
    }
    for wire in wires {
        let from = node_ids.iter().find(|id| **id == wire.source.node_id);
        let to = node_ids.iter().find(|id| **id == wire.target.node_id);
        if let (Some(from), Some(to)) = (from, to) {
            adjacency.get_mut(from).unwrap().push(to);
            *in_degree.get_mut(to).unwrap() += 1;
        }
    }
    (adjacency, in_degree)
}

/// Runs Kahn's algorithm over `node_ids` under `wires`. On success, returns
/// the full order (every id present, disconnected nodes included). On
/// failure, reconstructs one concrete cycle path by DFS over whichever nodes
/// never reached zero in-degree.
pub fn topological_sort(node_ids: &[NodeId], wires: &[Wire]) -> Result<Vec<NodeId>, SortError> {
    let (adjacency, mut in_degree) = build_adjacency(node_ids, wires);

    let mut queue: VecDeque<&NodeId> = node_ids
        .iter()
        .filter(|id| in_degree[*id] == 0)
        .collect();
    let mut sorted: Vec<NodeId> = Vec::with_capacity(node_ids.len());

    while let Some(id) = queue.pop_front() {
        sorted.push(id.clone());
        for &succ in &adjacency[id] {
            let d = in_degree.get_mut(succ).unwrap();
            *d -= 1;
            if *d == 0 {
                queue.push_back(succ);
            }
        }
    }

    if sorted.len() != node_ids.len() {
        let remainder: Vec<NodeId> = node_ids
            .iter()
            .filter(|id| !sorted.contains(id))
            .cloned()
            .collect();
        let cycle_path = find_cycle_path(&remainder, &adjacency);
        return Err(SortError { cycle_path });
    }

    Ok(sorted)
}

/// DFS over the unprocessed remainder to find one concrete cycle. Since
/// every node here failed to reach zero in-degree, the remainder's induced
/// subgraph contains at least one cycle; a plain white/gray/black DFS finds
/// the back edge that closes it.
fn find_cycle_path<'a>(
    remainder: &'a [NodeId],
    adjacency: &Map<&NodeId, Vec<&NodeId>>,
) -> Vec<NodeId> {
    #[derive(PartialEq, Eq, Clone, Copy)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: Map<&NodeId, Color> = remainder.iter().map(|id| (id, Color::White)).collect();
    let mut stack: Vec<NodeId> = Vec::new();

    fn visit<'a>(
        node: &'a NodeId,
        adjacency: &Map<&NodeId, Vec<&'a NodeId>>,
        color: &mut Map<&'a NodeId, Color>,
        stack: &mut Vec<NodeId>,
    ) -> Option<Vec<NodeId>> {
        color.insert(node, Color::Gray);
        stack.push(node.clone());
        if let Some(succs) = adjacency.get(node) {
            for &succ in succs {
                match color.get(succ) {
                    Some(Color::Gray) => {
                        // Close the cycle: everything from succ's first
                        // occurrence on the stack to here.
                        let start = stack.iter().position(|n| n == succ).unwrap_or(0);
                        let mut cycle: Vec<NodeId> = stack[start..].to_vec();
                        cycle.push(succ.clone());
                        return Some(cycle);
                    }
                    Some(Color::White) => {
                        if let Some(cycle) = visit(succ, adjacency, color, stack) {
                            return Some(cycle);
                        }
                    }
                    _ => {}
                }
            }
        }
        stack.pop();
        color.insert(node, Color::Black);
        None
    }

    for id in remainder {
        if color[id] == Color::White
            && let Some(cycle) = visit(id, adjacency, &mut color, &mut stack)
        {
            return cycle;
        }
    }
    // Every remainder node participates in some cycle even if this DFS
    // somehow finds none (shouldn't happen); fall back to the full
    // remainder so callers always get a non-empty diagnostic.
    remainder.to_vec()
}

/// As [`topological_sort`], additionally computing per-node depth: the
/// longest path length (in edges) from any zero-in-degree node, computed in
/// topo order after the sort succeeds.
pub fn topological_sort_with_depths(
    node_ids: &[NodeId],
    wires: &[Wire],
) -> Result<TopoOrder, SortError> {
    let order = topological_sort(node_ids, wires)?;

    // Depth of a node is the longest path from any root, computed by walking
    // the topo order forward and propagating `depth(pred) + 1`.
    let mut final_depths: Map<NodeId, u32> = order.iter().map(|id| (id.clone(), 0u32)).collect();
    for id in &order {
        let preds: Vec<&Wire> = wires
            .iter()
            .filter(|w| &w.target.node_id == id && node_ids.contains(&w.source.node_id))
            .collect();
        let max_pred = preds
            .iter()
            .map(|w| *final_depths.get(&w.source.node_id).unwrap_or(&0) + 1)
            .max()
            .unwrap_or(0);
        final_depths.insert(id.clone(), max_pred);
    }

    let max_depth = final_depths.values().copied().max().unwrap_or(0);
    Ok(TopoOrder {
        order,
        depths: final_depths,
        max_depth,
    })
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

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::new(*n)).collect()
    }

    #[test]
    fn sorts_linear_chain() {
        let node_ids = ids(&["a", "b", "c"]);
        let wires = vec![wire("a", "b"), wire("b", "c")];
        let order = topological_sort(&node_ids, &wires).unwrap();
        assert_eq!(order, ids(&["a", "b", "c"]));
    }

    #[test]
    fn includes_disconnected_nodes() {
        let node_ids = ids(&["a", "b", "isolated"]);
        let wires = vec![wire("a", "b")];
        let order = topological_sort(&node_ids, &wires).unwrap();
        assert_eq!(order.len(), 3);
        assert!(order.contains(&NodeId::new("isolated")));
    }

    #[test]
    fn detects_direct_cycle() {
        let node_ids = ids(&["a", "b"]);
        let wires = vec![wire("a", "b"), wire("b", "a")];
        let err = topological_sort(&node_ids, &wires).unwrap_err();
        assert_eq!(err.cycle_path.len(), 2);
    }

    #[test]
    fn detects_self_edge_as_cycle() {
        let node_ids = ids(&["a"]);
        let wires = vec![wire("a", "a")];
        let err = topological_sort(&node_ids, &wires).unwrap_err();
        assert!(err.cycle_path.contains(&NodeId::new("a")));
    }

    #[test]
    fn detects_indirect_cycle() {
        let node_ids = ids(&["a", "b", "c"]);
        let wires = vec![wire("a", "b"), wire("b", "c"), wire("c", "a")];
        let err = topological_sort(&node_ids, &wires).unwrap_err();
        assert_eq!(err.cycle_path.len(), 3);
    }

    #[test]
    fn independent_roots_stay_in_input_order() {
        let node_ids = ids(&["a", "b", "c"]);
        let order = topological_sort(&node_ids, &[]).unwrap();
        assert_eq!(order, ids(&["a", "b", "c"]));
    }

    #[test]
    fn depths_follow_longest_path() {
        let node_ids = ids(&["a", "b", "c", "d"]);
        // a -> c, b -> c, c -> d: d's depth should be max(depth(c)) + 1 = 2.
        let wires = vec![wire("a", "c"), wire("b", "c"), wire("c", "d")];
        let result = topological_sort_with_depths(&node_ids, &wires).unwrap();
        assert_eq!(result.depths[&NodeId::new("a")], 0);
        assert_eq!(result.depths[&NodeId::new("c")], 1);
        assert_eq!(result.depths[&NodeId::new("d")], 2);
        assert_eq!(result.max_depth, 2);
    }
}
