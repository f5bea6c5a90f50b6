//! Wire-delay distributor: assigns each wire an integer delay so every
//! source-to-sink path sums to exactly `TOTAL_TICKS`.
//!
//! Built on a forward depth walk over the topo order: each node's depth is
//! the longest path length from any root, and delay per wire is derived
//! from the difference in arrival time its endpoints would see if budget
//! were spread evenly by depth. The resulting per-wire delays size the
//! ring-buffer delay lines the tick scheduler reads from.

#[cfg(not(feature = "std"))]
use alloc::collections::{BTreeMap as Map, BTreeSet as Set, VecDeque};
#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::collections::{HashMap as Map, HashSet as Set, VecDeque};

use crate::graph::Wire;
use crate::ids::NodeId;

/// Output of the wire-delay distributor.
#[derive(Debug, Clone, Default)]
pub struct WireDelayAnalysis {
    /// Per-wire integer delay, always >= 1.
    pub wire_delays: Map<String, u32>,
    /// Per-node depth (longest path from any zero-in-degree node).
    pub node_depths: Map<NodeId, u32>,
    /// Maximum depth among output-reachable (terminal-reaching) nodes.
    pub output_max_depth: u32,
}

fn forward_depths(topo_order: &[NodeId], wires: &[Wire]) -> Map<NodeId, u32> {
    let mut depths: Map<NodeId, u32> = topo_order.iter().map(|id| (id.clone(), 0u32)).collect();
    for id in topo_order {
        let preds: Vec<&Wire> = wires.iter().filter(|w| &w.target.node_id == id).collect();
        let max_pred = preds
            .iter()
            .map(|w| depths.get(&w.source.node_id).copied().unwrap_or(0) + 1)
            .max()
            .unwrap_or(0);
        if let Some(d) = depths.get_mut(id) {
            *d = max_pred;
        }
    }
    depths
}

fn output_reachable_set(terminals: &[NodeId], wires: &[Wire]) -> Set<NodeId> {
    // Backward BFS from terminals along reversed wire direction.
    let mut reverse_adjacency: Map<&NodeId, Vec<&NodeId>> = Map::new();
    for wire in wires {
        reverse_adjacency
            .entry(&wire.target.node_id)
            .or_default()
            .push(&wire.source.node_id);
    }
    let mut reached: Set<NodeId> = terminals.iter().cloned().collect();
    let mut queue: VecDeque<NodeId> = terminals.iter().cloned().collect();
    while let Some(current) = queue.pop_front() {
        if let Some(preds) = reverse_adjacency.get(&current) {
            for &pred in preds {
                if !reached.contains(pred) {
                    reached.insert(pred.clone());
                    queue.push_back(pred.clone());
                }
            }
        }
    }
    reached
}

/// Distributes `total_ticks` of wire delay across `wires` such that every
/// source-to-sink path's delay sum equals `total_ticks` exactly (subject to
/// the flooring caveat below), with every wire delay >= 1.
///
/// When `total_ticks` is smaller than the longest path's hop count, wires
/// are floored at delay 1 and the path-sum invariant may be exceeded; this
/// is a documented misconfiguration, not a failure.
pub fn compute_wire_delays(
    topo_order: &[NodeId],
    wires: &[Wire],
    total_ticks: u32,
) -> WireDelayAnalysis {
    let node_depths = forward_depths(topo_order, wires);

    let has_outgoing: Set<&NodeId> = wires.iter().map(|w| &w.source.node_id).collect();
    let terminals: Vec<NodeId> = topo_order
        .iter()
        .filter(|id| !has_outgoing.contains(id))
        .cloned()
        .collect();

    if terminals.is_empty() || node_depths.values().all(|&d| d == 0) {
        // No terminals, or every node at depth zero: treat the whole graph
        // as one subgraph distributed by depth; isolated wires get the full
        // budget.
        return distribute_subgraph(&node_depths, wires, total_ticks, total_ticks);
    }

    let reachable = output_reachable_set(&terminals, wires);
    let output_max_depth = reachable
        .iter()
        .map(|id| node_depths.get(id).copied().unwrap_or(0))
        .max()
        .unwrap_or(0);

    let mut result = distribute_subgraph(
        &node_depths,
        &wires
            .iter()
            .filter(|w| reachable.contains(&w.source.node_id) && reachable.contains(&w.target.node_id))
            .cloned()
            .collect::<Vec<_>>(),
        total_ticks,
        output_max_depth.max(1),
    );

    // Dead-end subgraphs: wires whose target is not output-reachable. Locate
    // each dead-end component's entry node (nearest output-reachable
    // ancestor already has an arrival time) and recurse locally with budget
    // `total_ticks - arrival(entry)`.
    let dead_end_wires: Vec<&Wire> = wires
        .iter()
        .filter(|w| !(reachable.contains(&w.source.node_id) && reachable.contains(&w.target.node_id)))
        .collect();

    if !dead_end_wires.is_empty() {
        let arrival = arrival_times(&node_depths, &reachable, total_ticks, output_max_depth.max(1));
        // Group dead-end wires by their entry point: the nearest
        // output-reachable ancestor's arrival time, found by walking forward
        // from any output-reachable source.
        for wire in &dead_end_wires {
            let entry_arrival = if reachable.contains(&wire.source.node_id) {
                arrival.get(&wire.source.node_id).copied().unwrap_or(0)
            } else {
                0
            };
            let budget = total_ticks.saturating_sub(entry_arrival);
            let local_depths = forward_depths(topo_order, &dead_end_wires.iter().map(|w| (*w).clone()).collect::<Vec<_>>());
            let local_max_depth = local_depths.values().copied().max().unwrap_or(1).max(1);
            let delay = delay_for_wire(wire, &local_depths, budget.max(local_max_depth), local_max_depth, entry_arrival);
            result.wire_delays.insert(wire.id.clone(), delay);
        }
    }

    result.node_depths = node_depths;
    result.output_max_depth = output_max_depth;
    result
}

fn arrival_times(
    node_depths: &Map<NodeId, u32>,
    reachable: &Set<NodeId>,
    total_ticks: u32,
    output_max_depth: u32,
) -> Map<NodeId, u32> {
    let mut arrival = Map::new();
    for (id, &depth) in node_depths {
        if reachable.contains(id) {
            let a = if output_max_depth == 0 {
                total_ticks
            } else {
                ((depth as u64) * (total_ticks as u64) / (output_max_depth as u64)) as u32
            };
            arrival.insert(id.clone(), a);
        }
    }
    arrival
}

fn delay_for_wire(
    wire: &Wire,
    local_depths: &Map<NodeId, u32>,
    budget: u32,
    local_max_depth: u32,
    entry_arrival: u32,
) -> u32 {
    let arrival_of = |id: &NodeId| -> u32 {
        let depth = local_depths.get(id).copied().unwrap_or(0);
        let local = if local_max_depth == 0 {
            budget
        } else {
            ((depth as u64) * (budget as u64) / (local_max_depth as u64)) as u32
        };
        entry_arrival + local
    };
    let source_arrival = arrival_of(&wire.source.node_id);
    let target_arrival = arrival_of(&wire.target.node_id);
    target_arrival.saturating_sub(source_arrival).max(1)
}

/// Distributes `total_ticks` over one connected subgraph using arrival-time
/// differences. `wires_in_scope` restricts which wires get an assigned
/// delay in this call.
fn distribute_subgraph(
    node_depths: &Map<NodeId, u32>,
    wires_in_scope: &[Wire],
    total_ticks: u32,
    output_max_depth: u32,
) -> WireDelayAnalysis {
    let arrival = |id: &NodeId| -> u32 {
        let depth = node_depths.get(id).copied().unwrap_or(0);
        if output_max_depth == 0 {
            total_ticks
        } else {
            ((depth as u64) * (total_ticks as u64) / (output_max_depth as u64)) as u32
        }
    };

    let mut wire_delays = Map::new();
    for wire in wires_in_scope {
        let source_arrival = arrival(&wire.source.node_id);
        let target_arrival = arrival(&wire.target.node_id);
        let delay = target_arrival.saturating_sub(source_arrival).max(1);
        wire_delays.insert(wire.id.clone(), delay);
    }

    WireDelayAnalysis {
        wire_delays,
        node_depths: node_depths.clone(),
        output_max_depth,
    }
}
