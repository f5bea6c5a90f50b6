//! Cycle evaluator: batch evaluator with no wire-delay model — each
//! cycle is a full, instantaneous settling of the graph. Designed for
//! seamless-loop output generation.
//!
//! Separates mutation-time graph construction from an execution-time
//! snapshot: `CycleEvaluator::new` compiles the graph once, and
//! `run_all_cycles` walks processing order once per cycle. The two-pass
//! warm-up is a plain "run once with recording off, then again with
//! recording on" loop.

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;
#[cfg(not(feature = "std"))]
use alloc::collections::{BTreeMap as Map, BTreeSet as Set};
#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::collections::{HashMap as Map, HashSet as Set};

use crate::baker::{reconstruct_from_metadata, BakedGraph, BakedMetadata};
use crate::delay::OutputMapping;
use crate::graph::{Node, PortConstant, PortRef, Wire};
use crate::ids::{CpKind, NodeId};
use crate::liveness::compute_live_nodes;
use crate::registry::{NodeEvaluator, NodeOutputs, NodeRegistry, NodeState};
use crate::signal::Signal;
use crate::sort::topological_sort_with_depths;

/// Reason a cycle-evaluator setup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvalError {
    /// The signal-only DAG (parameter wires removed) contains a cycle.
    CycleDetected {
        /// A concrete cycle path.
        cycle_path: Vec<NodeId>,
    },
}

impl core::fmt::Display for CycleEvalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CycleEvalError::CycleDetected { cycle_path } => {
                write!(f, "signal-wire cycle detected: ")?;
                for (i, id) in cycle_path.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{id}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CycleEvalError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamWireKind {
    SameCycle,
    CrossCycle,
}

enum PortFeed {
    None,
    Signal { source: NodeId, port: usize },
    Param { source: NodeId, port: usize, wire_id: String, kind: ParamWireKind },
}

struct ResolvedCycleNode {
    id: NodeId,
    snapshot: Node,
    evaluator: Option<NodeEvaluator>,
    custom_subgraph: Option<BakedGraph>,
    state: Option<Box<dyn NodeState + Send>>,
    feeds: Vec<PortFeed>,
}

/// Recorded results of running every cycle. Traces are populated only for the recording pass.
#[derive(Debug, Clone, Default)]
pub struct CycleResults {
    /// Output connection-point vector, one per cycle.
    pub outputs: Vec<Vec<Signal>>,
    /// Creative-slot output vector (length 6, sparse), one per cycle.
    pub creative_outputs: Vec<Vec<Signal>>,
    /// Utility-slot output vector (length 6, sparse), one per cycle.
    pub utility_outputs: Vec<Vec<Signal>>,
    /// Per-node output vectors, one entry per cycle, keyed by node id.
    pub node_traces: Map<NodeId, Vec<NodeOutputs>>,
    /// Per-wire delivered value, one entry per cycle, keyed by wire id.
    pub wire_traces: Map<String, Vec<Signal>>,
}

/// Compiled, execution-time snapshot for batch cycle evaluation. Built once
/// via [`CycleEvaluator::new`]; `run_all_cycles` may be called more than
/// once on the same evaluator, each call starting fresh carried state.
pub struct CycleEvaluator {
    input_count: usize,
    processing_order: Vec<NodeId>,
    live: Set<NodeId>,
    resolved: Vec<ResolvedCycleNode>,
    signal_wires: Vec<Wire>,
    param_wires: Vec<Wire>,
    param_wire_kind: Map<String, ParamWireKind>,
    output_mappings: Map<u32, OutputMapping>,
    creative_output_mappings: Map<u32, OutputMapping>,
    utility_output_mappings: Map<u32, OutputMapping>,
    output_count: usize,
}

fn is_parameter_wire(wire: &Wire, nodes: &Map<NodeId, Node>, registry: &NodeRegistry) -> bool {
    nodes
        .get(&wire.target.node_id)
        .and_then(|n| registry.get(&n.node_type))
        .and_then(|d| d.knob_at(wire.target.port_index))
        .is_some()
}

fn resolve_output_mapping(wires: &[Wire], target: &NodeId) -> OutputMapping {
    match wires.iter().find(|w| &w.target.node_id == target) {
        None => OutputMapping::None,
        Some(w) => match w.source.node_id.reserved_kind() {
            Some(CpKind::Input(cp_index)) => OutputMapping::DirectFromInputCp { cp_index },
            _ => OutputMapping::Node {
                source_node_id: w.source.node_id.clone(),
                source_port: w.source.port_index,
            },
        },
    }
}

impl CycleEvaluator {
    /// Compiles `nodes`/`wires` into a cycle-evaluator snapshot. Parameter
    /// wires (targeting a knob-bound port) are stripped from the signal DAG
    /// before sorting; a cycle in the remainder is the only setup failure.
    pub fn new(
        nodes: &Map<NodeId, Node>,
        wires: &[Wire],
        registry: &NodeRegistry,
        custom_subgraph_metadata: Option<&Map<String, BakedMetadata>>,
    ) -> Result<Self, CycleEvalError> {
        let mut signal_wires = Vec::new();
        let mut param_wires = Vec::new();
        for wire in wires {
            if is_parameter_wire(wire, nodes, registry) {
                param_wires.push(wire.clone());
            } else {
                signal_wires.push(wire.clone());
            }
        }

        let node_ids: Vec<NodeId> = nodes.keys().cloned().collect();
        let topo = topological_sort_with_depths(&node_ids, &signal_wires)
            .map_err(|e| CycleEvalError::CycleDetected { cycle_path: e.cycle_path })?;

        // Sort by depth (stable) so any node feeding a same-cycle parameter
        // wire is guaranteed to have already been evaluated this cycle by
        // the time its dependent is reached.
        let mut processing_order: Vec<NodeId> = topo
            .order
            .iter()
            .filter(|id| id.reserved_kind().is_none())
            .cloned()
            .collect();
        processing_order.sort_by_key(|id| topo.depths.get(id).copied().unwrap_or(0));

        let mut param_wire_kind = Map::new();
        for wire in &param_wires {
            let source_depth = topo.depths.get(&wire.source.node_id).copied().unwrap_or(0);
            let target_depth = topo.depths.get(&wire.target.node_id).copied().unwrap_or(0);
            let kind = if source_depth < target_depth {
                ParamWireKind::SameCycle
            } else {
                ParamWireKind::CrossCycle
            };
            param_wire_kind.insert(wire.id.clone(), kind);
        }

        let source_ids: Vec<NodeId> = nodes
            .keys()
            .filter(|id| match id.reserved_kind() {
                Some(CpKind::Input(_)) => true,
                Some(CpKind::Creative(_)) | Some(CpKind::Utility(_)) => nodes
                    .get(id)
                    .map(|n| n.node_type == "connection-input")
                    .unwrap_or(false),
                _ => false,
            })
            .cloned()
            .collect();
        let live = compute_live_nodes(&signal_wires, &source_ids);

        let input_count = nodes
            .keys()
            .filter_map(|id| match id.reserved_kind() {
                Some(CpKind::Input(i)) => Some(i + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0) as usize;
        let output_count = nodes
            .keys()
            .filter_map(|id| match id.reserved_kind() {
                Some(CpKind::Output(i)) => Some(i + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0) as usize;

        let mut output_mappings = Map::new();
        for i in 0..output_count as u32 {
            output_mappings.insert(i, resolve_output_mapping(&signal_wires, &NodeId::cp_output(i)));
        }
        let mut creative_output_mappings = Map::new();
        let mut utility_output_mappings = Map::new();
        for slot in 0..6u32 {
            let creative_id = NodeId::cp_creative(slot);
            if nodes.get(&creative_id).map(|n| n.node_type == "connection-output").unwrap_or(false) {
                creative_output_mappings.insert(slot, resolve_output_mapping(&signal_wires, &creative_id));
            }
            let utility_id = NodeId::cp_utility(slot);
            if nodes.get(&utility_id).map(|n| n.node_type == "connection-output").unwrap_or(false) {
                utility_output_mappings.insert(slot, resolve_output_mapping(&signal_wires, &utility_id));
            }
        }

        let mut resolved = Vec::with_capacity(processing_order.len());
        for id in &processing_order {
            let Some(node) = nodes.get(id).cloned() else { continue };
            let descriptor = registry.get(&node.node_type);
            let custom_subgraph = if descriptor.is_none() {
                custom_subgraph_metadata
                    .and_then(|m| m.get(&node.node_type))
                    .and_then(|metadata| reconstruct_from_metadata(metadata, registry).ok())
                    .map(|result| result.graph)
            } else {
                None
            };
            let state = descriptor.and_then(|d| d.create_state).map(|factory| factory());

            let mut feeds = Vec::with_capacity(node.input_count);
            for port_index in 0..node.input_count {
                let param_feed = param_wires
                    .iter()
                    .find(|w| w.target.node_id == *id && w.target.port_index == port_index)
                    .map(|w| PortFeed::Param {
                        source: w.source.node_id.clone(),
                        port: w.source.port_index,
                        wire_id: w.id.clone(),
                        kind: param_wire_kind.get(&w.id).copied().unwrap_or(ParamWireKind::CrossCycle),
                    });
                let feed = param_feed.unwrap_or_else(|| {
                    signal_wires
                        .iter()
                        .find(|w| w.target.node_id == *id && w.target.port_index == port_index)
                        .map(|w| PortFeed::Signal {
                            source: w.source.node_id.clone(),
                            port: w.source.port_index,
                        })
                        .unwrap_or(PortFeed::None)
                });
                feeds.push(feed);
            }

            resolved.push(ResolvedCycleNode {
                id: id.clone(),
                snapshot: node,
                evaluator: descriptor.map(|d| d.evaluate),
                custom_subgraph,
                state,
                feeds,
            });
        }

        Ok(CycleEvaluator {
            input_count,
            processing_order,
            live,
            resolved,
            signal_wires,
            param_wires,
            param_wire_kind,
            output_mappings,
            creative_output_mappings,
            utility_output_mappings,
            output_count,
        })
    }

    fn port_constant_of(port_constants: &PortConstant, id: &NodeId, port: usize) -> Signal {
        port_constants
            .get(&PortRef::new(id.clone(), port).key())
            .copied()
            .map(Signal::new)
            .unwrap_or(Signal::ZERO)
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_one_cycle(
        &mut self,
        cycle_inputs: &[Signal],
        port_constants: &PortConstant,
        cross_cycle: &mut Map<String, Signal>,
        is_very_first_cycle: bool,
        recording: bool,
        results: &mut CycleResults,
    ) -> Vec<Signal> {
        let mut current: Map<NodeId, NodeOutputs> = Map::new();
        for i in 0..self.input_count as u32 {
            let value = cycle_inputs.get(i as usize).copied().unwrap_or(Signal::ZERO);
            current.insert(NodeId::cp_input(i), vec![value]);
        }

        for i in 0..self.resolved.len() {
            let id = self.resolved[i].id.clone();
            if !self.live.contains(&id) {
                let zero = vec![Signal::ZERO; self.resolved[i].snapshot.output_count];
                current.insert(id, zero);
                continue;
            }

            let mut inputs = Vec::with_capacity(self.resolved[i].feeds.len());
            for feed in &self.resolved[i].feeds {
                let value = match feed {
                    PortFeed::None => Self::port_constant_of(port_constants, &id, inputs.len()),
                    PortFeed::Signal { source, port } => current
                        .get(source)
                        .and_then(|o| o.get(*port))
                        .copied()
                        .unwrap_or(Signal::ZERO),
                    PortFeed::Param { source, port, wire_id, kind } => match kind {
                        ParamWireKind::SameCycle => current
                            .get(source)
                            .and_then(|o| o.get(*port))
                            .copied()
                            .unwrap_or(Signal::ZERO),
                        ParamWireKind::CrossCycle => cross_cycle.get(wire_id).copied().unwrap_or_else(|| {
                            if is_very_first_cycle {
                                Self::port_constant_of(port_constants, &id, inputs.len())
                            } else {
                                Signal::ZERO
                            }
                        }),
                    },
                };
                inputs.push(value);
            }

            let slot = &mut self.resolved[i];
            let outputs = if let Some(eval) = slot.evaluator {
                let snapshot = slot.snapshot.clone();
                let state = slot.state.as_deref_mut().map(|s| s as &mut dyn NodeState);
                (eval)(&inputs, &snapshot, state, 0)
            } else if let Some(subgraph) = slot.custom_subgraph.as_mut() {
                subgraph.evaluate(&inputs)
            } else {
                #[cfg(feature = "tracing")]
                tracing::debug!(node = %slot.id, "unknown node type during cycle eval, emitting zeros");
                vec![Signal::ZERO; slot.snapshot.output_count]
            };

            if recording {
                results
                    .node_traces
                    .entry(id.clone())
                    .or_default()
                    .push(outputs.clone());
            }
            current.insert(id, outputs);
        }

        for wire in &self.param_wires {
            if self.param_wire_kind.get(&wire.id) == Some(&ParamWireKind::CrossCycle) {
                let value = current
                    .get(&wire.source.node_id)
                    .and_then(|o| o.get(wire.source.port_index))
                    .copied()
                    .unwrap_or(Signal::ZERO);
                cross_cycle.insert(wire.id.clone(), value);
            }
        }

        if recording {
            for wire in self.signal_wires.iter().chain(self.param_wires.iter()) {
                let value = current
                    .get(&wire.source.node_id)
                    .and_then(|o| o.get(wire.source.port_index))
                    .copied()
                    .unwrap_or(Signal::ZERO);
                results.wire_traces.entry(wire.id.clone()).or_default().push(value);
            }
        }

        let read_mapping = |mapping: Option<&OutputMapping>, current: &Map<NodeId, NodeOutputs>| -> Signal {
            match mapping {
                Some(OutputMapping::Node { source_node_id, source_port }) => current
                    .get(source_node_id)
                    .and_then(|o| o.get(*source_port))
                    .copied()
                    .unwrap_or(Signal::ZERO),
                Some(OutputMapping::DirectFromInputCp { cp_index }) => current
                    .get(&NodeId::cp_input(*cp_index))
                    .and_then(|o| o.first())
                    .copied()
                    .unwrap_or(Signal::ZERO),
                _ => Signal::ZERO,
            }
        };

        let result: Vec<Signal> = (0..self.output_count as u32)
            .map(|i| read_mapping(self.output_mappings.get(&i), &current))
            .collect();

        if recording {
            let creative: Vec<Signal> = (0..6u32)
                .map(|i| read_mapping(self.creative_output_mappings.get(&i), &current))
                .collect();
            let utility: Vec<Signal> = (0..6u32)
                .map(|i| read_mapping(self.utility_output_mappings.get(&i), &current))
                .collect();
            results.outputs.push(result.clone());
            results.creative_outputs.push(creative);
            results.utility_outputs.push(utility);
        }

        result
    }

    /// Runs `cycle_count` cycles twice: once with recording disabled to
    /// establish steady state (cross-cycle store, Memory-style per-node
    /// state), then again with recording enabled. `input_generator(cycle_index)` supplies each cycle's input
    /// CP values.
    pub fn run_all_cycles(
        &mut self,
        port_constants: &PortConstant,
        mut input_generator: impl FnMut(u32) -> Vec<Signal>,
        cycle_count: u32,
    ) -> CycleResults {
        let mut cross_cycle: Map<String, Signal> = Map::new();
        let mut discard = CycleResults::default();
        for cycle in 0..cycle_count {
            let inputs = input_generator(cycle);
            self.evaluate_one_cycle(&inputs, port_constants, &mut cross_cycle, cycle == 0, false, &mut discard);
        }

        let mut results = CycleResults::default();
        for cycle in 0..cycle_count {
            let inputs = input_generator(cycle);
            self.evaluate_one_cycle(&inputs, port_constants, &mut cross_cycle, false, true, &mut results);
        }
        results
    }
}

/// Compiles and runs `nodes`/`wires` for `cycle_count` cycles in one call —
/// the free-function form of [`CycleEvaluator::new`] + `run_all_cycles`
///.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_all_cycles(
    nodes: &Map<NodeId, Node>,
    wires: &[Wire],
    registry: &NodeRegistry,
    port_constants: &PortConstant,
    input_generator: impl FnMut(u32) -> Vec<Signal>,
    cycle_count: u32,
    custom_subgraph_metadata: Option<&Map<String, BakedMetadata>>,
) -> Result<CycleResults, CycleEvalError> {
    let mut evaluator = CycleEvaluator::new(nodes, wires, registry, custom_subgraph_metadata)?;
    Ok(evaluator.run_all_cycles(port_constants, input_generator, cycle_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PortRef;

    fn w(id: &str, from: &str, from_port: usize, to: &str, to_port: usize) -> Wire {
        Wire::new(id, PortRef::new(from, from_port), PortRef::new(to, to_port))
    }

    #[test]
    fn pass_through_reads_current_cycle_input() {
        let mut nodes = Map::new();
        nodes.insert(NodeId::cp_input(0), Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
        nodes.insert(NodeId::cp_output(0), Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
        let wires = vec![w("w0", "__cp_input_0__", 0, "__cp_output_0__", 0)];
        let registry = NodeRegistry::new();
        let constants = PortConstant::new();
        let results =
            evaluate_all_cycles(&nodes, &wires, &registry, &constants, |_| vec![Signal::new(75.0)], 1, None)
                .unwrap();
        assert_eq!(results.outputs[0][0].value(), 75.0);
    }

    #[test]
    fn inverter_chain_settles_immediately() {
        let mut nodes = Map::new();
        nodes.insert(NodeId::cp_input(0), Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
        nodes.insert(NodeId::new("inv"), Node::new("inv", "inverter").with_ports(1, 1));
        nodes.insert(NodeId::cp_output(0), Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
        let wires = vec![
            w("w0", "__cp_input_0__", 0, "inv", 0),
            w("w1", "inv", 0, "__cp_output_0__", 0),
        ];
        let registry = NodeRegistry::new();
        let constants = PortConstant::new();
        let results =
            evaluate_all_cycles(&nodes, &wires, &registry, &constants, |_| vec![Signal::new(60.0)], 3, None)
                .unwrap();
        for out in &results.outputs {
            assert_eq!(out[0].value(), -60.0);
        }
    }

    #[test]
    fn adder_clamps_overflow() {
        let mut nodes = Map::new();
        nodes.insert(NodeId::cp_input(0), Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
        nodes.insert(NodeId::cp_input(1), Node::new(NodeId::cp_input(1), "cp").with_ports(0, 1));
        nodes.insert(NodeId::new("add"), Node::new("add", "shifter").with_ports(2, 1));
        nodes.insert(NodeId::cp_output(0), Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
        let wires = vec![
            w("w0", "__cp_input_0__", 0, "add", 0),
            w("w1", "__cp_input_1__", 0, "add", 1),
            w("w2", "add", 0, "__cp_output_0__", 0),
        ];
        let registry = NodeRegistry::new();
        let constants = PortConstant::new();
        let results = evaluate_all_cycles(
            &nodes,
            &wires,
            &registry,
            &constants,
            |_| vec![Signal::new(80.0), Signal::new(80.0)],
            1,
            None,
        )
        .unwrap();
        assert_eq!(results.outputs[0][0].value(), 100.0);
    }

    #[test]
    fn disconnected_node_is_dead_and_emits_zero() {
        let mut nodes = Map::new();
        nodes.insert(NodeId::cp_input(0), Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
        nodes.insert(NodeId::new("orphan"), Node::new("orphan", "inverter").with_ports(1, 1));
        let registry = NodeRegistry::new();
        let constants = PortConstant::new();
        let results = evaluate_all_cycles(
            &nodes,
            &[],
            &registry,
            &constants,
            |_| vec![Signal::new(10.0)],
            2,
            None,
        )
        .unwrap();
        for trace in results.node_traces.get(&NodeId::new("orphan")).unwrap() {
            assert_eq!(trace[0].value(), 0.0);
        }
    }

    #[test]
    fn memory_seamless_loop_holds_constant() {
        let mut nodes = Map::new();
        nodes.insert(NodeId::cp_input(0), Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
        nodes.insert(NodeId::new("mem"), Node::new("mem", "memory").with_ports(1, 1));
        nodes.insert(NodeId::cp_output(0), Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
        let wires = vec![
            w("w0", "__cp_input_0__", 0, "mem", 0),
            w("w1", "mem", 0, "__cp_output_0__", 0),
        ];
        let registry = NodeRegistry::new();
        let constants = PortConstant::new();
        let results =
            evaluate_all_cycles(&nodes, &wires, &registry, &constants, |_| vec![Signal::new(42.0)], 8, None)
                .unwrap();
        for out in &results.outputs {
            assert_eq!(out[0].value(), 42.0);
        }
    }

    #[test]
    fn unconnected_port_reads_port_constant() {
        let mut nodes = Map::new();
        nodes.insert(NodeId::new("add"), Node::new("add", "shifter").with_ports(2, 1));
        nodes.insert(NodeId::cp_output(0), Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
        let wires = vec![w("w0", "add", 0, "__cp_output_0__", 0)];
        let registry = NodeRegistry::new();
        let mut constants = PortConstant::new();
        constants.insert(PortRef::new("add", 1).key(), 25.0);
        let results =
            evaluate_all_cycles(&nodes, &wires, &registry, &constants, |_| Vec::new(), 1, None).unwrap();
        assert_eq!(results.outputs[0][0].value(), 25.0);
    }
}
