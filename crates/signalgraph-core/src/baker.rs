//! Baker: lowers a mutable graph into a self-contained, re-entrancy-hostile
//! tick closure plus serializable metadata for nesting inside a larger bake.
//!
//! Compiling proceeds in stages: classify bidirectional connection points,
//! topo-sort, distribute wire delays, resolve per-port sources and
//! ring-buffer offsets, then assemble an owned [`BakedGraph`] whose
//! `evaluate` method is the only mutation surface. The metadata half of the
//! result is a plain serializable record that [`reconstruct_from_metadata`]
//! can turn back into an equivalent bake.

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;
#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap as Map;
#[cfg(not(feature = "std"))]
use alloc::string::String;
#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::collections::HashMap as Map;

use crate::delay::{analyze_delays, OutputMapping, PortSource};
use crate::graph::{Node, ParamValue, Wire};
use crate::ids::{CpKind, NodeId};
use crate::registry::{NodeEvaluator, NodeOutputs, NodeRegistry, NodeState};
use crate::ringbuffer::RingBuffer;
use crate::signal::{Signal, TOTAL_TICKS};
use crate::sort::topological_sort;
use crate::wire_delay::compute_wire_delays;

/// Reason a bake failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BakeError {
    /// The signal-wire graph contains a cycle.
    CycleDetected {
        /// A concrete cycle path.
        cycle_path: Vec<NodeId>,
    },
    /// A bidirectional connection point has both incoming and outgoing wires.
    BidirectionalConflict {
        /// The slot index (0..6) in conflict.
        slot: u32,
    },
}

impl core::fmt::Display for BakeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BakeError::CycleDetected { cycle_path } => {
                write!(f, "cycle detected during bake: ")?;
                for (i, id) in cycle_path.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{id}")?;
                }
                Ok(())
            }
            BakeError::BidirectionalConflict { slot } => {
                write!(f, "bidirectional connection point {slot} has both incoming and outgoing wires")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BakeError {}

/// Direction a bidirectional connection point settled into during
/// normalization, recorded in metadata so a reconstruction can report the
/// same six-slot map the editor showed the author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidirDirection {
    /// Settled as an input connection point (outgoing wires only).
    Input,
    /// Settled as an output connection point (incoming wires only).
    Output,
    /// Had no wires at all; dropped.
    Off,
}

/// Serializable per-node config, the node-shaped half of [`BakedMetadata`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// The node's id (post bidirectional-CP normalization).
    pub id: NodeId,
    /// Registry key or baked-subgraph type string.
    pub node_type: String,
    /// Author-set parameters.
    pub params: Map<String, ParamValue>,
    /// Input port count.
    pub input_count: usize,
    /// Output port count.
    pub output_count: usize,
}

/// Serializable per-edge config, the wire-shaped half of [`BakedMetadata`].
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeConfig {
    /// Source node id.
    pub from_node: NodeId,
    /// Source port index.
    pub from_port: usize,
    /// Target node id.
    pub to_node: NodeId,
    /// Target port index.
    pub to_port: usize,
    /// Assigned wire delay, if any.
    pub wire_delay: Option<u32>,
}

/// Serializable record a bake produces: enough to reconstruct an equivalent
/// closure, or to nest this bake as a custom sub-graph node type elsewhere
/// ("Baked metadata").
#[derive(Debug, Clone, PartialEq)]
pub struct BakedMetadata {
    /// Topological order over every node, connection points included.
    pub topo_order: Vec<NodeId>,
    /// One entry per node in `topo_order`.
    pub node_configs: Vec<NodeConfig>,
    /// One entry per wire.
    pub edges: Vec<EdgeConfig>,
    /// Number of input connection points.
    pub input_count: usize,
    /// Number of output connection points.
    pub output_count: usize,
    /// Per-input-CP ring-buffer size, indexed by cp_index.
    pub input_buffer_sizes: Vec<u32>,
    /// Direction each of the six bidirectional slots settled into.
    pub bidir_directions: [BidirDirection; 6],
}

/// The pair a successful bake produces.
pub struct BakeResult {
    /// The owned, stateful tick closure.
    pub graph: BakedGraph,
    /// The serializable record describing it.
    pub metadata: BakedMetadata,
}

impl core::fmt::Debug for BakeResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BakeResult")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

struct ResolvedNode {
    id: NodeId,
    snapshot: Node,
    evaluator: Option<NodeEvaluator>,
    state: Option<Box<dyn NodeState + Send>>,
    input_sources: Vec<PortSource>,
}

/// A baked, owned tick closure. Not
/// `Clone`: ring buffers, per-node state, and the tick counter are
/// per-bake-instance mutable state. Must be driven single-threaded.
pub struct BakedGraph {
    ring_buffers: Map<u32, RingBuffer>,
    resolved: Vec<ResolvedNode>,
    node_slot: Map<NodeId, usize>,
    scratch_outputs: Vec<NodeOutputs>,
    output_mappings: Map<u32, OutputMapping>,
    input_count: usize,
    output_count: usize,
    tick: u64,
    metadata: BakedMetadata,
}

impl BakedGraph {
    /// Advances the graph by one tick. `inputs[i]` feeds input CP `i`;
    /// missing entries are treated as zero. Returns exactly `output_count`
    /// values, one per output CP.
    pub fn evaluate(&mut self, inputs: &[Signal]) -> Vec<Signal> {
        for cp_index in 0..self.input_count as u32 {
            let value = inputs.get(cp_index as usize).copied().unwrap_or(Signal::ZERO);
            if let Some(rb) = self.ring_buffers.get_mut(&cp_index) {
                rb.write_advance(value);
            }
        }

        for i in 0..self.resolved.len() {
            let node_inputs: Vec<Signal> = self.resolved[i]
                .input_sources
                .iter()
                .map(|source| self.read_source(source))
                .collect();

            let slot = &mut self.resolved[i];
            let outputs = match slot.evaluator {
                Some(eval) => {
                    let snapshot = slot.snapshot.clone();
                    let state = slot.state.as_deref_mut().map(|s| s as &mut dyn NodeState);
                    (eval)(&node_inputs, &snapshot, state, self.tick)
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(node = %slot.id, "unknown node type during bake evaluate, emitting zeros");
                    vec![Signal::ZERO; slot.snapshot.output_count]
                }
            };
            self.scratch_outputs[i] = outputs;
        }

        let mut result = Vec::with_capacity(self.output_count);
        for i in 0..self.output_count as u32 {
            let value = match self.output_mappings.get(&i) {
                Some(OutputMapping::Node { source_node_id, source_port }) => self
                    .node_slot
                    .get(source_node_id)
                    .and_then(|&slot| self.scratch_outputs[slot].get(*source_port).copied())
                    .unwrap_or(Signal::ZERO),
                Some(OutputMapping::DirectFromInputCp { cp_index }) => self
                    .ring_buffers
                    .get(cp_index)
                    .map(|rb| rb.read_offset(0))
                    .unwrap_or(Signal::ZERO),
                _ => Signal::ZERO,
            };
            result.push(value);
        }

        self.tick += 1;
        result
    }

    fn read_source(&self, source: &PortSource) -> Signal {
        match source {
            PortSource::None => Signal::ZERO,
            PortSource::Cp { cp_index, buffer_offset } => self
                .ring_buffers
                .get(cp_index)
                .map(|rb| rb.read_offset(*buffer_offset))
                .unwrap_or(Signal::ZERO),
            PortSource::Node { source_node_id, source_port } => self
                .node_slot
                .get(source_node_id)
                .and_then(|&slot| self.scratch_outputs[slot].get(*source_port).copied())
                .unwrap_or(Signal::ZERO),
        }
    }

    /// The monotonic tick counter advanced by each `evaluate` call.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// A copy of this bake's serializable metadata.
    pub fn to_metadata(&self) -> BakedMetadata {
        self.metadata.clone()
    }
}

fn classify_bidir(
    nodes: &Map<NodeId, Node>,
    wires: &[Wire],
) -> Result<(Map<NodeId, Node>, Vec<Wire>, [BidirDirection; 6]), BakeError> {
    let mut working_nodes = nodes.clone();
    let mut working_wires = wires.to_vec();
    let mut directions = [BidirDirection::Off; 6];

    let mut next_input_index = nodes
        .keys()
        .filter_map(|id| match id.reserved_kind() {
            Some(CpKind::Input(i)) => Some(i + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    let mut next_output_index = nodes
        .keys()
        .filter_map(|id| match id.reserved_kind() {
            Some(CpKind::Output(i)) => Some(i + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    for slot in 0..6u32 {
        let bidir_id = NodeId::cp_bidir(slot);
        let Some(node) = working_nodes.get(&bidir_id).cloned() else {
            continue;
        };

        let has_outgoing = working_wires.iter().any(|w| w.source.node_id == bidir_id);
        let has_incoming = working_wires.iter().any(|w| w.target.node_id == bidir_id);

        match (has_outgoing, has_incoming) {
            (true, true) => return Err(BakeError::BidirectionalConflict { slot }),
            (true, false) => {
                let new_id = NodeId::cp_input(next_input_index);
                next_input_index += 1;
                working_nodes.remove(&bidir_id);
                for wire in working_wires.iter_mut() {
                    if wire.source.node_id == bidir_id {
                        wire.source.node_id = new_id.clone();
                    }
                }
                let mut node = node;
                node.id = new_id.clone();
                working_nodes.insert(new_id, node);
                directions[slot as usize] = BidirDirection::Input;
            }
            (false, true) => {
                let new_id = NodeId::cp_output(next_output_index);
                next_output_index += 1;
                working_nodes.remove(&bidir_id);
                for wire in working_wires.iter_mut() {
                    if wire.target.node_id == bidir_id {
                        wire.target.node_id = new_id.clone();
                    }
                }
                let mut node = node;
                node.id = new_id.clone();
                working_nodes.insert(new_id, node);
                directions[slot as usize] = BidirDirection::Output;
            }
            (false, false) => {
                working_nodes.remove(&bidir_id);
                directions[slot as usize] = BidirDirection::Off;
            }
        }
    }

    Ok((working_nodes, working_wires, directions))
}

/// Bakes `nodes`/`wires` into a tick closure plus metadata, resolving node
/// evaluators against `registry`. Unknown node types are not a bake failure
/// (`UnknownNodeType` is recovered at evaluate time, per node).
pub fn bake_graph(
    nodes: &Map<NodeId, Node>,
    wires: &[Wire],
    registry: &NodeRegistry,
) -> Result<BakeResult, BakeError> {
    let (nodes, wires, bidir_directions) = classify_bidir(nodes, wires)?;

    let node_ids: Vec<NodeId> = nodes.keys().cloned().collect();
    let topo_order = topological_sort(&node_ids, &wires)
        .map_err(|e| BakeError::CycleDetected { cycle_path: e.cycle_path })?;

    let wire_delay_analysis = compute_wire_delays(&topo_order, &wires, TOTAL_TICKS);
    let delay_analysis = analyze_delays(&topo_order, &nodes, &wires, Some(&wire_delay_analysis.wire_delays));

    let mut ring_buffers = Map::new();
    for i in 0..delay_analysis.input_count as u32 {
        let size = delay_analysis.input_buffer_sizes.get(&i).copied().unwrap_or(1).max(1);
        ring_buffers.insert(i, RingBuffer::new(size as usize));
    }

    let mut resolved = Vec::with_capacity(delay_analysis.processing_order.len());
    let mut node_slot = Map::new();
    for (slot, id) in delay_analysis.processing_order.iter().enumerate() {
        let Some(node) = nodes.get(id).cloned() else { continue };
        let descriptor = registry.get(&node.node_type);
        let input_sources: Vec<PortSource> = (0..node.input_count)
            .map(|port_index| {
                let key = crate::graph::PortRef::new(id.clone(), port_index).key();
                delay_analysis
                    .port_sources
                    .get(&key)
                    .cloned()
                    .unwrap_or(PortSource::None)
            })
            .collect();
        let state = descriptor.and_then(|d| d.create_state).map(|factory| factory());
        node_slot.insert(id.clone(), slot);
        resolved.push(ResolvedNode {
            id: id.clone(),
            snapshot: node,
            evaluator: descriptor.map(|d| d.evaluate),
            state,
            input_sources,
        });
    }
    let scratch_outputs = vec![NodeOutputs::new(); resolved.len()];

    let node_configs: Vec<NodeConfig> = topo_order
        .iter()
        .filter_map(|id| nodes.get(id).map(|n| NodeConfig {
            id: id.clone(),
            node_type: n.node_type.clone(),
            params: n.params.clone(),
            input_count: n.input_count,
            output_count: n.output_count,
        }))
        .collect();
    let edges: Vec<EdgeConfig> = wires
        .iter()
        .map(|w| EdgeConfig {
            from_node: w.source.node_id.clone(),
            from_port: w.source.port_index,
            to_node: w.target.node_id.clone(),
            to_port: w.target.port_index,
            wire_delay: wire_delay_analysis.wire_delays.get(&w.id).copied(),
        })
        .collect();
    let input_buffer_sizes: Vec<u32> = (0..delay_analysis.input_count as u32)
        .map(|i| delay_analysis.input_buffer_sizes.get(&i).copied().unwrap_or(1).max(1))
        .collect();

    let metadata = BakedMetadata {
        topo_order: topo_order.clone(),
        node_configs,
        edges,
        input_count: delay_analysis.input_count,
        output_count: delay_analysis.output_count,
        input_buffer_sizes,
        bidir_directions,
    };

    let graph = BakedGraph {
        ring_buffers,
        resolved,
        node_slot,
        scratch_outputs,
        output_mappings: delay_analysis.output_mappings,
        input_count: delay_analysis.input_count,
        output_count: delay_analysis.output_count,
        tick: 0,
        metadata: metadata.clone(),
    };

    Ok(BakeResult { graph, metadata })
}

/// Rebuilds `nodes`/`wires` from previously-serialized `metadata` and bakes
/// them again, producing a closure that is bit-identical in behavior to the
/// one that produced `metadata` ("Reconstruct-from-metadata").
pub fn reconstruct_from_metadata(
    metadata: &BakedMetadata,
    registry: &NodeRegistry,
) -> Result<BakeResult, BakeError> {
    let mut nodes: Map<NodeId, Node> = Map::new();
    for config in &metadata.node_configs {
        let mut node = Node::new(config.id.clone(), config.node_type.clone())
            .with_ports(config.input_count, config.output_count);
        for (key, value) in &config.params {
            node = node.with_param(key.clone(), value.clone());
        }
        nodes.insert(config.id.clone(), node);
    }

    let wires: Vec<Wire> = metadata
        .edges
        .iter()
        .enumerate()
        .map(|(i, edge)| {
            #[cfg(feature = "std")]
            let id = std::format!("e{i}");
            #[cfg(not(feature = "std"))]
            let id = alloc::format!("e{i}");
            let mut wire = Wire::new(
                id,
                crate::graph::PortRef::new(edge.from_node.clone(), edge.from_port),
                crate::graph::PortRef::new(edge.to_node.clone(), edge.to_port),
            );
            wire.delay = edge.wire_delay;
            wire
        })
        .collect();

    bake_graph(&nodes, &wires, registry)
}
