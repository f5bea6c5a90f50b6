//! Delay analyzer: resolves, for every processing-node input port, the
//! source it should read from and (for connection-point-sourced ports) the
//! ring-buffer offset that phase-aligns it against every other path
//! converging on the same node.
//!
//! Walks the topo order forward, accumulating `node_latency[node] =
//! max(incoming) + own_latency` at every input port of every processing
//! node. A post-walk pass then subtracts the minimum `buffer_offset` across
//! all connection-point sources so the shortest path from any connection
//! point always reads at offset zero; see `DESIGN.md` for how Open Question
//! 1 (normalization timing) is resolved.

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap as Map;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::collections::HashMap as Map;

use crate::graph::{Node, Wire};
use crate::ids::{CpKind, NodeId};

/// Where a processing-node input port's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSource {
    /// The port has no incoming wire.
    None,
    /// The wire originates at an input connection point.
    Cp {
        /// The connection-point index.
        cp_index: u32,
        /// Ring-buffer read offset (ticks behind the write head), after
        /// normalization.
        buffer_offset: u32,
    },
    /// The wire originates at another processing node's output port.
    Node {
        /// The upstream node.
        source_node_id: NodeId,
        /// The upstream output port index.
        source_port: usize,
    },
}

/// An output connection point's source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMapping {
    /// Unconnected: always reads as zero.
    None,
    /// Sourced from a processing node's output port.
    Node {
        /// The upstream node.
        source_node_id: NodeId,
        /// The upstream output port index.
        source_port: usize,
    },
    /// A direct connection-point-to-connection-point wire: read at offset 0.
    DirectFromInputCp {
        /// The input connection-point index feeding this output directly.
        cp_index: u32,
    },
}

/// Full result of delay analysis.
#[derive(Debug, Clone, Default)]
pub struct DelayAnalysis {
    /// `"{node_id}:{port_index}"` -> port source, for every processing-node
    /// input port.
    pub port_sources: Map<String, PortSource>,
    /// Required ring-buffer depth per input connection-point index.
    pub input_buffer_sizes: Map<u32, u32>,
    /// Source of each output connection point, by index.
    pub output_mappings: Map<u32, OutputMapping>,
    /// Topo order with connection-point and slot nodes filtered out.
    pub processing_order: Vec<NodeId>,
    /// Number of input connection points seen.
    pub input_count: usize,
    /// Number of output connection points seen.
    pub output_count: usize,
}

fn port_key(node_id: &NodeId, port_index: usize) -> String {
    #[cfg(feature = "std")]
    {
        std::format!("{node_id}:{port_index}")
    }
    #[cfg(not(feature = "std"))]
    {
        alloc::format!("{node_id}:{port_index}")
    }
}

/// Runs the delay analyzer over an already topo-sorted node set.
///
/// `wire_delays` supplies a per-wire integer delay (as produced by C5); a
/// missing entry is treated as zero additional delay, matching the cycle
/// evaluator's no-wire-delay batch model.
pub fn analyze_delays(
    topo_order: &[NodeId],
    nodes: &Map<NodeId, Node>,
    wires: &[Wire],
    wire_delays: Option<&Map<String, u32>>,
) -> DelayAnalysis {
    let wire_delay_of = |wire: &Wire| -> u32 {
        wire_delays
            .and_then(|m| m.get(&wire.id))
            .copied()
            .or(wire.delay)
            .unwrap_or(0)
    };

    let mut output_delay: Map<NodeId, u32> = Map::new();
    for id in topo_order {
        output_delay.insert(id.clone(), 0);
    }

    let mut result = DelayAnalysis::default();
    let mut cp_sources: Vec<(u32, usize)> = Vec::new(); // (cp_index, port_sources index into a flat list)
    let mut raw_cp_offsets: Vec<u32> = Vec::new();

    for id in topo_order {
        match id.reserved_kind() {
            Some(CpKind::Input(i)) => {
                result.input_count = result.input_count.max(i as usize + 1);
                output_delay.insert(id.clone(), 0);
                continue;
            }
            Some(CpKind::Output(i)) => {
                result.output_count = result.output_count.max(i as usize + 1);
                // Resolve from its single incoming wire.
                let incoming = wires.iter().find(|w| &w.target.node_id == id);
                let mapping = match incoming {
                    None => OutputMapping::None,
                    Some(w) => match w.source.node_id.reserved_kind() {
                        Some(CpKind::Input(cp_index)) => OutputMapping::DirectFromInputCp { cp_index },
                        _ => OutputMapping::Node {
                            source_node_id: w.source.node_id.clone(),
                            source_port: w.source.port_index,
                        },
                    },
                };
                result.output_mappings.insert(i, mapping);
                continue;
            }
            Some(_other_slot) => {
                // Creative/utility/bidir slots are handled by the baker's
                // normalization pass and the cycle evaluator's slot-index
                // mapping; the delay analyzer treats them like ordinary
                // connection points with zero internal delay.
                output_delay.insert(id.clone(), 0);
                continue;
            }
            None => {}
        }

        result.processing_order.push(id.clone());
        let Some(node) = nodes.get(id) else { continue };

        let mut max_input_delay = 0u32;
        for port_index in 0..node.input_count {
            let incoming = wires
                .iter()
                .find(|w| &w.target.node_id == id && w.target.port_index == port_index);

            let source = match incoming {
                None => PortSource::None,
                Some(w) => {
                    let delay = wire_delay_of(w);
                    match w.source.node_id.reserved_kind() {
                        Some(CpKind::Input(cp_index)) => {
                            let source_output_delay =
                                *output_delay.get(&w.source.node_id).unwrap_or(&0);
                            let offset = source_output_delay + delay;
                            max_input_delay = max_input_delay.max(offset);
                            let raw_index = raw_cp_offsets.len();
                            raw_cp_offsets.push(offset);
                            cp_sources.push((cp_index, raw_index));
                            PortSource::Cp {
                                cp_index,
                                buffer_offset: offset,
                            }
                        }
                        _ => {
                            let source_output_delay =
                                *output_delay.get(&w.source.node_id).unwrap_or(&0);
                            max_input_delay = max_input_delay.max(source_output_delay + delay);
                            PortSource::Node {
                                source_node_id: w.source.node_id.clone(),
                                source_port: w.source.port_index,
                            }
                        }
                    }
                }
            };
            result
                .port_sources
                .insert(port_key(id, port_index), source);
        }

        output_delay.insert(id.clone(), max_input_delay);
    }

    // Normalize: subtract the global minimum buffer_offset across all
    // cp-kind sources so the shortest path from any CP reads at offset 0.
    if !raw_cp_offsets.is_empty() {
        let min_offset = raw_cp_offsets.iter().copied().min().unwrap_or(0);
        for (_, raw_index) in &cp_sources {
            raw_cp_offsets[*raw_index] -= min_offset;
        }
        // Rewrite the normalized offsets back into port_sources.
        let mut cursor = 0usize;
        for id in &result.processing_order {
            let Some(node) = nodes.get(id) else { continue };
            for port_index in 0..node.input_count {
                let key = port_key(id, port_index);
                if let Some(PortSource::Cp { cp_index, .. }) = result.port_sources.get(&key) {
                    let cp_index = *cp_index;
                    let normalized = raw_cp_offsets[cursor];
                    result
                        .port_sources
                        .insert(key, PortSource::Cp { cp_index, buffer_offset: normalized });
                    cursor += 1;
                }
            }
        }
    }

    // Per-CP buffer size: 1 + max(buffer_offset over sources of that cp).
    for source in result.port_sources.values() {
        if let PortSource::Cp { cp_index, buffer_offset } = source {
            let entry = result.input_buffer_sizes.entry(*cp_index).or_insert(1);
            *entry = (*entry).max(1 + buffer_offset);
        }
    }
    for i in 0..result.input_count as u32 {
        result.input_buffer_sizes.entry(i).or_insert(1);
    }

    result
}
