//! Graph data model: nodes, wires, port constants, and the mutable graph an
//! editor builds before handing it to the sort/delay/bake pipeline.

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap as Map;
#[cfg(not(feature = "std"))]
use alloc::string::String;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::collections::HashMap as Map;

use crate::ids::NodeId;

/// A parameter value on a [`Node`]: the mapping of string key to
/// number/string/boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A numeric parameter value.
    Number(f64),
    /// A string-valued (enumerated) parameter.
    Text(String),
    /// A boolean flag parameter.
    Bool(bool),
}

impl ParamValue {
    /// Reads this value as a number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// A single node in the authored graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    /// Registry key for a fundamental node, or the fully-qualified id of a
    /// baked custom sub-graph.
    pub node_type: String,
    /// Grid position; opaque to the engine, carried through for the editor.
    pub position: (i32, i32),
    /// Author-set parameters, keyed by parameter name.
    pub params: Map<String, ParamValue>,
    /// Number of input ports.
    pub input_count: usize,
    /// Number of output ports.
    pub output_count: usize,
}

impl Node {
    /// Creates a node with no parameters at the origin.
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            node_type: node_type.into(),
            position: (0, 0),
            params: Map::new(),
            input_count: 0,
            output_count: 0,
        }
    }

    /// Sets the input/output port counts.
    pub fn with_ports(mut self, input_count: usize, output_count: usize) -> Self {
        self.input_count = input_count;
        self.output_count = output_count;
        self
    }

    /// Sets a parameter value.
    pub fn with_param(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// A reference to a specific port on a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    /// The node owning the port.
    pub node_id: NodeId,
    /// Zero-based port index within that node's input or output ports.
    pub port_index: usize,
}

impl PortRef {
    /// Builds a port reference.
    pub fn new(node_id: impl Into<NodeId>, port_index: usize) -> Self {
        PortRef {
            node_id: node_id.into(),
            port_index,
        }
    }

    /// The string form used as a map key, e.g. `"node_7:2"`.
    pub fn key(&self) -> String {
        #[cfg(feature = "std")]
        {
            format!("{}:{}", self.node_id, self.port_index)
        }
        #[cfg(not(feature = "std"))]
        {
            alloc::format!("{}:{}", self.node_id, self.port_index)
        }
    }
}

/// A directed wire between two ports, with an optional integer delay
/// assigned by the wire-delay distributor and consumed as the width of
/// its ring buffer by the tick scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    /// Unique wire identifier.
    pub id: String,
    /// The upstream port this wire reads from.
    pub source: PortRef,
    /// The downstream port this wire delivers to.
    pub target: PortRef,
    /// Delay in ticks; `None` until the wire-delay distributor assigns one.
    pub delay: Option<u32>,
}

impl Wire {
    /// Creates a wire with no delay assigned yet.
    pub fn new(id: impl Into<String>, source: PortRef, target: PortRef) -> Self {
        Wire {
            id: id.into(),
            source,
            target,
            delay: None,
        }
    }
}

/// A scalar attached to `(node_id, port_index)`, read by the cycle evaluator
/// whenever that port has no incoming wire. Knobs materialize as port
/// constants.
pub type PortConstant = Map<String, f64>;

/// The pair `(nodes, wires)` an editor mutates before compiling.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// All nodes, keyed by id.
    pub nodes: Map<NodeId, Node>,
    /// All wires, in author/insertion order.
    pub wires: Vec<Wire>,
}

/// A violated graph invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphValidationError {
    /// A wire references a node id absent from `nodes`.
    DanglingEndpoint {
        /// The wire whose endpoint is dangling.
        wire_id: String,
        /// The missing node id.
        node_id: NodeId,
    },
    /// Two wires target the same input port.
    PortNotUniquelySourced {
        /// The port targeted by more than one wire.
        port: PortRef,
    },
    /// A wire's port index is out of bounds for the node's port count.
    PortIndexOutOfRange {
        /// The wire with the invalid port index.
        wire_id: String,
        /// The port reference that is out of range.
        port: PortRef,
    },
}

impl core::fmt::Display for GraphValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GraphValidationError::DanglingEndpoint { wire_id, node_id } => {
                write!(f, "wire {wire_id} references unknown node {node_id}")
            }
            GraphValidationError::PortNotUniquelySourced { port } => {
                write!(f, "port {} is targeted by more than one wire", port.key())
            }
            GraphValidationError::PortIndexOutOfRange { wire_id, port } => {
                write!(f, "wire {wire_id} has out-of-range port {}", port.key())
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GraphValidationError {}

impl Graph {
    /// An empty graph.
    pub fn new() -> Self {
        Graph::default()
    }

    /// Adds a node, returning the previous node at that id if any.
    pub fn add_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Adds a wire.
    pub fn add_wire(&mut self, wire: Wire) {
        self.wires.push(wire);
    }

    /// Validates the graph's structural invariants: wire endpoints exist,
    /// each target port is uniquely sourced, and port indices are in range.
    /// Cycle freedom is *not* checked here — that is the topological sort's
    /// job, invoked separately so callers can recover the cycle path.
    pub fn validate(&self) -> Result<(), GraphValidationError> {
        let mut targeted: Map<(NodeId, usize), ()> = Map::new();
        for wire in &self.wires {
            for port in [&wire.source, &wire.target] {
                let node = self.nodes.get(&port.node_id).ok_or_else(|| {
                    GraphValidationError::DanglingEndpoint {
                        wire_id: wire.id.clone(),
                        node_id: port.node_id.clone(),
                    }
                })?;
                let bound = if port.node_id == wire.source.node_id && port.port_index == wire.source.port_index {
                    node.output_count
                } else {
                    node.input_count
                };
                if port.port_index >= bound {
                    return Err(GraphValidationError::PortIndexOutOfRange {
                        wire_id: wire.id.clone(),
                        port: port.clone(),
                    });
                }
            }
            let key = (wire.target.node_id.clone(), wire.target.port_index);
            if targeted.insert(key, ()).is_some() {
                return Err(GraphValidationError::PortNotUniquelySourced {
                    port: wire.target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Node ids in insertion order is not guaranteed by the underlying map;
    /// callers that need a stable order should go through [`crate::sort`].
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, inputs: usize, outputs: usize) -> Node {
        Node::new(id, "inverter").with_ports(inputs, outputs)
    }

    #[test]
    fn validates_clean_graph() {
        let mut g = Graph::new();
        g.add_node(node("a", 0, 1));
        g.add_node(node("b", 1, 0));
        g.add_wire(Wire::new("w0", PortRef::new("a", 0), PortRef::new("b", 0)));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn detects_dangling_endpoint() {
        let mut g = Graph::new();
        g.add_node(node("a", 0, 1));
        g.add_wire(Wire::new("w0", PortRef::new("a", 0), PortRef::new("missing", 0)));
        assert!(matches!(
            g.validate(),
            Err(GraphValidationError::DanglingEndpoint { .. })
        ));
    }

    #[test]
    fn detects_duplicate_target() {
        let mut g = Graph::new();
        g.add_node(node("a", 0, 1));
        g.add_node(node("b", 0, 1));
        g.add_node(node("c", 2, 0));
        g.add_wire(Wire::new("w0", PortRef::new("a", 0), PortRef::new("c", 0)));
        g.add_wire(Wire::new("w1", PortRef::new("b", 0), PortRef::new("c", 0)));
        assert!(matches!(
            g.validate(),
            Err(GraphValidationError::PortNotUniquelySourced { .. })
        ));
    }

    #[test]
    fn detects_out_of_range_port() {
        let mut g = Graph::new();
        g.add_node(node("a", 0, 1));
        g.add_node(node("b", 1, 0));
        g.add_wire(Wire::new("w0", PortRef::new("a", 5), PortRef::new("b", 0)));
        assert!(matches!(
            g.validate(),
            Err(GraphValidationError::PortIndexOutOfRange { .. })
        ));
    }
}
