//! Serde document types mirroring `signalgraph-core`'s graph and baked
//! metadata types, plus the conversions between them.
//!
//! `signalgraph-core` stays `no_std`-clean and carries no `serde`
//! dependency, so every persisted shape gets its own document type here
//! rather than a derive on the core type directly.
//!
//! No document type sets `deny_unknown_fields`: an older document opened by
//! a newer build should load rather than hard-fail on a field it doesn't
//! recognize yet.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use signalgraph_core::{BakedMetadata, Graph, Node, NodeConfig, NodeId, ParamValue, PortConstant, Wire};

/// Serde mirror of [`ParamValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValueDoc {
    /// A numeric parameter value.
    Number(f64),
    /// A string-valued (enumerated) parameter.
    Text(String),
    /// A boolean flag parameter.
    Bool(bool),
}

impl From<&ParamValue> for ParamValueDoc {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Number(n) => ParamValueDoc::Number(*n),
            ParamValue::Text(s) => ParamValueDoc::Text(s.clone()),
            ParamValue::Bool(b) => ParamValueDoc::Bool(*b),
        }
    }
}

impl From<ParamValueDoc> for ParamValue {
    fn from(value: ParamValueDoc) -> Self {
        match value {
            ParamValueDoc::Number(n) => ParamValue::Number(n),
            ParamValueDoc::Text(s) => ParamValue::Text(s),
            ParamValueDoc::Bool(b) => ParamValue::Bool(b),
        }
    }
}

fn params_to_doc(params: &HashMap<String, ParamValue>) -> HashMap<String, ParamValueDoc> {
    params.iter().map(|(k, v)| (k.clone(), v.into())).collect()
}

fn params_from_doc(params: HashMap<String, ParamValueDoc>) -> HashMap<String, ParamValue> {
    params.into_iter().map(|(k, v)| (k, v.into())).collect()
}

/// Serde mirror of [`Node`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDoc {
    /// Node id.
    pub id: String,
    /// Registry key or baked-subgraph type string.
    pub node_type: String,
    /// Editor grid position.
    #[serde(default)]
    pub position: (i32, i32),
    /// Author-set parameters.
    #[serde(default)]
    pub params: HashMap<String, ParamValueDoc>,
    /// Input port count.
    #[serde(default)]
    pub input_count: usize,
    /// Output port count.
    #[serde(default)]
    pub output_count: usize,
}

impl From<&Node> for NodeDoc {
    fn from(node: &Node) -> Self {
        NodeDoc {
            id: node.id.to_string(),
            node_type: node.node_type.clone(),
            position: node.position,
            params: params_to_doc(&node.params),
            input_count: node.input_count,
            output_count: node.output_count,
        }
    }
}

impl From<NodeDoc> for Node {
    fn from(doc: NodeDoc) -> Self {
        let mut node = Node::new(doc.id, doc.node_type).with_ports(doc.input_count, doc.output_count);
        node.position = doc.position;
        for (key, value) in params_from_doc(doc.params) {
            node = node.with_param(key, value);
        }
        node
    }
}

/// Serde mirror of [`Wire`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDoc {
    /// Wire id.
    pub id: String,
    /// Source node id.
    pub from_node: String,
    /// Source port index.
    pub from_port: usize,
    /// Target node id.
    pub to_node: String,
    /// Target port index.
    pub to_port: usize,
    /// Assigned wire delay, if any.
    #[serde(default)]
    pub delay: Option<u32>,
}

impl From<&Wire> for WireDoc {
    fn from(wire: &Wire) -> Self {
        WireDoc {
            id: wire.id.clone(),
            from_node: wire.source.node_id.to_string(),
            from_port: wire.source.port_index,
            to_node: wire.target.node_id.to_string(),
            to_port: wire.target.port_index,
            delay: wire.delay,
        }
    }
}

impl From<WireDoc> for Wire {
    fn from(doc: WireDoc) -> Self {
        let mut wire = Wire::new(
            doc.id,
            signalgraph_core::graph::PortRef::new(doc.from_node, doc.from_port),
            signalgraph_core::graph::PortRef::new(doc.to_node, doc.to_port),
        );
        wire.delay = doc.delay;
        wire
    }
}

/// Top-level authored-graph document: the unit `signalgraph-cli` loads and
/// saves, and what an editor would serialize on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Schema version, for future migrations. Unrecognized values are
    /// accepted as-is; this crate does not yet gate on it.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// All nodes.
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
    /// All wires.
    #[serde(default)]
    pub wires: Vec<WireDoc>,
    /// Port constants, keyed by `"node_id:port_index"`.
    #[serde(default)]
    pub port_constants: HashMap<String, f64>,
}

fn default_schema_version() -> u32 {
    1
}

impl From<&Graph> for GraphDocument {
    fn from(graph: &Graph) -> Self {
        GraphDocument {
            schema_version: default_schema_version(),
            nodes: graph.nodes.values().map(NodeDoc::from).collect(),
            wires: graph.wires.iter().map(WireDoc::from).collect(),
            port_constants: HashMap::new(),
        }
    }
}

/// Converts a [`GraphDocument`] into a runtime [`Graph`] plus its port
/// constants. Fails only if a wire references a node id absent from the
/// document's node list.
pub fn graph_from_document(doc: GraphDocument) -> Result<(Graph, PortConstant), crate::FormatError> {
    let mut graph = Graph::new();
    let mut known_ids = std::collections::HashSet::new();
    for node_doc in doc.nodes {
        let id = NodeId::new(node_doc.id.clone());
        known_ids.insert(id);
        graph.add_node(node_doc.into());
    }
    for wire_doc in doc.wires {
        let from = NodeId::new(wire_doc.from_node.clone());
        let to = NodeId::new(wire_doc.to_node.clone());
        if !known_ids.contains(&from) {
            return Err(crate::FormatError::DanglingWire { wire_id: wire_doc.id, node_id: wire_doc.from_node });
        }
        if !known_ids.contains(&to) {
            return Err(crate::FormatError::DanglingWire { wire_id: wire_doc.id, node_id: wire_doc.to_node });
        }
        graph.add_wire(wire_doc.into());
    }
    Ok((graph, doc.port_constants))
}

/// Serde mirror of [`signalgraph_core::BidirDirection`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidirDirectionDoc {
    /// Settled as an input connection point.
    Input,
    /// Settled as an output connection point.
    Output,
    /// Had no wires at all; dropped.
    Off,
}

impl From<signalgraph_core::BidirDirection> for BidirDirectionDoc {
    fn from(value: signalgraph_core::BidirDirection) -> Self {
        match value {
            signalgraph_core::BidirDirection::Input => BidirDirectionDoc::Input,
            signalgraph_core::BidirDirection::Output => BidirDirectionDoc::Output,
            signalgraph_core::BidirDirection::Off => BidirDirectionDoc::Off,
        }
    }
}

impl From<BidirDirectionDoc> for signalgraph_core::BidirDirection {
    fn from(value: BidirDirectionDoc) -> Self {
        match value {
            BidirDirectionDoc::Input => signalgraph_core::BidirDirection::Input,
            BidirDirectionDoc::Output => signalgraph_core::BidirDirection::Output,
            BidirDirectionDoc::Off => signalgraph_core::BidirDirection::Off,
        }
    }
}

/// Serde mirror of [`NodeConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfigDoc {
    /// Node id.
    pub id: String,
    /// Registry key or baked-subgraph type string.
    pub node_type: String,
    /// Author-set parameters.
    #[serde(default)]
    pub params: HashMap<String, ParamValueDoc>,
    /// Input port count.
    pub input_count: usize,
    /// Output port count.
    pub output_count: usize,
}

impl From<&NodeConfig> for NodeConfigDoc {
    fn from(config: &NodeConfig) -> Self {
        NodeConfigDoc {
            id: config.id.to_string(),
            node_type: config.node_type.clone(),
            params: params_to_doc(&config.params),
            input_count: config.input_count,
            output_count: config.output_count,
        }
    }
}

impl From<NodeConfigDoc> for NodeConfig {
    fn from(doc: NodeConfigDoc) -> Self {
        NodeConfig {
            id: NodeId::new(doc.id),
            node_type: doc.node_type,
            params: params_from_doc(doc.params),
            input_count: doc.input_count,
            output_count: doc.output_count,
        }
    }
}

/// Serde mirror of `signalgraph_core::EdgeConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfigDoc {
    /// Source node id.
    pub from_node: String,
    /// Source port index.
    pub from_port: usize,
    /// Target node id.
    pub to_node: String,
    /// Target port index.
    pub to_port: usize,
    /// Assigned wire delay, if any.
    #[serde(default)]
    pub wire_delay: Option<u32>,
}

impl From<&signalgraph_core::EdgeConfig> for EdgeConfigDoc {
    fn from(edge: &signalgraph_core::EdgeConfig) -> Self {
        EdgeConfigDoc {
            from_node: edge.from_node.to_string(),
            from_port: edge.from_port,
            to_node: edge.to_node.to_string(),
            to_port: edge.to_port,
            wire_delay: edge.wire_delay,
        }
    }
}

impl From<EdgeConfigDoc> for signalgraph_core::EdgeConfig {
    fn from(doc: EdgeConfigDoc) -> Self {
        signalgraph_core::EdgeConfig {
            from_node: NodeId::new(doc.from_node),
            from_port: doc.from_port,
            to_node: NodeId::new(doc.to_node),
            to_port: doc.to_port,
            wire_delay: doc.wire_delay,
        }
    }
}

/// Persisted form of [`BakedMetadata`], used to nest a bake as a custom
/// sub-graph node type elsewhere and to cache a bake across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedMetadataDocument {
    /// Schema version, for future migrations.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Topological order over every node, connection points included.
    #[serde(default)]
    pub topo_order: Vec<String>,
    /// One entry per node.
    #[serde(default)]
    pub node_configs: Vec<NodeConfigDoc>,
    /// One entry per wire.
    #[serde(default)]
    pub edges: Vec<EdgeConfigDoc>,
    /// Number of input connection points.
    pub input_count: usize,
    /// Number of output connection points.
    pub output_count: usize,
    /// Per-input-CP ring-buffer size, indexed by cp_index.
    #[serde(default)]
    pub input_buffer_sizes: Vec<u32>,
    /// Direction each of the six bidirectional slots settled into.
    pub bidir_directions: [BidirDirectionDoc; 6],
}

impl From<&BakedMetadata> for BakedMetadataDocument {
    fn from(metadata: &BakedMetadata) -> Self {
        BakedMetadataDocument {
            schema_version: default_schema_version(),
            topo_order: metadata.topo_order.iter().map(ToString::to_string).collect(),
            node_configs: metadata.node_configs.iter().map(NodeConfigDoc::from).collect(),
            edges: metadata.edges.iter().map(EdgeConfigDoc::from).collect(),
            input_count: metadata.input_count,
            output_count: metadata.output_count,
            input_buffer_sizes: metadata.input_buffer_sizes.clone(),
            bidir_directions: metadata.bidir_directions.map(BidirDirectionDoc::from),
        }
    }
}

impl From<BakedMetadataDocument> for BakedMetadata {
    fn from(doc: BakedMetadataDocument) -> Self {
        BakedMetadata {
            topo_order: doc.topo_order.into_iter().map(NodeId::new).collect(),
            node_configs: doc.node_configs.into_iter().map(NodeConfig::from).collect(),
            edges: doc.edges.into_iter().map(Into::into).collect(),
            input_count: doc.input_count,
            output_count: doc.output_count,
            input_buffer_sizes: doc.input_buffer_sizes,
            bidir_directions: doc.bidir_directions.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalgraph_core::graph::PortRef;

    #[test]
    fn graph_round_trips_through_document() {
        let mut graph = Graph::new();
        graph.add_node(Node::new("a", "inverter").with_ports(1, 1));
        graph.add_node(Node::new("b", "inverter").with_ports(1, 1));
        graph.add_wire(Wire::new("w0", PortRef::new("a", 0), PortRef::new("b", 0)));

        let doc = GraphDocument::from(&graph);
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: GraphDocument = serde_json::from_str(&json).unwrap();
        let (restored, _) = graph_from_document(parsed).unwrap();

        assert_eq!(restored.nodes.len(), 2);
        assert_eq!(restored.wires.len(), 1);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let json = r#"{
            "schema_version": 1,
            "nodes": [{"id": "a", "node_type": "inverter", "input_count": 1, "output_count": 1, "future_field": 42}],
            "wires": [],
            "extra_top_level_field": true
        }"#;
        let doc: GraphDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.nodes.len(), 1);
    }

    #[test]
    fn dangling_wire_is_rejected() {
        let doc = GraphDocument {
            schema_version: 1,
            nodes: vec![NodeDoc {
                id: "a".into(),
                node_type: "inverter".into(),
                position: (0, 0),
                params: HashMap::new(),
                input_count: 1,
                output_count: 1,
            }],
            wires: vec![WireDoc {
                id: "w0".into(),
                from_node: "a".into(),
                from_port: 0,
                to_node: "missing".into(),
                to_port: 0,
                delay: None,
            }],
            port_constants: HashMap::new(),
        };
        assert!(matches!(
            graph_from_document(doc),
            Err(crate::FormatError::DanglingWire { .. })
        ));
    }
}
