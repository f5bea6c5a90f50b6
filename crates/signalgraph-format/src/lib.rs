//! JSON document format for authored signal graphs and baked sub-graph
//! metadata.
//!
//! The baked-metadata documents nest arbitrarily deep (a custom sub-graph's
//! `node_configs` may themselves describe nodes typed as other custom
//! sub-graphs), so this uses JSON rather than a table-array format: JSON's
//! native array/object nesting maps onto that directly.

mod document;
mod error;

use std::path::Path;

pub use document::{
    graph_from_document, BakedMetadataDocument, BidirDirectionDoc, EdgeConfigDoc, GraphDocument,
    NodeConfigDoc, NodeDoc, ParamValueDoc, WireDoc,
};
pub use error::FormatError;

use signalgraph_core::{BakedMetadata, Graph, PortConstant};

fn read_to_string(path: &Path) -> Result<String, FormatError> {
    std::fs::read_to_string(path).map_err(|e| FormatError::read_file(path, e))
}

fn write_string(path: &Path, content: &str) -> Result<(), FormatError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| FormatError::create_dir(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| FormatError::write_file(path, e))
}

/// Parses a [`Graph`] and its port constants from a JSON string.
pub fn graph_from_json(json: &str) -> Result<(Graph, PortConstant), FormatError> {
    let doc: GraphDocument = serde_json::from_str(json)?;
    graph_from_document(doc)
}

/// Serializes a [`Graph`] to a pretty-printed JSON string. Port constants
/// are not carried by [`Graph`] itself; pass them separately if the caller
/// wants them persisted (see [`graph_to_json_with_constants`]).
pub fn graph_to_json(graph: &Graph) -> Result<String, FormatError> {
    let doc = GraphDocument::from(graph);
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// As [`graph_to_json`], additionally embedding `port_constants`.
pub fn graph_to_json_with_constants(graph: &Graph, port_constants: &PortConstant) -> Result<String, FormatError> {
    let mut doc = GraphDocument::from(graph);
    doc.port_constants = port_constants.clone();
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Loads a graph document from `path`.
pub fn load_graph(path: impl AsRef<Path>) -> Result<(Graph, PortConstant), FormatError> {
    graph_from_json(&read_to_string(path.as_ref())?)
}

/// Saves a graph (with its port constants) to `path`.
pub fn save_graph(graph: &Graph, port_constants: &PortConstant, path: impl AsRef<Path>) -> Result<(), FormatError> {
    write_string(path.as_ref(), &graph_to_json_with_constants(graph, port_constants)?)
}

/// Parses [`BakedMetadata`] from a JSON string.
pub fn metadata_from_json(json: &str) -> Result<BakedMetadata, FormatError> {
    let doc: BakedMetadataDocument = serde_json::from_str(json)?;
    Ok(doc.into())
}

/// Serializes [`BakedMetadata`] to a pretty-printed JSON string.
pub fn metadata_to_json(metadata: &BakedMetadata) -> Result<String, FormatError> {
    let doc = BakedMetadataDocument::from(metadata);
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Loads baked metadata from `path`.
pub fn load_metadata(path: impl AsRef<Path>) -> Result<BakedMetadata, FormatError> {
    metadata_from_json(&read_to_string(path.as_ref())?)
}

/// Saves baked metadata to `path`.
pub fn save_metadata(metadata: &BakedMetadata, path: impl AsRef<Path>) -> Result<(), FormatError> {
    write_string(path.as_ref(), &metadata_to_json(metadata)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalgraph_core::graph::PortRef;
    use signalgraph_core::{Node, Wire};

    #[test]
    fn graph_json_round_trip_preserves_topology() {
        let mut graph = Graph::new();
        graph.add_node(Node::new("a", "inverter").with_ports(1, 1));
        graph.add_node(Node::new("b", "inverter").with_ports(1, 1));
        graph.add_wire(Wire::new("w0", PortRef::new("a", 0), PortRef::new("b", 0)));

        let json = graph_to_json(&graph).unwrap();
        let (restored, _) = graph_from_json(&json).unwrap();
        assert_eq!(restored.wires.len(), 1);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn metadata_json_round_trip_preserves_bidir_directions() {
        let registry = signalgraph_core::NodeRegistry::new();
        let mut nodes = std::collections::HashMap::new();
        nodes.insert(
            signalgraph_core::NodeId::cp_input(0),
            Node::new(signalgraph_core::NodeId::cp_input(0), "cp").with_ports(0, 1),
        );
        nodes.insert(
            signalgraph_core::NodeId::cp_output(0),
            Node::new(signalgraph_core::NodeId::cp_output(0), "cp").with_ports(1, 0),
        );
        let wires = vec![Wire::new(
            "w0",
            PortRef::new(signalgraph_core::NodeId::cp_input(0), 0),
            PortRef::new(signalgraph_core::NodeId::cp_output(0), 0),
        )];
        let result = signalgraph_core::bake_graph(&nodes, &wires, &registry).unwrap();

        let json = metadata_to_json(&result.metadata).unwrap();
        let restored = metadata_from_json(&json).unwrap();
        assert_eq!(restored.input_count, result.metadata.input_count);
        assert_eq!(restored.bidir_directions, result.metadata.bidir_directions);
    }
}
