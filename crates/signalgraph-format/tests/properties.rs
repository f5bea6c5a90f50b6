//! Property-based round-trip invariants for the JSON document format.

use proptest::prelude::*;
use signalgraph_core::graph::PortRef;
use signalgraph_core::{Graph, Node, ParamValue, Wire};

fn linear_chain_graph(len: usize) -> Graph {
    let ids: Vec<String> = (0..len).map(|i| format!("n{i}")).collect();
    let mut graph = Graph::new();
    for id in &ids {
        graph.add_node(Node::new(id.clone(), "inverter").with_ports(1, 1));
    }
    for pair in ids.windows(2) {
        graph.add_wire(Wire::new(
            format!("{}->{}", pair[0], pair[1]),
            PortRef::new(pair[0].clone(), 0),
            PortRef::new(pair[1].clone(), 0),
        ));
    }
    graph
}

proptest! {
    #[test]
    fn graph_json_round_trip_preserves_node_and_wire_counts(len in 1usize..12) {
        let graph = linear_chain_graph(len);

        let json = signalgraph_format::graph_to_json(&graph).unwrap();
        let (restored, _) = signalgraph_format::graph_from_json(&json).unwrap();

        prop_assert_eq!(restored.nodes.len(), graph.nodes.len());
        prop_assert_eq!(restored.wires.len(), graph.wires.len());
        prop_assert!(restored.validate().is_ok());
    }

    #[test]
    fn graph_json_round_trip_preserves_numeric_params(value in -100.0..100.0f64) {
        let mut graph = Graph::new();
        graph.add_node(
            Node::new("k", "constant")
                .with_ports(0, 1)
                .with_param("value", ParamValue::Number(value)),
        );

        let json = signalgraph_format::graph_to_json(&graph).unwrap();
        let (restored, _) = signalgraph_format::graph_from_json(&json).unwrap();

        let node = restored.nodes.get(&signalgraph_core::NodeId::new("k")).unwrap();
        match node.params.get("value") {
            Some(ParamValue::Number(n)) => prop_assert_eq!(*n, value),
            other => prop_assert!(false, "expected numeric param, got {other:?}"),
        }
    }
}
