//! Property-based invariants for the compile-and-evaluate pipeline.

use proptest::prelude::*;
use signalgraph_core::graph::PortRef;
use signalgraph_core::{
    bake_graph, compute_wire_delays, reconstruct_from_metadata, topological_sort, Node, NodeId,
    NodeRegistry, Signal, Wire, SIGNAL_RANGE, TOTAL_TICKS,
};

fn linear_chain(len: usize) -> (Vec<NodeId>, Vec<Wire>) {
    let ids: Vec<NodeId> = (0..len).map(|i| NodeId::new(format!("n{i}"))).collect();
    let wires: Vec<Wire> = ids
        .windows(2)
        .enumerate()
        .map(|(i, pair)| Wire::new(format!("w{i}"), PortRef::new(pair[0].clone(), 0), PortRef::new(pair[1].clone(), 0)))
        .collect();
    (ids, wires)
}

proptest! {
    #[test]
    fn signal_new_always_lands_in_range(value in proptest::num::f64::ANY) {
        let s = Signal::new(value);
        let (lo, hi) = SIGNAL_RANGE;
        prop_assert!(s.value() >= lo && s.value() <= hi);
    }

    #[test]
    fn wire_delays_sum_to_budget_on_linear_chains(len in 2usize..20) {
        let (ids, wires) = linear_chain(len);
        let order = topological_sort(&ids, &wires).unwrap();
        let result = compute_wire_delays(&order, &wires, TOTAL_TICKS);

        let total: u32 = wires.iter().map(|w| result.wire_delays[&w.id]).sum();
        prop_assert_eq!(total, TOTAL_TICKS);
        for w in &wires {
            prop_assert!(result.wire_delays[&w.id] >= 1);
        }
    }

    #[test]
    fn wire_delays_floor_at_one_when_budget_is_tiny(len in 2usize..40, budget in 1u32..4) {
        let (ids, wires) = linear_chain(len);
        let order = topological_sort(&ids, &wires).unwrap();
        let result = compute_wire_delays(&order, &wires, budget);
        for w in &wires {
            prop_assert!(result.wire_delays[&w.id] >= 1);
        }
    }

    #[test]
    fn reconstructed_bake_matches_original_over_driven_inputs(
        len in 1usize..8,
        inputs in proptest::collection::vec(-150.0..150.0f64, 1..20),
    ) {
        let mut nodes = std::collections::HashMap::new();
        nodes.insert(NodeId::cp_input(0), Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
        let mut wires = Vec::new();
        let mut prev = NodeId::cp_input(0);
        for i in 0..len {
            let id = NodeId::new(format!("inv{i}"));
            nodes.insert(id.clone(), Node::new(id.clone(), "inverter").with_ports(1, 1));
            wires.push(Wire::new(format!("w{i}"), PortRef::new(prev.clone(), 0), PortRef::new(id.clone(), 0)));
            prev = id;
        }
        nodes.insert(NodeId::cp_output(0), Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
        wires.push(Wire::new("w_out", PortRef::new(prev, 0), PortRef::new(NodeId::cp_output(0), 0)));

        let registry = NodeRegistry::new();
        let original = bake_graph(&nodes, &wires, &registry).unwrap();
        let metadata = original.metadata.clone();
        let reconstructed = reconstruct_from_metadata(&metadata, &registry).unwrap();

        let mut a = original.graph;
        let mut b = reconstructed.graph;
        for &value in &inputs {
            let out_a = a.evaluate(&[Signal::new(value)]);
            let out_b = b.evaluate(&[Signal::new(value)]);
            prop_assert_eq!(out_a, out_b);
        }
    }
}
