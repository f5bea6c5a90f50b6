//! End-to-end scenarios driving the cycle evaluator and baked tick closure
//! together over small authored graphs.

use signalgraph_core::graph::{ParamValue, PortRef};
use signalgraph_core::{
    bake_graph, evaluate_all_cycles, Graph, Node, NodeId, NodeRegistry, PortConstant, Signal, Wire,
};

fn wire(id: &str, from: &str, from_port: usize, to: &str, to_port: usize) -> Wire {
    Wire::new(id, PortRef::new(from, from_port), PortRef::new(to, to_port))
}

#[test]
fn pass_through_reads_back_the_driven_value() {
    let mut graph = Graph::new();
    graph.add_node(Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
    graph.add_node(Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
    graph.add_wire(wire("w0", "__cp_input_0__", 0, "__cp_output_0__", 0));
    assert!(graph.validate().is_ok());

    let registry = NodeRegistry::new();
    let constants = PortConstant::new();
    let results =
        evaluate_all_cycles(&graph.nodes, &graph.wires, &registry, &constants, |_| vec![Signal::new(75.0)], 1, None)
            .unwrap();
    assert_eq!(results.outputs[0][0].value(), 75.0);
}

#[test]
fn double_inverter_chain_cancels_out() {
    let mut graph = Graph::new();
    graph.add_node(Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
    graph.add_node(Node::new("inv_a", "inverter").with_ports(1, 1));
    graph.add_node(Node::new("inv_b", "inverter").with_ports(1, 1));
    graph.add_node(Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
    graph.add_wire(wire("w0", "__cp_input_0__", 0, "inv_a", 0));
    graph.add_wire(wire("w1", "inv_a", 0, "inv_b", 0));
    graph.add_wire(wire("w2", "inv_b", 0, "__cp_output_0__", 0));

    let registry = NodeRegistry::new();
    let constants = PortConstant::new();
    let results =
        evaluate_all_cycles(&graph.nodes, &graph.wires, &registry, &constants, |_| vec![Signal::new(42.0)], 2, None)
            .unwrap();
    for out in &results.outputs {
        assert_eq!(out[0].value(), 42.0);
    }
}

#[test]
fn half_splitter_sends_equal_halves_to_both_outputs() {
    let mut graph = Graph::new();
    graph.add_node(Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
    graph.add_node(Node::new("split", "splitter").with_ports(1, 2));
    graph.add_node(Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
    graph.add_node(Node::new(NodeId::cp_output(1), "cp").with_ports(1, 0));
    graph.add_wire(wire("w0", "__cp_input_0__", 0, "split", 0));
    graph.add_wire(wire("w1", "split", 0, "__cp_output_0__", 0));
    graph.add_wire(wire("w2", "split", 1, "__cp_output_1__", 0));

    let registry = NodeRegistry::new();
    let constants = PortConstant::new();
    let results =
        evaluate_all_cycles(&graph.nodes, &graph.wires, &registry, &constants, |_| vec![Signal::new(80.0)], 1, None)
            .unwrap();
    assert_eq!(results.outputs[0][0].value(), 40.0);
    assert_eq!(results.outputs[0][1].value(), 40.0);
}

#[test]
fn cross_cycle_scale_feedback_settles_to_zero() {
    // CP0 -> scale.a, scale.out -> invert -> scale.x (knob, cross-cycle),
    // invert -> CP0 output. With an initial knob value of zero, the scale
    // factor never leaves zero, so every cycle settles to zero regardless
    // of the driven input.
    let mut graph = Graph::new();
    graph.add_node(Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
    graph.add_node(Node::new("scale", "scale").with_ports(2, 1));
    graph.add_node(Node::new("invert", "inverter").with_ports(1, 1));
    graph.add_node(Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
    graph.add_wire(wire("w0", "__cp_input_0__", 0, "scale", 0));
    graph.add_wire(wire("w1", "scale", 0, "invert", 0));
    graph.add_wire(wire("w2", "invert", 0, "scale", 1));
    graph.add_wire(wire("w3", "invert", 0, "__cp_output_0__", 0));

    let registry = NodeRegistry::new();
    let constants = PortConstant::new();
    let results = evaluate_all_cycles(
        &graph.nodes,
        &graph.wires,
        &registry,
        &constants,
        |_| vec![Signal::new(73.0)],
        4,
        None,
    )
    .unwrap();
    for out in &results.outputs {
        assert_eq!(out[0].value(), 0.0);
    }
}

#[test]
fn cross_cycle_amplifier_feedback_matches_expected_sequence() {
    // CP0 -> amp.a, amp.out -> invert -> amp.x (knob, cross-cycle),
    // invert -> CP0 output. With an initial knob value of zero and a driven
    // input of 100, the amplifier and inverter alternate between full boost
    // and full cancellation every other cycle.
    let mut graph = Graph::new();
    graph.add_node(Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
    graph.add_node(Node::new("amp", "amplifier").with_ports(2, 1));
    graph.add_node(Node::new("invert", "inverter").with_ports(1, 1));
    graph.add_node(Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
    graph.add_wire(wire("w0", "__cp_input_0__", 0, "amp", 0));
    graph.add_wire(wire("w1", "amp", 0, "invert", 0));
    graph.add_wire(wire("w2", "invert", 0, "amp", 1));
    graph.add_wire(wire("w3", "invert", 0, "__cp_output_0__", 0));

    let registry = NodeRegistry::new();
    let constants = PortConstant::new();
    let results = evaluate_all_cycles(
        &graph.nodes,
        &graph.wires,
        &registry,
        &constants,
        |_| vec![Signal::new(100.0)],
        4,
        None,
    )
    .unwrap();
    let got: Vec<f64> = results.outputs.iter().map(|out| out[0].value()).collect();
    assert_eq!(got, vec![-100.0, 0.0, -100.0, 0.0]);
}

#[test]
fn memory_seamless_loop_holds_constant_over_many_cycles() {
    let mut graph = Graph::new();
    graph.add_node(Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
    graph.add_node(Node::new("mem", "memory").with_ports(1, 1));
    graph.add_node(Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
    graph.add_wire(wire("w0", "__cp_input_0__", 0, "mem", 0));
    graph.add_wire(wire("w1", "mem", 0, "__cp_output_0__", 0));

    let registry = NodeRegistry::new();
    let constants = PortConstant::new();
    let results =
        evaluate_all_cycles(&graph.nodes, &graph.wires, &registry, &constants, |_| vec![Signal::new(42.0)], 256, None)
            .unwrap();
    assert_eq!(results.outputs.len(), 256);
    for out in &results.outputs {
        assert_eq!(out[0].value(), 42.0);
    }
}

#[test]
fn baked_graph_and_cycle_evaluator_agree_on_an_adder_chain() {
    let mut graph = Graph::new();
    graph.add_node(Node::new(NodeId::cp_input(0), "cp").with_ports(0, 1));
    graph.add_node(Node::new(NodeId::cp_input(1), "cp").with_ports(0, 1));
    graph.add_node(Node::new("add", "shifter").with_ports(2, 1));
    graph.add_node(Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
    graph.add_wire(wire("w0", "__cp_input_0__", 0, "add", 0));
    graph.add_wire(wire("w1", "__cp_input_1__", 0, "add", 1));
    graph.add_wire(wire("w2", "add", 0, "__cp_output_0__", 0));

    let registry = NodeRegistry::new();

    let constants = PortConstant::new();
    let cycle_results = evaluate_all_cycles(
        &graph.nodes,
        &graph.wires,
        &registry,
        &constants,
        |_| vec![Signal::new(30.0), Signal::new(40.0)],
        1,
        None,
    )
    .unwrap();
    assert_eq!(cycle_results.outputs[0][0].value(), 70.0);

    let bake = bake_graph(&graph.nodes, &graph.wires, &registry).unwrap();
    let mut baked = bake.graph;
    let mut out = vec![Signal::ZERO];
    for _ in 0..(signalgraph_core::TOTAL_TICKS as usize + 2) {
        out = baked.evaluate(&[Signal::new(30.0), Signal::new(40.0)]);
    }
    assert_eq!(out[0].value(), 70.0);
}

#[test]
fn constant_node_reports_its_authored_param() {
    let mut graph = Graph::new();
    graph.add_node(
        Node::new("k", "constant")
            .with_ports(0, 1)
            .with_param("value", ParamValue::Number(17.0)),
    );
    graph.add_node(Node::new(NodeId::cp_output(0), "cp").with_ports(1, 0));
    graph.add_wire(wire("w0", "k", 0, "__cp_output_0__", 0));

    let registry = NodeRegistry::new();
    let constants = PortConstant::new();
    let results =
        evaluate_all_cycles(&graph.nodes, &graph.wires, &registry, &constants, |_| Vec::new(), 1, None).unwrap();
    assert_eq!(results.outputs[0][0].value(), 17.0);
}
