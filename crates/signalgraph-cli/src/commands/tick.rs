//! Tick command: runs the streaming tick scheduler for N ticks.

use crate::graph_source::GraphSource;
use clap::Args;
use signalgraph_core::ids::CpKind;
use signalgraph_core::sort::topological_sort;
use signalgraph_core::{advance_tick, create_scheduler_state, NodeId, NodeRegistry, Signal};

/// Run the tick scheduler for a number of ticks.
#[derive(Args)]
pub struct TickArgs {
    #[command(flatten)]
    source: GraphSource,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 8)]
    ticks: u32,

    /// Input connection-point value (e.g. "0=12.5"); may be repeated and is
    /// held constant across every tick.
    #[arg(long = "input", value_parser = parse_index_value, number_of_values = 1)]
    inputs: Vec<(u32, f64)>,
}

fn parse_index_value(s: &str) -> Result<(u32, f64), String> {
    let (idx, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid input '{s}' (expected INDEX=VALUE)"))?;
    let idx: u32 = idx.parse().map_err(|e| format!("bad index '{idx}': {e}"))?;
    let value: f64 = value.parse().map_err(|e| format!("bad value '{value}': {e}"))?;
    Ok((idx, value))
}

/// Finds the node id feeding output connection point `cp_index` directly,
/// if any; needed ad hoc because the tick scheduler reports outputs per
/// feeding node rather than per output-CP index.
fn output_source(wires: &[signalgraph_core::Wire], cp_index: u32) -> Option<NodeId> {
    let target = NodeId::cp_output(cp_index);
    wires
        .iter()
        .find(|w| w.target.node_id == target)
        .map(|w| w.source.node_id.clone())
}

/// Runs the `tick` command.
pub fn run(args: TickArgs) -> anyhow::Result<()> {
    let (graph, _) = args.source.load()?;
    let registry = NodeRegistry::new();

    let node_ids: Vec<_> = graph.node_ids().cloned().collect();
    let topo_order =
        topological_sort(&node_ids, &graph.wires).map_err(|e| anyhow::anyhow!("cycle detected: {e}"))?;

    let output_count = node_ids
        .iter()
        .filter_map(|id| match id.reserved_kind() {
            Some(CpKind::Output(i)) => Some(i + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let mut state = create_scheduler_state(&graph.nodes, &registry);

    for tick in 0..args.ticks {
        for (idx, value) in &args.inputs {
            state.set_input(*idx, Signal::new(*value));
        }
        advance_tick(&graph.wires, &graph.nodes, &topo_order, &registry, &mut state);

        let outputs: Vec<f64> = (0..output_count)
            .map(|i| {
                output_source(&graph.wires, i)
                    .map_or(0.0, |source_id| state.output(&source_id).value())
            })
            .collect();
        println!("tick {tick}: {outputs:?}");
    }
    Ok(())
}
