//! Cycles command: runs the batch cycle evaluator for N cycles.

use crate::graph_source::GraphSource;
use clap::Args;
use signalgraph_core::ids::CpKind;
use signalgraph_core::{evaluate_all_cycles, NodeRegistry, Signal};

/// Run the cycle evaluator for a number of cycles.
#[derive(Args)]
pub struct CyclesArgs {
    #[command(flatten)]
    source: GraphSource,

    /// Number of cycles to run (each run twice internally for warm-up).
    #[arg(long, default_value_t = 8)]
    cycles: u32,

    /// Input connection-point value (e.g. "0=12.5"); may be repeated and is
    /// held constant across every cycle.
    #[arg(long = "input", value_parser = parse_index_value, number_of_values = 1)]
    inputs: Vec<(u32, f64)>,

    /// Print per-cycle wire traces in addition to outputs.
    #[arg(long)]
    trace: bool,
}

fn parse_index_value(s: &str) -> Result<(u32, f64), String> {
    let (idx, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid input '{s}' (expected INDEX=VALUE)"))?;
    let idx: u32 = idx.parse().map_err(|e| format!("bad index '{idx}': {e}"))?;
    let value: f64 = value.parse().map_err(|e| format!("bad value '{value}': {e}"))?;
    Ok((idx, value))
}

/// Runs the `cycles` command.
pub fn run(args: CyclesArgs) -> anyhow::Result<()> {
    let (graph, port_constants) = args.source.load()?;
    let registry = NodeRegistry::new();

    let input_count = graph
        .node_ids()
        .filter_map(|id| match id.reserved_kind() {
            Some(CpKind::Input(i)) => Some(i + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let results = evaluate_all_cycles(
        &graph.nodes,
        &graph.wires,
        &registry,
        &port_constants,
        |_cycle| {
            (0..input_count)
                .map(|i| {
                    args.inputs
                        .iter()
                        .find(|(idx, _)| *idx == i)
                        .map_or(Signal::ZERO, |(_, value)| Signal::new(*value))
                })
                .collect()
        },
        args.cycles,
        None,
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    for (cycle, outputs) in results.outputs.iter().enumerate() {
        let values: Vec<f64> = outputs.iter().map(|s| s.value()).collect();
        println!("cycle {cycle}: {values:?}");
    }

    if args.trace {
        println!();
        println!("wire traces:");
        for (wire_id, values) in &results.wire_traces {
            let values: Vec<f64> = values.iter().map(|s| s.value()).collect();
            println!("  {wire_id}: {values:?}");
        }
    }
    Ok(())
}
