//! Bake command: loads a graph, bakes it, and prints the resulting metadata.

use crate::graph_source::GraphSource;
use clap::Args;
use signalgraph_core::NodeRegistry;

/// Bake a graph and print its metadata and buffer requirements.
#[derive(Args)]
pub struct BakeArgs {
    #[command(flatten)]
    source: GraphSource,

    /// Write the baked metadata as JSON to this path instead of a summary.
    #[arg(long, value_name = "PATH")]
    out: Option<std::path::PathBuf>,
}

/// Runs the `bake` command.
pub fn run(args: BakeArgs) -> anyhow::Result<()> {
    let (graph, _) = args.source.load()?;
    let registry = NodeRegistry::new();
    let result = signalgraph_core::bake_graph(&graph.nodes, &graph.wires, &registry)
        .map_err(|e| anyhow::anyhow!("bake failed: {e}"))?;

    if let Some(path) = &args.out {
        signalgraph_format::save_metadata(&result.metadata, path)?;
        println!("wrote baked metadata to {}", path.display());
        return Ok(());
    }

    println!("nodes in topo order: {}", result.metadata.topo_order.len());
    println!("input connection points: {}", result.metadata.input_count);
    println!("output connection points: {}", result.metadata.output_count);
    println!("input buffer sizes: {:?}", result.metadata.input_buffer_sizes);
    for (i, direction) in result.metadata.bidir_directions.iter().enumerate() {
        println!("bidir slot {i}: {direction:?}");
    }
    Ok(())
}
