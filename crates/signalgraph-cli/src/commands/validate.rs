//! Graph validation command: structural checks plus a topo-sort/cycle
//! report, with no evaluation performed.

use crate::graph_source::GraphSource;
use clap::Args;
use signalgraph_core::sort::topological_sort;

/// Topo-sort a graph and report cycles without evaluating it.
#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    source: GraphSource,
}

/// Runs the `validate` command.
pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let (graph, _) = args.source.load()?;

    if let Err(e) = graph.validate() {
        println!("structural error: {e}");
        return Ok(());
    }
    println!("structural check: ok ({} nodes, {} wires)", graph.nodes.len(), graph.wires.len());

    let node_ids: Vec<_> = graph.node_ids().cloned().collect();
    match topological_sort(&node_ids, &graph.wires) {
        Ok(order) => println!("topo sort: ok ({} nodes ordered)", order.len()),
        Err(e) => println!("cycle detected: {e}"),
    }
    Ok(())
}
