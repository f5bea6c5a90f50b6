//! Shared graph-loading arguments: a JSON document path or an inline DSL
//! chain, exactly one of which every subcommand accepts.

use clap::Args;
use signalgraph_core::{Graph, PortConstant};
use std::path::PathBuf;

/// Where a subcommand reads its graph from.
#[derive(Args)]
pub struct GraphSource {
    /// Path to a graph document in JSON form.
    #[arg(long, value_name = "PATH", conflicts_with = "dsl")]
    graph: Option<PathBuf>,

    /// An inline pipe-chain DSL graph description, e.g.
    /// `constant:value=5 | scale:factor=2 | inverter`.
    #[arg(long, value_name = "DSL", conflicts_with = "graph")]
    dsl: Option<String>,
}

impl GraphSource {
    /// Loads the graph named by whichever of `--graph`/`--dsl` was given.
    ///
    /// # Errors
    ///
    /// Returns an error if neither was given, the file can't be read/parsed,
    /// or the DSL string is malformed.
    pub fn load(&self) -> anyhow::Result<(Graph, PortConstant)> {
        if let Some(path) = &self.graph {
            return Ok(signalgraph_format::load_graph(path)?);
        }
        if let Some(dsl) = &self.dsl {
            let (nodes, wires) = crate::dsl::build_graph(dsl)?;
            return Ok((Graph { nodes, wires }, PortConstant::new()));
        }
        anyhow::bail!("one of --graph or --dsl is required")
    }
}
