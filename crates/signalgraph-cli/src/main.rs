//! signalgraph CLI - exercises the engine's compile and evaluate pipeline.

mod commands;
mod dsl;
mod graph_source;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "signalgraph")]
#[command(author, version, about = "Signal-graph engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered node types and their ports/params
    Nodes(commands::nodes::NodesArgs),

    /// Bake a graph and print its metadata and buffer requirements
    Bake(commands::bake::BakeArgs),

    /// Run the tick scheduler for a number of ticks
    Tick(commands::tick::TickArgs),

    /// Run the cycle evaluator for a number of cycles
    Cycles(commands::cycles::CyclesArgs),

    /// Topo-sort and report cycles without evaluating
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    tracing::debug!(command = ?std::mem::discriminant(&cli.command), "dispatching command");

    match cli.command {
        Commands::Nodes(args) => commands::nodes::run(args),
        Commands::Bake(args) => commands::bake::run(args),
        Commands::Tick(args) => commands::tick::run(args),
        Commands::Cycles(args) => commands::cycles::run(args),
        Commands::Validate(args) => commands::validate::run(args),
    }
}
