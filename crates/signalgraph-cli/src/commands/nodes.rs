//! Node-registry listing command.

use clap::Args;
use signalgraph_core::NodeRegistry;

/// List registered node types and their ports/parameters.
#[derive(Args)]
pub struct NodesArgs {
    /// Show details for a single node type.
    #[arg(value_name = "TYPE")]
    node_type: Option<String>,
}

/// Runs the `nodes` command.
pub fn run(args: NodesArgs) -> anyhow::Result<()> {
    let registry = NodeRegistry::new();

    if let Some(type_key) = &args.node_type {
        let descriptor = registry
            .get(type_key)
            .ok_or_else(|| anyhow::anyhow!("unknown node type: {type_key}"))?;
        println!("{}", descriptor.type_key);
        println!("{}", "=".repeat(descriptor.type_key.len()));
        println!();
        println!("Inputs:");
        for (i, port) in descriptor.inputs.iter().enumerate() {
            match port.knob_param {
                Some(key) => println!("  {i}: {} (knob: {key})", port.name),
                None => println!("  {i}: {}", port.name),
            }
        }
        println!("Outputs:");
        for (i, port) in descriptor.outputs.iter().enumerate() {
            println!("  {i}: {}", port.name);
        }
        if !descriptor.params.is_empty() {
            println!("Parameters:");
            for param in descriptor.params {
                println!("  {}: default {} in [{}, {}]", param.key, param.default, param.bounds.0, param.bounds.1);
            }
        }
        return Ok(());
    }

    println!("{:14}  {:6}  {:7}  {}", "Type", "Inputs", "Outputs", "Params");
    println!("{:14}  {:6}  {:7}  {}", "----", "------", "-------", "------");
    for descriptor in registry.all() {
        let param_keys: Vec<&str> = descriptor.params.iter().map(|p| p.key).collect();
        println!(
            "{:14}  {:6}  {:7}  {}",
            descriptor.type_key,
            descriptor.input_count(),
            descriptor.output_count(),
            param_keys.join(", ")
        );
    }
    Ok(())
}
