//! Subcommand implementations.

pub mod bake;
pub mod cycles;
pub mod nodes;
pub mod tick;
pub mod validate;
