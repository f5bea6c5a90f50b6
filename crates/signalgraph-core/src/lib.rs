//! Signal-graph engine: compiles a user-authored directed graph of scalar
//! signal-processing nodes into an executable form and evaluates it
//! deterministically, either tick-by-tick (streaming) or as a whole-cycle
//! batch (offline).
//!
//! The crate is organized around the four subsystems that make up the
//! compile-and-evaluate pipeline:
//!
//! - [`sort`] — topological ordering with depth tracking and cycle diagnostics.
//! - [`delay`] and [`wire_delay`] — latency analysis and wire-delay budget
//!   distribution.
//! - [`baker`] — lowers a graph into a reusable `evaluate(inputs) -> outputs`
//!   closure plus serializable metadata.
//! - [`scheduler`] and [`cycle`] — the two evaluators: a streaming tick
//!   scheduler and a batch cycle evaluator.
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod baker;
pub mod cycle;
pub mod delay;
pub mod graph;
pub mod ids;
pub mod liveness;
pub mod registry;
pub mod ringbuffer;
pub mod scheduler;
pub mod signal;
pub mod sort;
pub mod wire_delay;

pub use baker::{
    bake_graph, reconstruct_from_metadata, BakeError, BakeResult, BakedGraph, BakedMetadata,
    BidirDirection, EdgeConfig, NodeConfig,
};
pub use cycle::{evaluate_all_cycles, CycleEvalError, CycleEvaluator, CycleResults};
pub use delay::{analyze_delays, DelayAnalysis, PortSource};
pub use graph::{Graph, GraphValidationError, Node, ParamValue, PortConstant, Wire};
pub use ids::{CpKind, NodeId};
pub use liveness::compute_live_nodes;
pub use registry::{NodeDescriptor, NodeRegistry, ParamDescriptor, PortDescriptor};
pub use scheduler::{advance_tick, create_scheduler_state, SchedulerState};
pub use signal::{Signal, SIGNAL_RANGE, TOTAL_TICKS};
pub use sort::{topological_sort, topological_sort_with_depths, SortError, TopoOrder};
pub use wire_delay::{compute_wire_delays, WireDelayAnalysis};
