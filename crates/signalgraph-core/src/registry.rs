//! Node registry: the catalog of fundamental node definitions.
//!
//! A `Vec` of descriptor entries built once and looked up by string key.
//! Each descriptor pairs a plain evaluator function pointer with an
//! optional per-instance state factory, since most node types carry no
//! state beyond what `create_state` hands back.

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;
#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::graph::{Node, ParamValue};
use crate::signal::Signal;

/// Opaque per-node mutable state created by a node's `create_state` factory
/// (only `memory` ships one among the built-ins). Boxed so the registry can
/// hand back heterogeneous state without generics leaking into call sites;
/// evaluators downcast back to their own concrete state type via
/// [`core::any::Any`] since the factory and evaluator for a given node type
/// are always paired by the same registry entry.
pub trait NodeState: core::any::Any {
    /// Resets this node instance to its initial state.
    fn reset(&mut self);

    /// Upcasts to `&dyn Any` for downcasting back to the concrete type.
    fn as_any(&self) -> &dyn core::any::Any;

    /// Upcasts to `&mut dyn Any` for downcasting back to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn core::any::Any;
}

/// One tick's worth of carried state for the `memory` node: the value
/// latched on the previous tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryState {
    /// The value this node will emit until overwritten.
    pub latched: Signal,
}

impl NodeState for MemoryState {
    fn reset(&mut self) {
        self.latched = Signal::ZERO;
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
        self
    }
}

/// No built-in node produces more than 2 outputs (`splitter`), so this
/// rarely allocates in practice. Kept as a plain `Vec` for simplicity — the
/// allocation-free discipline that matters is per-tick steady state, not the
/// registry's evaluator signature, and the baker pre-sizes scratch buffers
/// separately (see `baker.rs`).
pub type NodeOutputs = Vec<Signal>;

/// A node's evaluator: pure function from inputs/params/state/tick to a
/// fixed-length output vector (`output_count` values).
pub type NodeEvaluator = fn(&[Signal], &Node, Option<&mut dyn NodeState>, u64) -> NodeOutputs;

/// A node-type's `create_state` factory. `None` for stateless node types.
pub type StateFactory = fn() -> Box<dyn NodeState + Send>;

/// An input port descriptor: name, optional side hint, optional knob
/// parameter-key binding.
#[derive(Debug, Clone, Copy)]
pub struct PortDescriptor {
    /// Display name.
    pub name: &'static str,
    /// If set, this port is a knob port bound to the named parameter key
    ///.
    pub knob_param: Option<&'static str>,
}

impl PortDescriptor {
    /// A plain signal input/output port with no knob binding.
    pub const fn signal(name: &'static str) -> Self {
        PortDescriptor {
            name,
            knob_param: None,
        }
    }

    /// An input port bound to a parameter key.
    pub const fn knob(name: &'static str, param_key: &'static str) -> Self {
        PortDescriptor {
            name,
            knob_param: Some(param_key),
        }
    }
}

/// Numeric bounds or enumerated values for a player-adjustable parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamDescriptor {
    /// The parameter key, matching a [`PortDescriptor::knob_param`].
    pub key: &'static str,
    /// Inclusive numeric bounds.
    pub bounds: (f64, f64),
    /// Default value when the author has not set one.
    pub default: f64,
}

/// Describes one fundamental node type: ports, optional parameters, and the
/// evaluator/state-factory pair the baker/scheduler/cycle-evaluator resolve
/// once at setup time.
#[derive(Clone)]
pub struct NodeDescriptor {
    /// Registry key, matching `Node::node_type`.
    pub type_key: &'static str,
    /// Ordered input ports.
    pub inputs: &'static [PortDescriptor],
    /// Ordered output ports.
    pub outputs: &'static [PortDescriptor],
    /// Player-adjustable parameters, if any.
    pub params: &'static [ParamDescriptor],
    /// Per-instance mutable state factory, if this node type is stateful.
    pub create_state: Option<StateFactory>,
    /// The pure per-tick evaluator.
    pub evaluate: NodeEvaluator,
}

impl NodeDescriptor {
    /// Number of input ports.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of output ports.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// The knob parameter key bound to `port_index`, if any.
    pub fn knob_at(&self, port_index: usize) -> Option<&'static str> {
        self.inputs.get(port_index).and_then(|p| p.knob_param)
    }
}

struct RegistryEntry {
    descriptor: NodeDescriptor,
}

/// Process-wide, read-only catalog of fundamental node definitions. Built
/// once via [`NodeRegistry::new`]; the baker, tick scheduler, and cycle
/// evaluator all resolve `type -> NodeDescriptor` once at setup and never
/// perform reflective string lookup in the per-tick hot path.
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Builds a registry with all built-in node types registered.
    pub fn new() -> Self {
        let mut registry = NodeRegistry {
            entries: Vec::with_capacity(7),
        };
        registry.register_builtins();
        registry
    }

    fn register(&mut self, descriptor: NodeDescriptor) {
        self.entries.push(RegistryEntry { descriptor });
    }

    fn register_builtins(&mut self) {
        self.register(builtins::inverter());
        self.register(builtins::shifter());
        self.register(builtins::splitter());
        self.register(builtins::scale());
        self.register(builtins::amplifier());
        self.register(builtins::memory());
        self.register(builtins::constant());
    }

    /// Looks up a node type's descriptor, or `None` if unregistered — the
    /// baker/evaluators treat `None` as `UnknownNodeType`.
    pub fn get(&self, type_key: &str) -> Option<&NodeDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.type_key == type_key)
            .map(|e| &e.descriptor)
    }

    /// All registered descriptors, for CLI listing (`signalgraph-cli nodes`).
    pub fn all(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Number of registered node types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no node types are registered (never true for `new()`).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Helper to read a numeric param from a node, falling back to `default`.
fn param_num(node: &Node, key: &str, default: f64) -> f64 {
    node.params
        .get(key)
        .and_then(ParamValue::as_number)
        .unwrap_or(default)
}

mod builtins {
    use super::{MemoryState, NodeDescriptor, ParamDescriptor, PortDescriptor};
    use crate::graph::Node;
    use crate::signal::Signal;

    #[cfg(not(feature = "std"))]
    use alloc::boxed::Box;
    #[cfg(not(feature = "std"))]
    use alloc::vec;

    pub fn inverter() -> NodeDescriptor {
        NodeDescriptor {
            type_key: "inverter",
            inputs: const { &[PortDescriptor::signal("in")] },
            outputs: const { &[PortDescriptor::signal("out")] },
            params: &[],
            create_state: None,
            evaluate: |inputs, _node, _state, _tick| {
                let a = inputs.first().copied().unwrap_or(Signal::ZERO);
                vec![Signal::new(-a.value())]
            },
        }
    }

    pub fn shifter() -> NodeDescriptor {
        NodeDescriptor {
            type_key: "shifter",
            inputs: const { &[PortDescriptor::signal("a"), PortDescriptor::signal("b")] },
            outputs: const { &[PortDescriptor::signal("out")] },
            params: &[],
            create_state: None,
            evaluate: |inputs, _node, _state, _tick| {
                let a = inputs.first().copied().unwrap_or(Signal::ZERO);
                let b = inputs.get(1).copied().unwrap_or(Signal::ZERO);
                vec![Signal::new(a.value() + b.value())]
            },
        }
    }

    pub fn splitter() -> NodeDescriptor {
        NodeDescriptor {
            type_key: "splitter",
            inputs: const { &[PortDescriptor::signal("in")] },
            outputs: const { &[PortDescriptor::signal("out_a"), PortDescriptor::signal("out_b")] },
            params: &[],
            create_state: None,
            evaluate: |inputs, _node, _state, _tick| {
                let a = inputs.first().copied().unwrap_or(Signal::ZERO);
                let half = Signal::new(a.value() / 2.0);
                vec![half, half]
            },
        }
    }

    pub fn scale() -> NodeDescriptor {
        NodeDescriptor {
            type_key: "scale",
            inputs: const {
                &[
                    PortDescriptor::signal("a"),
                    PortDescriptor::knob("x", "x"),
                ]
            },
            outputs: const { &[PortDescriptor::signal("out")] },
            params: &[ParamDescriptor {
                key: "x",
                bounds: (-100.0, 100.0),
                default: 0.0,
            }],
            create_state: None,
            evaluate: |inputs, node, _state, _tick| {
                let a = inputs.first().copied().unwrap_or(Signal::ZERO);
                let x = inputs
                    .get(1)
                    .copied()
                    .unwrap_or_else(|| Signal::new(super::param_num(node, "x", 0.0)));
                vec![Signal::new(a.value() * x.value() / 100.0)]
            },
        }
    }

    pub fn amplifier() -> NodeDescriptor {
        NodeDescriptor {
            type_key: "amplifier",
            inputs: const {
                &[
                    PortDescriptor::signal("a"),
                    PortDescriptor::knob("x", "x"),
                ]
            },
            outputs: const { &[PortDescriptor::signal("out")] },
            params: &[ParamDescriptor {
                key: "x",
                bounds: (-100.0, 100.0),
                default: 0.0,
            }],
            create_state: None,
            evaluate: |inputs, node, _state, _tick| {
                let a = inputs.first().copied().unwrap_or(Signal::ZERO);
                let x = inputs
                    .get(1)
                    .copied()
                    .unwrap_or_else(|| Signal::new(super::param_num(node, "x", 0.0)));
                vec![Signal::new(a.value() * (1.0 + x.value() / 100.0))]
            },
        }
    }

    pub fn memory() -> NodeDescriptor {
        NodeDescriptor {
            type_key: "memory",
            inputs: const { &[PortDescriptor::signal("in")] },
            outputs: const { &[PortDescriptor::signal("out")] },
            params: &[],
            create_state: Some(|| Box::new(MemoryState::default())),
            evaluate: |inputs, _node, state, _tick| {
                let incoming = inputs.first().copied().unwrap_or(Signal::ZERO);
                let previous = state
                    .and_then(|s| s.as_any_mut().downcast_mut::<MemoryState>())
                    .map(|mem| {
                        let out = mem.latched;
                        mem.latched = incoming;
                        out
                    })
                    .unwrap_or(Signal::ZERO);
                vec![previous]
            },
        }
    }

    pub fn constant() -> NodeDescriptor {
        NodeDescriptor {
            type_key: "constant",
            inputs: &[],
            outputs: const { &[PortDescriptor::signal("out")] },
            params: &[ParamDescriptor {
                key: "value",
                bounds: (-100.0, 100.0),
                default: 0.0,
            }],
            create_state: None,
            evaluate: |_inputs, node, _state, _tick| {
                vec![Signal::new(super::param_num(node, "value", 0.0))]
            },
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::graph::ParamValue;

        #[test]
        fn inverter_negates() {
            let d = inverter();
            let n = Node::new("n", "inverter").with_ports(1, 1);
            let out = (d.evaluate)(&[Signal::new(60.0)], &n, None, 0);
            assert_eq!(out[0].value(), -60.0);
        }

        #[test]
        fn shifter_adds_and_clamps() {
            let d = shifter();
            let n = Node::new("n", "shifter").with_ports(2, 1);
            let out = (d.evaluate)(&[Signal::new(80.0), Signal::new(80.0)], &n, None, 0);
            assert_eq!(out[0].value(), 100.0);
        }

        #[test]
        fn splitter_halves() {
            let d = splitter();
            let n = Node::new("n", "splitter").with_ports(1, 2);
            let out = (d.evaluate)(&[Signal::new(80.0)], &n, None, 0);
            assert_eq!(out[0].value(), 40.0);
            assert_eq!(out[1].value(), 40.0);
        }

        #[test]
        fn constant_reads_param() {
            let d = constant();
            let n = Node::new("n", "constant")
                .with_ports(0, 1)
                .with_param("value", ParamValue::Number(42.0));
            let out = (d.evaluate)(&[], &n, None, 0);
            assert_eq!(out[0].value(), 42.0);
        }

        #[test]
        fn amplifier_boosts_by_percentage_knob() {
            let d = amplifier();
            let n = Node::new("n", "amplifier").with_ports(2, 1);
            let out = (d.evaluate)(&[Signal::new(100.0), Signal::new(-100.0)], &n, None, 0);
            assert_eq!(out[0].value(), 0.0);
        }

        #[test]
        fn memory_latches_previous_tick() {
            let d = memory();
            let n = Node::new("n", "memory").with_ports(1, 1);
            let mut state = MemoryState::default();
            let out0 = (d.evaluate)(&[Signal::new(7.0)], &n, Some(&mut state), 0);
            assert_eq!(out0[0].value(), 0.0);
            let out1 = (d.evaluate)(&[Signal::new(9.0)], &n, Some(&mut state), 1);
            assert_eq!(out1[0].value(), 7.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_all_builtins() {
        let reg = NodeRegistry::new();
        for key in ["inverter", "shifter", "splitter", "scale", "amplifier", "memory", "constant"] {
            assert!(reg.get(key).is_some(), "missing builtin {key}");
        }
        assert_eq!(reg.len(), 7);
    }

    #[test]
    fn unknown_type_is_none() {
        let reg = NodeRegistry::new();
        assert!(reg.get("not-a-real-node").is_none());
    }

    #[test]
    fn scale_knob_binding_present() {
        let reg = NodeRegistry::new();
        let d = reg.get("scale").unwrap();
        assert_eq!(d.knob_at(1), Some("x"));
    }
}
