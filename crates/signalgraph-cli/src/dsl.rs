//! Graph topology DSL: a pipe-chain grammar parsed directly into
//! `(nodes, wires)` pairs, the same shapes `Graph::add_node`/`add_wire`
//! take.
//!
//! ```text
//! # Linear chain
//! constant:value=5 | scale:factor=2 | inverter
//!
//! # Parallel split, recombined by an implicit two-input merge
//! split(inverter; scale:factor=3)
//! ```
//!
//! ## Grammar
//!
//! ```text
//! graph       ::= path
//! path        ::= segment ( '|' segment )*
//! segment     ::= split_expr | node_spec
//! node_spec   ::= name ( ':' key '=' value ( ',' key '=' value )* )?
//! split_expr  ::= 'split(' path ';' path ')'
//! ```
//!
//! `split(...)` always takes exactly two paths: the `splitter` node type has
//! a fixed two outputs, and the two paths are recombined through a `shifter`
//! node acting as a two-input merge. Node types that need more than one
//! meaningfully-distinct input (e.g. a `shifter` used directly in a chain)
//! only get their first input port wired; the rest read as port constants.
//! Graphs with richer wiring should use the JSON document format instead.

use signalgraph_core::graph::{ParamValue, PortRef};
use signalgraph_core::{Node, Wire};
use std::collections::HashMap;

/// Errors from DSL parsing or graph construction.
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    /// Unexpected character during parsing.
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar {
        /// Byte position in the input string.
        pos: usize,
        /// The unexpected character.
        ch: char,
    },
    /// Missing closing parenthesis for `split(...)`.
    #[error("unclosed split at position {pos} (expected ')')")]
    UnclosedSplit {
        /// Position of the opening `split(`.
        pos: usize,
    },
    /// `split()` requires exactly two semicolon-separated paths.
    #[error("split requires exactly 2 paths (found {count})")]
    SplitWrongPathCount {
        /// Number of paths found.
        count: usize,
    },
    /// A node name was empty.
    #[error("empty node name at position {pos}")]
    EmptyName {
        /// Position of the empty name.
        pos: usize,
    },
    /// Parameter parsing error.
    #[error("parameter error at position {pos}: {message}")]
    ParamError {
        /// Byte position.
        pos: usize,
        /// Description.
        message: String,
    },
}

/// A node in the parsed graph specification.
#[derive(Debug, Clone, PartialEq)]
enum GraphNode {
    NodeSpec {
        name: String,
        params: HashMap<String, String>,
    },
    Split {
        left: Vec<GraphNode>,
        right: Vec<GraphNode>,
    },
}

type GraphSpec = Vec<GraphNode>;

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).map(|&b| b as char)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_ws(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s.as_bytes())
    }

    fn parse_graph(&mut self) -> Result<GraphSpec, DslError> {
        let spec = self.parse_path()?;
        self.skip_ws();
        if let Some(ch) = self.peek() {
            return Err(DslError::UnexpectedChar { pos: self.pos, ch });
        }
        Ok(spec)
    }

    /// `path ::= segment ( '|' segment )*`
    fn parse_path(&mut self) -> Result<Vec<GraphNode>, DslError> {
        let mut nodes = vec![self.parse_segment()?];
        loop {
            self.skip_ws();
            if self.peek() == Some('|') {
                self.advance();
                nodes.push(self.parse_segment()?);
            } else {
                break;
            }
        }
        Ok(nodes)
    }

    /// `segment ::= split_expr | node_spec`
    fn parse_segment(&mut self) -> Result<GraphNode, DslError> {
        self.skip_ws();
        if self.starts_with("split(") {
            return self.parse_split();
        }
        self.parse_node_spec()
    }

    /// `split_expr ::= 'split(' path ';' path ')'`
    fn parse_split(&mut self) -> Result<GraphNode, DslError> {
        let open_pos = self.pos;
        self.pos += 6; // consume "split("

        let mut paths = vec![self.parse_path()?];
        loop {
            self.skip_ws();
            if self.peek() == Some(';') {
                self.advance();
                paths.push(self.parse_path()?);
            } else {
                break;
            }
        }

        self.skip_ws();
        if self.peek() != Some(')') {
            return Err(DslError::UnclosedSplit { pos: open_pos });
        }
        self.advance();

        if paths.len() != 2 {
            return Err(DslError::SplitWrongPathCount { count: paths.len() });
        }
        let right = paths.pop().expect("checked len == 2");
        let left = paths.pop().expect("checked len == 2");
        Ok(GraphNode::Split { left, right })
    }

    /// `node_spec ::= name ( ':' key '=' value ( ',' key '=' value )* )?`
    fn parse_node_spec(&mut self) -> Result<GraphNode, DslError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if matches!(ch, ':' | '|' | ';' | ')') {
                break;
            }
            self.advance();
        }
        let name = std::str::from_utf8(&self.input[start..self.pos])
            .expect("DSL input should be valid UTF-8")
            .trim()
            .to_string();
        if name.is_empty() {
            return Err(DslError::EmptyName { pos: start });
        }

        let mut params = HashMap::new();
        if self.peek() == Some(':') {
            self.advance();
            self.parse_params(&mut params)?;
        }
        Ok(GraphNode::NodeSpec { name, params })
    }

    fn parse_params(&mut self, params: &mut HashMap<String, String>) -> Result<(), DslError> {
        loop {
            self.skip_ws();
            let key_start = self.pos;
            while let Some(ch) = self.peek() {
                if ch == '=' {
                    break;
                }
                if matches!(ch, '|' | ';' | ')' | ',') {
                    return Err(DslError::ParamError {
                        pos: key_start,
                        message: "expected 'key=value'".to_string(),
                    });
                }
                self.advance();
            }
            if self.peek() != Some('=') {
                return Err(DslError::ParamError {
                    pos: key_start,
                    message: "expected 'key=value'".to_string(),
                });
            }
            let key = std::str::from_utf8(&self.input[key_start..self.pos])
                .expect("UTF-8")
                .trim()
                .to_string();
            self.advance(); // consume '='

            let val_start = self.pos;
            while let Some(ch) = self.peek() {
                if matches!(ch, ',' | '|' | ';' | ')') {
                    break;
                }
                self.advance();
            }
            let value = std::str::from_utf8(&self.input[val_start..self.pos])
                .expect("UTF-8")
                .trim()
                .to_string();
            params.insert(key, value);

            if self.peek() == Some(',') {
                self.advance();
            } else {
                break;
            }
        }
        Ok(())
    }
}

/// Parse a graph DSL string into the internal spec representation.
fn parse_graph_dsl(input: &str) -> Result<GraphSpec, DslError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DslError::EmptyName { pos: 0 });
    }
    Parser::new(input).parse_graph()
}

struct Builder {
    next_id: u32,
    next_wire: u32,
    nodes: HashMap<signalgraph_core::NodeId, Node>,
    wires: Vec<Wire>,
}

impl Builder {
    fn fresh_id(&mut self) -> signalgraph_core::NodeId {
        let id = signalgraph_core::NodeId::new(format!("n{}", self.next_id));
        self.next_id += 1;
        id
    }

    fn wire(&mut self, from: PortRef, to: PortRef) {
        let id = format!("w{}", self.next_wire);
        self.next_wire += 1;
        self.wires.push(Wire::new(id, from, to));
    }

    fn add_node_spec(&mut self, name: &str, params: &HashMap<String, String>) -> Result<signalgraph_core::NodeId, DslError> {
        let (input_count, output_count) = node_type_ports(name);
        let mut node = Node::new(self.fresh_id(), name).with_ports(input_count, output_count);
        for (key, raw) in params {
            let value = raw.parse::<f64>().map(ParamValue::Number).unwrap_or_else(|_| ParamValue::Text(raw.clone()));
            node = node.with_param(key.clone(), value);
        }
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Builds one segment, returning `(entry, entry_port, exit, exit_port)`.
    fn build_segment(&mut self, node: &GraphNode) -> Result<(signalgraph_core::NodeId, usize, signalgraph_core::NodeId, usize), DslError> {
        match node {
            GraphNode::NodeSpec { name, params } => {
                let id = self.add_node_spec(name, params)?;
                Ok((id.clone(), 0, id, 0))
            }
            GraphNode::Split { left, right } => {
                let split_id = self.add_node_spec("splitter", &HashMap::new())?;
                let merge_id = self.add_node_spec("shifter", &HashMap::new())?;

                let (left_entry, left_entry_port, left_exit, left_exit_port) = self.build_path(left)?;
                self.wire(PortRef::new(split_id.clone(), 0), PortRef::new(left_entry, left_entry_port));
                self.wire(PortRef::new(left_exit, left_exit_port), PortRef::new(merge_id.clone(), 0));

                let (right_entry, right_entry_port, right_exit, right_exit_port) = self.build_path(right)?;
                self.wire(PortRef::new(split_id.clone(), 1), PortRef::new(right_entry, right_entry_port));
                self.wire(PortRef::new(right_exit, right_exit_port), PortRef::new(merge_id.clone(), 1));

                Ok((split_id, 0, merge_id, 0))
            }
        }
    }

    /// Builds a serial path, returning `(entry, entry_port, exit, exit_port)`.
    fn build_path(&mut self, nodes: &[GraphNode]) -> Result<(signalgraph_core::NodeId, usize, signalgraph_core::NodeId, usize), DslError> {
        let mut segments = Vec::with_capacity(nodes.len());
        for node in nodes {
            segments.push(self.build_segment(node)?);
        }
        for i in 1..segments.len() {
            let (_, _, prev_exit, prev_exit_port) = segments[i - 1].clone();
            let (next_entry, next_entry_port, _, _) = segments[i].clone();
            self.wire(PortRef::new(prev_exit, prev_exit_port), PortRef::new(next_entry, next_entry_port));
        }
        let first = segments.first().expect("path is never empty").clone();
        let last = segments.last().expect("path is never empty").clone();
        Ok((first.0, first.1, last.2, last.3))
    }
}

/// Known built-in port counts, used so DSL-authored nodes carry the right
/// shape without a registry lookup at parse time.
fn node_type_ports(name: &str) -> (usize, usize) {
    match name {
        "inverter" | "scale" | "memory" => (1, 1),
        "shifter" => (2, 1),
        "splitter" => (1, 2),
        "constant" => (0, 1),
        _ => (1, 1),
    }
}

/// Parses `input` and builds a `(nodes, wires)` pair wired between input
/// connection point 0 and output connection point 0.
///
/// # Errors
///
/// Returns [`DslError`] on a syntax error.
pub fn build_graph(input: &str) -> Result<(HashMap<signalgraph_core::NodeId, Node>, Vec<Wire>), DslError> {
    let spec = parse_graph_dsl(input)?;
    let mut builder = Builder {
        next_id: 0,
        next_wire: 0,
        nodes: HashMap::new(),
        wires: Vec::new(),
    };
    let (entry, entry_port, exit, exit_port) = builder.build_path(&spec)?;

    let cp_in = signalgraph_core::NodeId::cp_input(0);
    let cp_out = signalgraph_core::NodeId::cp_output(0);
    builder.wire(PortRef::new(cp_in, 0), PortRef::new(entry, entry_port));
    builder.wire(PortRef::new(exit, exit_port), PortRef::new(cp_out, 0));

    Ok((builder.nodes, builder.wires))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linear_chain() {
        let (nodes, wires) = build_graph("constant:value=5 | scale:factor=2 | inverter").unwrap();
        assert_eq!(nodes.len(), 3);
        // 2 chain wires + 2 CP wires
        assert_eq!(wires.len(), 4);
    }

    #[test]
    fn parses_split_with_merge() {
        let (nodes, wires) = build_graph("split(inverter; scale:factor=3)").unwrap();
        // splitter + shifter + 2 inner nodes
        assert_eq!(nodes.len(), 4);
        assert_eq!(wires.len(), 6);
    }

    #[test]
    fn rejects_unclosed_split() {
        let err = build_graph("split(inverter; scale").unwrap_err();
        assert!(matches!(err, DslError::UnclosedSplit { .. }));
    }

    #[test]
    fn rejects_single_path_split() {
        let err = build_graph("split(inverter)").unwrap_err();
        assert!(matches!(err, DslError::SplitWrongPathCount { count: 1 }));
    }
}
