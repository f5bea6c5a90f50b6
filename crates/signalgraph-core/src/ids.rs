//! Node identifiers and the reserved id patterns that denote virtual
//! connection-point and slot nodes.

#[cfg(not(feature = "std"))]
use alloc::string::String;
#[cfg(not(feature = "std"))]
use alloc::format;

/// Opaque node identifier.
///
/// Certain string patterns are reserved and denote virtual nodes that exist
/// in the node mapping but have no per-instance evaluator: input/output
/// connection points, bidirectional connection points (pre-bake only), and
/// creative/utility slots. See [`CpKind`] and [`NodeId::reserved_kind`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    /// Wraps an arbitrary string as a node id.
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    /// The id of the input connection point at index `i`.
    pub fn cp_input(i: u32) -> Self {
        NodeId(format!("__cp_input_{i}__"))
    }

    /// The id of the output connection point at index `i`.
    pub fn cp_output(i: u32) -> Self {
        NodeId(format!("__cp_output_{i}__"))
    }

    /// The id of the bidirectional connection point at slot `i` (0..6).
    /// Only meaningful before the baker's bidirectional-CP normalization
    /// pass (§4.6 step 1).
    pub fn cp_bidir(i: u32) -> Self {
        NodeId(format!("__cp_bidir_{i}__"))
    }

    /// The id of the creative slot at index `i` (0..6).
    pub fn cp_creative(i: u32) -> Self {
        NodeId(format!("__cp_creative_{i}__"))
    }

    /// The id of the utility slot at index `i` (0..6).
    pub fn cp_utility(i: u32) -> Self {
        NodeId(format!("__cp_utility_{i}__"))
    }

    /// The underlying string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classifies this id as a reserved virtual-node pattern, or `None` if
    /// it is an ordinary processing-node id.
    pub fn reserved_kind(&self) -> Option<CpKind> {
        let s = self.0.as_str();
        parse_reserved(s)
    }

    /// True if this id denotes any reserved virtual node (connection point
    /// or slot), false for ordinary processing nodes.
    pub fn is_reserved(&self) -> bool {
        self.reserved_kind().is_some()
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId::new(s)
    }
}

/// The reserved virtual-node kinds recognized by id pattern, each carrying
/// its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpKind {
    /// Input connection point, index i.
    Input(u32),
    /// Output connection point, index i.
    Output(u32),
    /// Bidirectional connection point, index i (pre-bake only).
    Bidir(u32),
    /// Creative slot, index i in 0..6.
    Creative(u32),
    /// Utility slot, index i in 0..6.
    Utility(u32),
}

fn parse_reserved(s: &str) -> Option<CpKind> {
    let body = s.strip_prefix("__cp_")?.strip_suffix("__")?;
    let (kind, idx_str) = body.rsplit_once('_')?;
    let idx: u32 = idx_str.parse().ok()?;
    match kind {
        "input" => Some(CpKind::Input(idx)),
        "output" => Some(CpKind::Output(idx)),
        "bidir" => Some(CpKind::Bidir(idx)),
        "creative" => Some(CpKind::Creative(idx)),
        "utility" => Some(CpKind::Utility(idx)),
        _ => None,
    }
}
