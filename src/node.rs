use crate::ids::Timestamp;

/// Index into [`crate::tree::Tree`]'s node arena. The root occupies handle
/// `0`. Handles are non-owning back-references; ownership flows from parent
/// to child through `children`, never the reverse.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeHandle(pub usize);

impl NodeHandle {
    pub const ROOT: NodeHandle = NodeHandle(0);
}

/// A node in the replicated tree. Nodes are created by a successful `Add`,
/// mutated only to flip `deleted` true by a `Delete`, and never destroyed
/// (spec §3.6).
///
/// Not `serde`-derived: `children`/`parent` are process-local arena handles
/// ([`NodeHandle`]), not stable identifiers, so serializing a `Node` would
/// not make sense across a wire boundary. The crate's `serde` feature (spec
/// §2) covers [`Operation`](crate::ops::Operation) and
/// [`Path`](crate::ops::Path) — the values that actually cross replicas —
/// not internal storage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node<P> {
    pub timestamp: Timestamp,
    pub payload: Option<P>,
    pub deleted: bool,
    pub children: Vec<NodeHandle>,
    pub parent: Option<NodeHandle>,
    /// The anchor this node was inserted after (spec §4.5.4): either a
    /// sibling's timestamp, or [`Timestamp::ROOT`] for "front of the
    /// parent's children". Used only to break ties between concurrent
    /// insertions sharing the same anchor; it is not a tree-structural
    /// back-reference.
    pub origin: Timestamp,
}

impl<P> Node<P> {
    /// The immortal root: timestamp `0`, no payload, never tombstoned, no
    /// parent, initially childless.
    pub fn root() -> Self {
        Self {
            timestamp: Timestamp::ROOT,
            payload: None,
            deleted: false,
            children: Vec::new(),
            parent: None,
            origin: Timestamp::ROOT,
        }
    }

    pub fn new(timestamp: Timestamp, payload: P, parent: NodeHandle, origin: Timestamp) -> Self {
        Self {
            timestamp,
            payload: Some(payload),
            deleted: false,
            children: Vec::new(),
            parent: Some(parent),
            origin,
        }
    }
}
