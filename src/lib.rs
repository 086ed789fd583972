#![forbid(unsafe_code)]
//! A replicated, ordered tree CRDT: an operation-based conflict-free
//! replicated data type for a hierarchical tree of opaque payloads, where
//! each node's position among its siblings is explicit and converges
//! regardless of delivery order (spec §1-§2).
//!
//! This crate covers the data structure itself — timestamp allocation,
//! node storage, the `Add`/`Delete`/`Batch` operation log, and the tree
//! engine that applies them. It intentionally does not cover network
//! transport, persistence, a wire serialization format, access control,
//! tombstone garbage collection, or replica-set membership changes; hosts
//! compose those concerns around it.

pub mod error;
pub mod ids;
pub mod node;
pub mod ops;
pub mod traits;
pub mod tree;

pub use error::{Error, Result};
pub use ids::{ReplicaId, Timestamp};
pub use node::{Node, NodeHandle};
pub use ops::{Builder, Operation, Path};
pub use traits::{Clock, LamportClock};
pub use tree::{Tree, TreeConfig};

/// Defer a local insertion as a sibling of the previous builder in the
/// same batch (or at the front of the target's children if first in the
/// batch). Pass the resulting [`Builder`] sequence to [`Tree::batch`].
pub fn add<P>(payload: P) -> Builder<P> {
    Builder::Add(payload)
}

/// Like [`add`], but subsequent builders in the same batch become this
/// node's children instead of its siblings.
pub fn add_branch<P>(payload: P) -> Builder<P> {
    Builder::AddBranch(payload)
}

/// Defer a local deletion of the node at `path`.
pub fn delete<P>(path: Path) -> Builder<P> {
    Builder::Delete(path)
}
