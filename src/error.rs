use thiserror::Error;

use crate::ids::Timestamp;

pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy of the tree CRDT. All variants are local and
/// non-fatal: the caller gets the error back along with the unchanged tree.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// A path segment, or the anchor sibling of an `Add`, does not resolve
    /// to an existing node.
    #[error("path segment not found: {0:?}")]
    NotFound(Timestamp),

    /// The addressed parent has already been tombstoned; insertion beneath
    /// it is forbidden (spec §3.5: a tombstoned subtree is frozen). Whether
    /// this is hit for a given `Add` depends on delivery order relative to
    /// the `Delete` of its parent — accepted, documented behavior for
    /// operations that were never causally ordered (spec §1, §8 S4), not a
    /// convergence guarantee.
    #[error("parent {0:?} has been deleted")]
    ParentDeleted(Timestamp),

    /// A remote `Add` reused a timestamp that is already present in the
    /// tree under a different parent or with a different payload. Genuine
    /// timestamps are globally unique by construction (§3.2); this can only
    /// happen if a peer delivered a malformed operation, and the engine
    /// refuses it rather than silently overwriting existing state.
    #[error("timestamp {0:?} is already in use by a conflicting node")]
    MalformedTimestamp(Timestamp),
}
