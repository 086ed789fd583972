use crate::ids::{ReplicaId, Timestamp};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A sequence of timestamps identifying a node by traversal from the root.
/// `[t1, ..., tn]` resolves to the node reached by picking, at each level,
/// the child with that timestamp. As the final element of an `Add`'s path,
/// the special value [`Timestamp::ROOT`] is the insertion sentinel: "at the
/// beginning of the children of the node addressed by the prefix".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Path(pub Vec<Timestamp>);

impl Path {
    pub fn new(segments: impl Into<Vec<Timestamp>>) -> Self {
        Self(segments.into())
    }

    /// Everything but the final segment (the `Add` target's parent path).
    pub fn prefix(&self) -> &[Timestamp] {
        &self.0[..self.0.len().saturating_sub(1)]
    }

    /// The final segment: the anchor of an `Add`, or the node itself for a
    /// `Delete`.
    pub fn last(&self) -> Option<Timestamp> {
        self.0.last().copied()
    }

    pub fn segments(&self) -> &[Timestamp] {
        &self.0
    }

    pub fn push(&mut self, segment: Timestamp) {
        self.0.push(segment);
    }
}

impl From<Vec<Timestamp>> for Path {
    fn from(segments: Vec<Timestamp>) -> Self {
        Self(segments)
    }
}

impl FromIterator<Timestamp> for Path {
    fn from_iter<T: IntoIterator<Item = Timestamp>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The unit of replication. `Add` and `Delete` are the leaf mutations;
/// `Batch` atomically sequences other operations (spec §4.4).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operation<P> {
    /// Insert a new node with `timestamp` and `payload` into the children of
    /// the parent addressed by `path.prefix()`. `path.last()` is the
    /// anchor: the sibling timestamp to insert after, or [`Timestamp::ROOT`]
    /// for "at the front".
    Add {
        replica: ReplicaId,
        timestamp: Timestamp,
        path: Path,
        payload: P,
    },
    /// Mark the node at `path` as a tombstone. `timestamp` is consumed from
    /// the same allocator as `Add` (spec §2 describes the allocator as
    /// producing "operation timestamps", not just node identities) purely
    /// to give every log entry a comparable position for
    /// [`crate::tree::Tree::operations_since`]; it plays no role in
    /// addressing, since `path` already identifies the node to tombstone.
    Delete {
        replica: ReplicaId,
        timestamp: Timestamp,
        path: Path,
    },
    /// Apply every operation in order, atomically: the first failure
    /// discards all changes made so far in the batch.
    Batch(Vec<Operation<P>>),
}

impl<P> Operation<P> {
    pub fn add(replica: ReplicaId, timestamp: Timestamp, path: Path, payload: P) -> Self {
        Operation::Add {
            replica,
            timestamp,
            path,
            payload,
        }
    }

    pub fn delete(replica: ReplicaId, timestamp: Timestamp, path: Path) -> Self {
        Operation::Delete {
            replica,
            timestamp,
            path,
        }
    }

    /// The operation's own timestamp, used to order log entries for
    /// [`crate::tree::Tree::operations_since`]. Never called on `Batch`,
    /// which is never itself stored in the log (spec §4.5.5: flattened).
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Operation::Add { timestamp, .. } => *timestamp,
            Operation::Delete { timestamp, .. } => *timestamp,
            Operation::Batch(_) => Timestamp::ROOT,
        }
    }

    pub fn batch(ops: Vec<Operation<P>>) -> Self {
        Operation::Batch(ops)
    }

    /// `true` for an empty `Batch`, which is always a no-op success.
    pub fn is_empty_batch(&self) -> bool {
        matches!(self, Operation::Batch(ops) if ops.is_empty())
    }
}

/// Deferred local builders (spec §4.5.2). These capture intent without
/// touching tree state; [`crate::tree::Tree::batch`] and
/// [`crate::tree::Tree::apply_builder`] synthesize a fresh [`Operation`]
/// from the tree's current allocator state when the builder is consumed.
#[derive(Clone, Debug)]
pub enum Builder<P> {
    /// Insert `payload` as a sibling of the builder cursor's current
    /// anchor. Subsequent builders in the same batch target the same
    /// parent, anchored at this node.
    Add(P),
    /// Like `Add`, but subsequent builders in the same batch target this
    /// node's children, anchored at the front (`Timestamp::ROOT`).
    AddBranch(P),
    /// Delete the node at `path`.
    Delete(Path),
}
