#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies one replica participating in the tree. Fits within the low
/// bits of a [`Timestamp`] so that timestamps minted by different replicas
/// can never collide.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReplicaId(pub u32);

impl ReplicaId {
    /// Construct a `ReplicaId` from its raw integer value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Project this id back to its raw integer value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for ReplicaId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A globally unique, strictly positive logical timestamp with the owning
/// replica's id embedded in its low bits (see [`crate::tree::Tree::init`]
/// for the shift-width computation). Timestamp `0` is reserved for the root
/// node and is never produced by the allocator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The sentinel timestamp owned by the immortal root node.
    pub const ROOT: Timestamp = Timestamp(0);

    /// Pack a `counter` and `replica` id into a single timestamp using
    /// `shift` low bits for the replica field: `(counter << shift) | replica`.
    pub fn encode(counter: u64, replica: ReplicaId, shift: u32) -> Timestamp {
        Timestamp((counter << shift) | u64::from(replica.as_u32()))
    }

    /// Recover the counter segment that was shifted into this timestamp.
    pub fn counter(self, shift: u32) -> u64 {
        self.0 >> shift
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Timestamp::ROOT
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
