use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ids::{ReplicaId, Timestamp};
use crate::node::{Node, NodeHandle};
use crate::ops::{Builder, Operation, Path};
use crate::traits::{Clock, LamportClock};

/// Construction parameters for [`Tree::init`]. `max_replicas` fixes the
/// width of the replica-id field packed into every timestamp this tree
/// mints (spec §3.2); it does not bound which replica ids may later be
/// *observed* from remote operations, only how many bits this tree reserves
/// for its own allocations.
#[derive(Clone, Copy, Debug)]
pub struct TreeConfig {
    pub id: u32,
    pub max_replicas: u32,
}

fn shift_for(max_replicas: u32) -> u32 {
    if max_replicas <= 1 {
        0
    } else {
        max_replicas.next_power_of_two().trailing_zeros()
    }
}

#[derive(Clone)]
struct Snapshot<P, C> {
    arena: Vec<Node<P>>,
    index: HashMap<Timestamp, NodeHandle>,
    log: Vec<Operation<P>>,
    clock: C,
}

/// The replicated ordered tree. Generic over the payload type `P` (an
/// opaque value per spec §3.3) and the logical clock implementation `C`
/// (defaults to [`LamportClock`]).
///
/// A `Tree` owns its arena, log, and clock exclusively (spec §5); parent
/// back-references are non-owning handles into the arena.
#[derive(Clone)]
pub struct Tree<P, C = LamportClock> {
    id: ReplicaId,
    shift: u32,
    clock: C,
    arena: Vec<Node<P>>,
    index: HashMap<Timestamp, NodeHandle>,
    log: Vec<Operation<P>>,
    last_operation: Operation<P>,
}

impl<P> Tree<P, LamportClock> {
    /// Construct a tree with a default [`LamportClock`]: the root node
    /// (timestamp `0`, no payload, not deleted, no children, no parent), an
    /// empty operation log, `last_operation = Batch([])`, and a timestamp
    /// allocator keyed by `config.id` with shift width determined by
    /// `config.max_replicas` (spec §4.5.1).
    pub fn init(config: TreeConfig) -> Self {
        Self::init_with_clock(config, LamportClock::default())
    }
}

impl<P, C: Clock> Tree<P, C> {
    /// Like [`Tree::init`], but with an explicitly supplied clock
    /// implementation (spec §4.2 design note: the allocator is pluggable).
    pub fn init_with_clock(config: TreeConfig, clock: C) -> Self {
        let mut arena = Vec::with_capacity(1);
        arena.push(Node::root());
        let mut index = HashMap::new();
        index.insert(Timestamp::ROOT, NodeHandle::ROOT);
        log::debug!(
            "tree initialized: replica={} max_replicas={}",
            config.id,
            config.max_replicas
        );
        Self {
            id: ReplicaId::new(config.id),
            shift: shift_for(config.max_replicas),
            clock,
            arena,
            index,
            log: Vec::new(),
            last_operation: Operation::Batch(Vec::new()),
        }
    }

    /// This replica's id.
    pub fn replica_id(&self) -> ReplicaId {
        self.id
    }

    /// Number of live (non-tombstoned) nodes, excluding the root.
    pub fn len(&self) -> usize {
        self.arena
            .iter()
            .skip(1)
            .filter(|node| !node.deleted)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_timestamp(&mut self) -> Timestamp {
        let counter = self.clock.tick();
        Timestamp::encode(counter, self.id, self.shift)
    }

    fn observe(&mut self, timestamp: Timestamp) {
        self.clock.observe(timestamp.counter(self.shift));
    }

    fn resolve(&self, segments: &[Timestamp]) -> Result<NodeHandle> {
        let mut current = NodeHandle::ROOT;
        for &segment in segments {
            let handle = *self.index.get(&segment).ok_or(Error::NotFound(segment))?;
            if self.arena[handle.0].parent != Some(current) {
                return Err(Error::NotFound(segment));
            }
            current = handle;
        }
        Ok(current)
    }

    fn full_path(&self, handle: NodeHandle) -> Path {
        let mut segments = Vec::new();
        let mut current = handle;
        while current != NodeHandle::ROOT {
            let node = &self.arena[current.0];
            segments.push(node.timestamp);
            current = node.parent.expect("non-root node always has a parent");
        }
        segments.reverse();
        Path(segments)
    }

    /// Position within `parent`'s children where a node with `new_ts`
    /// anchored at `anchor` belongs: immediately after `anchor` (or at
    /// index `0` if `anchor` is the front sentinel), skipping past any
    /// existing sibling that shares the same anchor and has a *higher*
    /// timestamp — those stay closer to the anchor (spec §4.5.4).
    fn insertion_position(
        &self,
        parent: NodeHandle,
        anchor: Timestamp,
        new_ts: Timestamp,
    ) -> Result<usize> {
        let children = &self.arena[parent.0].children;
        let mut pos = if anchor.is_root() {
            0
        } else {
            let idx = children
                .iter()
                .position(|&h| self.arena[h.0].timestamp == anchor)
                .ok_or(Error::NotFound(anchor))?;
            idx + 1
        };
        while pos < children.len() {
            let candidate = &self.arena[children[pos].0];
            if candidate.origin == anchor && candidate.timestamp > new_ts {
                pos += 1;
            } else {
                break;
            }
        }
        Ok(pos)
    }

    /// Apply one `Add`. Returns whether it changed tree state (`false` for
    /// an idempotent duplicate delivery) and the handle of the (possibly
    /// pre-existing) node.
    ///
    /// Rejects with `ParentDeleted` if the resolved parent is already
    /// tombstoned (spec §4.5.3 step 2, §3.5: a tombstoned subtree is
    /// frozen). This makes `apply` order-sensitive for an `Add` racing a
    /// concurrent `Delete` of its own parent: whichever is applied first
    /// determines the outcome. This is accepted, documented behavior (spec
    /// §8 scenario S4), not a convergence bug — the engine does not
    /// guarantee convergence for replicas that have not observed the same
    /// operations in a causally consistent order, and causal-delivery
    /// enforcement is explicitly out of scope (spec §1).
    fn apply_add(
        &mut self,
        timestamp: Timestamp,
        path: &Path,
        payload: P,
    ) -> Result<(bool, NodeHandle)>
    where
        P: Clone + PartialEq,
    {
        let parent = self.resolve(path.prefix())?;
        if self.arena[parent.0].deleted {
            log::debug!("add {:?} rejected: parent {:?} deleted", timestamp, parent);
            return Err(Error::ParentDeleted(self.arena[parent.0].timestamp));
        }

        if let Some(&existing) = self.index.get(&timestamp) {
            let node = &self.arena[existing.0];
            if node.parent == Some(parent) && node.payload.as_ref() == Some(&payload) {
                log::trace!("add {:?} is a duplicate delivery, ignoring", timestamp);
                return Ok((false, existing));
            }
            return Err(Error::MalformedTimestamp(timestamp));
        }

        let anchor = path.last().unwrap_or(Timestamp::ROOT);
        let position = self.insertion_position(parent, anchor, timestamp)?;

        let handle = NodeHandle(self.arena.len());
        self.arena.push(Node::new(timestamp, payload, parent, anchor));
        self.arena[parent.0].children.insert(position, handle);
        self.index.insert(timestamp, handle);
        self.observe(timestamp);
        log::trace!(
            "add {:?} under {:?} at position {}",
            timestamp,
            parent,
            position
        );
        Ok((true, handle))
    }

    /// Apply one `Delete`. Returns `false` if the node was already
    /// tombstoned (idempotent no-op).
    fn apply_delete(&mut self, timestamp: Timestamp, path: &Path) -> Result<bool> {
        let handle = self.resolve(path.segments())?;
        self.observe(timestamp);
        if handle == NodeHandle::ROOT || self.arena[handle.0].deleted {
            log::trace!("delete {:?} is a no-op", handle);
            return Ok(false);
        }
        self.arena[handle.0].deleted = true;
        self.arena[handle.0].payload = None;
        log::trace!("delete {:?} applied", handle);
        Ok(true)
    }

    /// Apply one operation, recursing through nested `Batch`es, mutating
    /// `self` in place. Returns the flattened list of leaf operations that
    /// actually changed state. Callers are responsible for snapshotting
    /// `self` beforehand and restoring on `Err` to preserve atomicity.
    fn apply_inner(&mut self, op: Operation<P>) -> Result<Vec<Operation<P>>>
    where
        P: Clone + PartialEq,
    {
        match op {
            Operation::Add {
                replica,
                timestamp,
                path,
                payload,
            } => {
                let (changed, _) = self.apply_add(timestamp, &path, payload.clone())?;
                if !changed {
                    return Ok(Vec::new());
                }
                let op = Operation::Add {
                    replica,
                    timestamp,
                    path,
                    payload,
                };
                self.log.push(op.clone());
                Ok(vec![op])
            }
            Operation::Delete {
                replica,
                timestamp,
                path,
            } => {
                let changed = self.apply_delete(timestamp, &path)?;
                if !changed {
                    return Ok(Vec::new());
                }
                let op = Operation::Delete {
                    replica,
                    timestamp,
                    path,
                };
                self.log.push(op.clone());
                Ok(vec![op])
            }
            Operation::Batch(ops) => {
                let mut effective = Vec::new();
                for sub in ops {
                    effective.extend(self.apply_inner(sub)?);
                }
                Ok(effective)
            }
        }
    }

    fn snapshot(&self) -> Snapshot<P, C>
    where
        P: Clone,
        C: Clone,
    {
        Snapshot {
            arena: self.arena.clone(),
            index: self.index.clone(),
            log: self.log.clone(),
            clock: self.clock.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot<P, C>) {
        self.arena = snapshot.arena;
        self.index = snapshot.index;
        self.log = snapshot.log;
        self.clock = snapshot.clock;
    }

    /// Apply a fully-formed operation — local or received from a peer —
    /// against the tree. On success, `last_operation()` reflects the call:
    /// a plain `Add`/`Delete` sets it to that operation verbatim; a `Batch`
    /// sets it to `Batch` of just the sub-operations that actually changed
    /// state, with duplicates suppressed (spec §4.5.3, §9). On failure the
    /// tree is left exactly as it was (spec §4.5.6).
    pub fn apply(&mut self, op: Operation<P>) -> Result<()>
    where
        P: Clone + PartialEq,
        C: Clone,
    {
        let is_batch = matches!(op, Operation::Batch(_));
        let snapshot = self.snapshot();
        match self.apply_inner(op.clone()) {
            Ok(effective) => {
                self.last_operation = if is_batch {
                    Operation::Batch(effective)
                } else {
                    op
                };
                Ok(())
            }
            Err(err) => {
                log::debug!("apply failed, rolling back: {err}");
                self.restore(snapshot);
                Err(err)
            }
        }
    }

    /// Consume a sequence of deferred local [`Builder`]s and apply them as
    /// one atomic batch (spec §4.5.2, §6). Builders are synthesized against
    /// the tree's current allocator and a cursor `(parent, anchor)` that
    /// starts at the tree root: an `Add` anchors subsequent siblings after
    /// itself; an `AddBranch` additionally moves the cursor into its own
    /// (initially empty) children, anchored at the front.
    pub fn batch(&mut self, builders: Vec<Builder<P>>) -> Result<()>
    where
        P: Clone + PartialEq,
        C: Clone,
    {
        let snapshot = self.snapshot();
        match self.run_builders(builders) {
            Ok(effective) => {
                self.last_operation = Operation::Batch(effective);
                Ok(())
            }
            Err(err) => {
                log::debug!("batch failed, rolling back: {err}");
                self.restore(snapshot);
                Err(err)
            }
        }
    }

    fn run_builders(&mut self, builders: Vec<Builder<P>>) -> Result<Vec<Operation<P>>>
    where
        P: Clone + PartialEq,
    {
        let mut cursor_parent = NodeHandle::ROOT;
        let mut cursor_anchor = Timestamp::ROOT;
        let mut effective = Vec::new();

        for builder in builders {
            match builder {
                Builder::Add(payload) | Builder::AddBranch(payload) => {
                    let is_branch = matches!(builder, Builder::AddBranch(_));
                    let timestamp = self.next_timestamp();
                    let mut path = self.full_path(cursor_parent);
                    path.push(cursor_anchor);

                    let (_, handle) = self.apply_add(timestamp, &path, payload.clone())?;
                    let op = Operation::Add {
                        replica: self.id,
                        timestamp,
                        path,
                        payload,
                    };
                    self.log.push(op.clone());
                    effective.push(op);

                    cursor_anchor = timestamp;
                    if is_branch {
                        cursor_parent = handle;
                        cursor_anchor = Timestamp::ROOT;
                    }
                }
                Builder::Delete(path) => {
                    let timestamp = self.next_timestamp();
                    let changed = self.apply_delete(timestamp, &path)?;
                    if !changed {
                        continue;
                    }
                    let op = Operation::Delete {
                        replica: self.id,
                        timestamp,
                        path,
                    };
                    self.log.push(op.clone());
                    effective.push(op);
                }
            }
        }
        Ok(effective)
    }

    /// The operation (or suppressed-duplicate-free batch) applied by the
    /// most recent successful call to [`Tree::apply`] or [`Tree::batch`].
    /// A freshly initialized tree reports an empty `Batch`.
    pub fn last_operation(&self) -> &Operation<P> {
        &self.last_operation
    }

    /// The live payload at `path`, or `None` if the path does not resolve,
    /// addresses the root, or addresses a tombstoned node (spec §4.5.5).
    pub fn get(&self, path: &Path) -> Option<&P> {
        let handle = self.resolve(path.segments()).ok()?;
        if handle == NodeHandle::ROOT {
            return None;
        }
        let node = &self.arena[handle.0];
        if node.deleted {
            None
        } else {
            node.payload.as_ref()
        }
    }

    /// `true` if `path` resolves to a node that has been deleted. `false`
    /// for a live node, the root, or a path that does not resolve.
    pub fn is_tombstoned(&self, path: &Path) -> bool {
        match self.resolve(path.segments()) {
            Ok(handle) if handle != NodeHandle::ROOT => self.arena[handle.0].deleted,
            _ => false,
        }
    }

    /// Paths of `path`'s non-tombstoned children, in current tree order
    /// (spec §9's read-model note: children reflect insertion order plus
    /// conflict resolution).
    pub fn children(&self, path: &Path) -> Result<Vec<Path>> {
        let handle = self.resolve(path.segments())?;
        Ok(self.arena[handle.0]
            .children
            .iter()
            .filter(|&&child| !self.arena[child.0].deleted)
            .map(|&child| self.full_path(child))
            .collect())
    }

    /// `path`'s parent path, or `None` if `path` addresses the root.
    pub fn parent(&self, path: &Path) -> Result<Option<Path>> {
        let handle = self.resolve(path.segments())?;
        match self.arena[handle.0].parent {
            Some(parent) => Ok(Some(self.full_path(parent))),
            None => Ok(None),
        }
    }

    /// Every logged operation whose own timestamp is strictly greater than
    /// `since`, in log order (spec §4.5.5). Pass [`Timestamp::ROOT`] to
    /// retrieve the entire log.
    pub fn operations_since(&self, since: Timestamp) -> Vec<&Operation<P>> {
        self.log
            .iter()
            .filter(|op| op.timestamp() > since)
            .collect()
    }

    /// Re-check the structural invariants spec §8 requires to hold at all
    /// times: every non-root node is reachable from exactly one parent's
    /// `children`, and no arena entry is orphaned. Intended for tests and
    /// debugging, not the hot path.
    pub fn validate_invariants(&self) -> Result<()> {
        let mut seen = vec![false; self.arena.len()];
        seen[NodeHandle::ROOT.0] = true;
        for (idx, node) in self.arena.iter().enumerate() {
            if idx == NodeHandle::ROOT.0 {
                continue;
            }
            let parent = node
                .parent
                .ok_or(Error::MalformedTimestamp(node.timestamp))?;
            if !self.arena[parent.0].children.contains(&NodeHandle(idx)) {
                return Err(Error::MalformedTimestamp(node.timestamp));
            }
        }
        for node in &self.arena {
            for &child in &node.children {
                if seen[child.0] {
                    return Err(Error::MalformedTimestamp(self.arena[child.0].timestamp));
                }
                seen[child.0] = true;
            }
        }
        if seen.iter().any(|&s| !s) {
            return Err(Error::MalformedTimestamp(Timestamp::ROOT));
        }
        Ok(())
    }
}
