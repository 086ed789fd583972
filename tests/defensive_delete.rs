use ordered_tree_crdt::{Error, Operation, Path, ReplicaId, Timestamp, Tree, TreeConfig};

fn config(id: u32) -> TreeConfig {
    TreeConfig {
        id,
        max_replicas: 1,
    }
}

fn ts(counter: u64) -> Timestamp {
    Timestamp::encode(counter, ReplicaId::new(0), 0)
}

#[test]
fn delete_is_idempotent() {
    let mut tree = Tree::<&str>::init(config(0));
    tree.apply(Operation::add(ReplicaId::new(0), ts(1), Path::new(vec![ts(0)]), "a"))
        .unwrap();

    tree.apply(Operation::delete(ReplicaId::new(0), ts(2), Path::new(vec![ts(1)])))
        .unwrap();
    assert!(tree.is_tombstoned(&Path::new(vec![ts(1)])));
    assert_eq!(tree.operations_since(ts(0)).len(), 2);

    // re-delivering the same delete is a silent no-op: it does not extend
    // the log and lastOperation reports an empty batch.
    tree.apply(Operation::delete(ReplicaId::new(0), ts(3), Path::new(vec![ts(1)])))
        .unwrap();
    assert_eq!(tree.operations_since(ts(0)).len(), 2);
}

#[test]
fn delete_of_root_is_a_no_op() {
    let mut tree = Tree::<&str>::init(config(0));
    tree.apply(Operation::delete(ReplicaId::new(0), ts(1), Path::new(vec![])))
        .unwrap();
    assert!(!tree.is_tombstoned(&Path::new(vec![])));
    assert!(tree.operations_since(ts(0)).is_empty());
}

/// Spec §8 scenario S4: adding into a just-deleted branch within the same
/// atomic batch must fail with `ParentDeleted`, and the whole batch must
/// leave the tree exactly as it was.
#[test]
fn add_into_a_branch_deleted_earlier_in_the_same_batch_fails_atomically() {
    let mut tree = Tree::<&str>::init(config(0));

    let batch = Operation::batch(vec![
        Operation::add(ReplicaId::new(0), ts(1), Path::new(vec![ts(0)]), "a"),
        Operation::delete(ReplicaId::new(0), ts(2), Path::new(vec![ts(1)])),
        Operation::add(ReplicaId::new(0), ts(3), Path::new(vec![ts(1), ts(0)]), "b"),
    ]);

    let result = tree.apply(batch);
    assert_eq!(result, Err(Error::ParentDeleted(ts(1))));
    assert!(tree.get(&Path::new(vec![ts(1)])).is_none());
    assert!(tree.operations_since(ts(0)).is_empty());

    // the prefix alone, applied without the offending third op, succeeds.
    let prefix = Operation::batch(vec![
        Operation::add(ReplicaId::new(0), ts(1), Path::new(vec![ts(0)]), "a"),
        Operation::delete(ReplicaId::new(0), ts(2), Path::new(vec![ts(1)])),
    ]);
    tree.apply(prefix).unwrap();
    assert!(tree.get(&Path::new(vec![ts(1)])).is_none());
    assert!(tree.is_tombstoned(&Path::new(vec![ts(1)])));
    assert_eq!(tree.operations_since(ts(0)).len(), 2);
}

#[test]
fn add_is_rejected_once_its_parent_is_already_known_tombstoned() {
    let mut tree = Tree::<&str>::init(config(0));
    tree.apply(Operation::add(ReplicaId::new(0), ts(1), Path::new(vec![ts(0)]), "parent"))
        .unwrap();
    tree.apply(Operation::delete(ReplicaId::new(0), ts(2), Path::new(vec![ts(1)])))
        .unwrap();

    let result = tree.apply(Operation::add(
        ReplicaId::new(0),
        ts(3),
        Path::new(vec![ts(1), ts(0)]),
        "child",
    ));
    assert_eq!(result, Err(Error::ParentDeleted(ts(1))));
    assert!(tree.children(&Path::new(vec![ts(1)])).unwrap().is_empty());
}

#[test]
fn an_add_applied_before_its_parents_delete_is_delivered_stays_attached() {
    // Delivery order, not causal order, decides this race: the Add reaches
    // this replica while the parent is still live, so it succeeds and
    // remains even after the Delete arrives (spec §3.5: only further Adds
    // are frozen out, not already-attached children).
    let mut tree = Tree::<&str>::init(config(0));
    tree.apply(Operation::add(ReplicaId::new(0), ts(1), Path::new(vec![ts(0)]), "parent"))
        .unwrap();
    tree.apply(Operation::add(
        ReplicaId::new(0),
        ts(2),
        Path::new(vec![ts(1), ts(0)]),
        "child",
    ))
    .unwrap();

    tree.apply(Operation::delete(ReplicaId::new(0), ts(3), Path::new(vec![ts(1)])))
        .unwrap();

    assert!(tree.is_tombstoned(&Path::new(vec![ts(1)])));
    assert_eq!(tree.get(&Path::new(vec![ts(1), ts(2)])), Some(&"child"));
    assert_eq!(
        tree.children(&Path::new(vec![ts(1)])).unwrap(),
        vec![Path::new(vec![ts(1), ts(2)])]
    );
}
