use ordered_tree_crdt::{Operation, Path, ReplicaId, Timestamp, Tree, TreeConfig};

fn heap_permute<T: Clone>(k: usize, items: &mut [T], res: &mut Vec<Vec<T>>) {
    if k == 1 {
        res.push(items.to_vec());
        return;
    }
    heap_permute(k - 1, items, res);
    for i in 0..(k - 1) {
        if k % 2 == 0 {
            items.swap(i, k - 1);
        } else {
            items.swap(0, k - 1);
        }
        heap_permute(k - 1, items, res);
    }
}

/// Four concurrent Adds from distinct replicas, none causally dependent on
/// any other, must converge to the same tree regardless of delivery order.
#[test]
fn permutations_of_concurrent_adds_converge() {
    let ops = vec![
        Operation::add(
            ReplicaId::new(1),
            Timestamp::encode(10, ReplicaId::new(1), 4),
            Path::new(vec![Timestamp::ROOT]),
            "a",
        ),
        Operation::add(
            ReplicaId::new(2),
            Timestamp::encode(4, ReplicaId::new(2), 4),
            Path::new(vec![Timestamp::ROOT]),
            "b",
        ),
        Operation::add(
            ReplicaId::new(3),
            Timestamp::encode(7, ReplicaId::new(3), 4),
            Path::new(vec![Timestamp::ROOT]),
            "c",
        ),
        Operation::add(
            ReplicaId::new(1),
            Timestamp::encode(12, ReplicaId::new(1), 4),
            Path::new(vec![Timestamp::ROOT]),
            "d",
        ),
    ];

    let mut permutations = Vec::new();
    heap_permute(ops.len(), &mut ops.clone(), &mut permutations);

    let mut baseline: Option<Vec<(Path, &str)>> = None;
    for perm in permutations {
        let mut tree = Tree::<&str>::init(TreeConfig {
            id: 99,
            max_replicas: 16,
        });
        for op in &perm {
            tree.apply(op.clone()).unwrap();
        }
        tree.validate_invariants().unwrap();

        let observed: Vec<(Path, &str)> = tree
            .children(&Path::new(vec![]))
            .unwrap()
            .into_iter()
            .map(|path| {
                let payload = *tree.get(&path).unwrap();
                (path, payload)
            })
            .collect();

        match &baseline {
            None => baseline = Some(observed),
            Some(base) => assert_eq!(&observed, base),
        }
    }
}

/// Two replicas that each apply a disjoint local batch, then exchange
/// operations via `operations_since`, converge to the same tree.
#[test]
fn two_replicas_exchange_operations_since_and_converge() {
    use ordered_tree_crdt::{add, add_branch};

    let mut a = Tree::<&str>::init(TreeConfig {
        id: 1,
        max_replicas: 4,
    });
    let mut b = Tree::<&str>::init(TreeConfig {
        id: 2,
        max_replicas: 4,
    });

    a.batch(vec![add_branch("a1"), add("a2")]).unwrap();
    b.batch(vec![add("b1")]).unwrap();

    let a_ops: Vec<Operation<&str>> = a.operations_since(Timestamp::ROOT).into_iter().cloned().collect();
    let b_ops: Vec<Operation<&str>> = b.operations_since(Timestamp::ROOT).into_iter().cloned().collect();

    for op in b_ops {
        a.apply(op).unwrap();
    }
    for op in a_ops {
        b.apply(op).unwrap();
    }

    let a_children: Vec<Path> = a.children(&Path::new(vec![])).unwrap();
    let b_children: Vec<Path> = b.children(&Path::new(vec![])).unwrap();
    assert_eq!(a_children, b_children);
    for path in &a_children {
        assert_eq!(a.get(path), b.get(path));
    }
    a.validate_invariants().unwrap();
    b.validate_invariants().unwrap();
}
