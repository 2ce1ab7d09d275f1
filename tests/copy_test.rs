//! Tests for cycle-safe deep copy: independence and rollback

use treeguard::domain::{DomainError, Index, Tree, Value};

fn num(n: f64) -> Value {
    Value::Number(n)
}

/// Balanced 7-node tree `4(2(1,3), 6(5,7))`, bound as root.
fn balanced_tree() -> (Tree, Index) {
    let mut tree = Tree::new(100);
    let n1 = tree.new_node(num(1.0), None, None).unwrap();
    let n3 = tree.new_node(num(3.0), None, None).unwrap();
    let n2 = tree.new_node(num(2.0), Some(n1), Some(n3)).unwrap();
    let n5 = tree.new_node(num(5.0), None, None).unwrap();
    let n7 = tree.new_node(num(7.0), None, None).unwrap();
    let n6 = tree.new_node(num(6.0), Some(n5), Some(n7)).unwrap();
    let root = tree.new_node(num(4.0), Some(n2), Some(n6)).unwrap();
    tree.bind_root(root).unwrap();
    (tree, root)
}

/// Shape-and-value equality of two subtrees living in the same arena.
fn subtrees_equal(tree: &Tree, a: Option<Index>, b: Option<Index>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => {
            let ra = tree.node(x).unwrap();
            let rb = tree.node(y).unwrap();
            ra.value == rb.value
                && subtrees_equal(tree, ra.left, rb.left)
                && subtrees_equal(tree, ra.right, rb.right)
        }
        _ => false,
    }
}

#[test]
fn given_balanced_tree_when_copying_then_clone_matches_shape_and_values() {
    let (mut tree, root) = balanced_tree();

    let copy = tree.copy_subtree(root).unwrap();

    assert_ne!(copy, root);
    assert!(subtrees_equal(&tree, Some(root), Some(copy)));
    assert_eq!(tree.node(copy).unwrap().subtree_count, 7);
    assert_eq!(tree.node(copy).unwrap().parent, None);
    // Fresh identities throughout.
    assert_ne!(tree.node(copy).unwrap().id, tree.node(root).unwrap().id);
}

#[test]
fn given_copy_when_mutating_it_then_original_is_untouched() {
    let (mut tree, root) = balanced_tree();
    let copy = tree.copy_subtree(root).unwrap();

    tree.set_value(copy, num(99.0)).unwrap();

    assert_eq!(tree.node(root).unwrap().value, num(4.0));
    assert_eq!(tree.node(copy).unwrap().value, num(99.0));
}

#[test]
fn given_copy_when_deleting_original_then_copy_survives() {
    let (mut tree, root) = balanced_tree();
    let copy = tree.copy_subtree(root).unwrap();

    assert_eq!(tree.delete_subtree(root).unwrap(), 7);

    assert!(tree.contains(copy));
    assert_eq!(tree.node(copy).unwrap().subtree_count, 7);
    tree.bind_root(copy).unwrap();
    assert_eq!(tree.count_nodes().unwrap(), 7);
}

#[test]
fn given_cycle_in_source_when_copying_then_no_clone_leaks() {
    let mut tree = Tree::new(100);
    let x = tree.new_node(num(1.0), None, None).unwrap();
    let y = tree.new_node(num(2.0), None, None).unwrap();
    tree.set_left(x, y).unwrap();
    tree.wire_left(y, Some(x)).unwrap();
    tree.wire_parent(x, Some(y)).unwrap();
    let before = tree.len();

    let err = tree.copy_subtree(x).unwrap_err();

    assert!(matches!(err, DomainError::CycleDetected { .. }));
    assert_eq!(tree.len(), before, "failed copy must not leak clones");
}

#[test]
fn given_tight_size_limit_when_copying_then_partial_clones_roll_back() {
    // 3 source nodes in a 5-node arena: the copy exhausts the limit after
    // two clones and must remove them both.
    let mut tree = Tree::new(5);
    let a = tree.new_node(num(1.0), None, None).unwrap();
    let b = tree.new_node(num(2.0), None, None).unwrap();
    let root = tree.new_node(num(3.0), Some(a), Some(b)).unwrap();
    tree.bind_root(root).unwrap();

    let err = tree.copy_subtree(root).unwrap_err();

    assert!(matches!(err, DomainError::SizeExceeded { .. }));
    assert_eq!(tree.len(), 3, "failed copy must not leak clones");
    assert!(tree.verify().is_ok(), "source must be unchanged");
}

#[test]
fn given_deep_backref_damage_when_copying_then_produced_clones_roll_back() {
    // Damage sits in the right subtree, so the whole left subtree has
    // already been cloned when the copy fails.
    let (mut tree, root) = balanced_tree();
    let n6 = tree.node(root).unwrap().right.unwrap();
    let n7 = tree.node(n6).unwrap().right.unwrap();
    tree.wire_parent(n7, None).unwrap();
    let before = tree.len();

    let err = tree.copy_subtree(root).unwrap_err();

    assert!(matches!(err, DomainError::BackrefMismatch { .. }));
    assert_eq!(tree.len(), before, "failed copy must not leak clones");
}
