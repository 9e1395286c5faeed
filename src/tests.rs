use std::ops::Range;

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn key_at(link: Link<TestNode>) -> Option<u32> {
    link.map(|node| unsafe { node.as_ref().key })
}

fn balance_at(link: Link<TestNode>) -> Option<i8> {
    link.map(|node| unsafe { TestNode::links(node).as_ref().balance() })
}

fn left_of(link: Link<TestNode>) -> Link<TestNode> {
    link.and_then(|node| unsafe { TestNode::links(node).as_ref().left() })
}

fn right_of(link: Link<TestNode>) -> Link<TestNode> {
    link.and_then(|node| unsafe { TestNode::links(node).as_ref().right() })
}

fn tree_of(keys: &[u32]) -> AvlTree<TestNode> {
    let mut tree = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    tree
}

fn keys_in_order(tree: &AvlTree<TestNode>) -> Vec<u32> {
    tree.iter().map(|node| node.key).collect()
}

fn insert_find_all(keys: &[u32]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
        assert!(tree.is_height_balanced());
    }

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn four_elems_find() {
    insert_find_all(&[0, 1, 2, 3]);
    insert_find_all(&[0, 1, 3, 2]);
    insert_find_all(&[0, 2, 1, 3]);
    insert_find_all(&[0, 2, 3, 1]);
    insert_find_all(&[0, 3, 1, 2]);
    insert_find_all(&[0, 3, 2, 1]);

    insert_find_all(&[1, 0, 2, 3]);
    insert_find_all(&[1, 0, 3, 2]);
    insert_find_all(&[1, 2, 0, 3]);
    insert_find_all(&[1, 2, 3, 0]);
    insert_find_all(&[1, 3, 0, 2]);
    insert_find_all(&[1, 3, 2, 0]);

    insert_find_all(&[2, 0, 1, 3]);
    insert_find_all(&[2, 0, 3, 1]);
    insert_find_all(&[2, 1, 0, 3]);
    insert_find_all(&[2, 1, 3, 0]);
    insert_find_all(&[2, 3, 0, 1]);
    insert_find_all(&[2, 3, 1, 0]);

    insert_find_all(&[3, 0, 1, 2]);
    insert_find_all(&[3, 0, 2, 1]);
    insert_find_all(&[3, 1, 0, 2]);
    insert_find_all(&[3, 1, 2, 0]);
    insert_find_all(&[3, 2, 0, 1]);
    insert_find_all(&[3, 2, 1, 0]);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.remove(key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = tree.remove(key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_four() {
    insert_remove_all(&[0, 1, 2, 3]);
    insert_remove_all(&[0, 1, 3, 2]);
    insert_remove_all(&[0, 2, 1, 3]);
    insert_remove_all(&[0, 2, 3, 1]);
    insert_remove_all(&[0, 3, 1, 2]);
    insert_remove_all(&[0, 3, 2, 1]);

    insert_remove_all(&[1, 0, 2, 3]);
    insert_remove_all(&[1, 0, 3, 2]);
    insert_remove_all(&[1, 2, 0, 3]);
    insert_remove_all(&[1, 2, 3, 0]);
    insert_remove_all(&[1, 3, 0, 2]);
    insert_remove_all(&[1, 3, 2, 0]);

    insert_remove_all(&[2, 0, 1, 3]);
    insert_remove_all(&[2, 0, 3, 1]);
    insert_remove_all(&[2, 1, 0, 3]);
    insert_remove_all(&[2, 1, 3, 0]);
    insert_remove_all(&[2, 3, 0, 1]);
    insert_remove_all(&[2, 3, 1, 0]);

    insert_remove_all(&[3, 0, 1, 2]);
    insert_remove_all(&[3, 0, 2, 1]);
    insert_remove_all(&[3, 1, 0, 2]);
    insert_remove_all(&[3, 1, 2, 0]);
    insert_remove_all(&[3, 2, 0, 1]);
    insert_remove_all(&[3, 2, 1, 0]);
}

// Inserting 3, 2, 1 leans the root left twice; a single right rotation at
// the root resolves it.
#[test]
fn ll_insert_rotation() {
    let tree = tree_of(&[3, 2, 1]);

    assert_eq!(key_at(tree.root), Some(2));
    assert_eq!(key_at(left_of(tree.root)), Some(1));
    assert_eq!(key_at(right_of(tree.root)), Some(3));

    assert_eq!(balance_at(tree.root), Some(0));
    assert_eq!(balance_at(left_of(tree.root)), Some(0));
    assert_eq!(balance_at(right_of(tree.root)), Some(0));

    assert!(tree.is_height_balanced());
}

#[test]
fn rr_insert_rotation() {
    let tree = tree_of(&[1, 2, 3]);

    assert_eq!(key_at(tree.root), Some(2));
    assert_eq!(key_at(left_of(tree.root)), Some(1));
    assert_eq!(key_at(right_of(tree.root)), Some(3));
    assert_eq!(balance_at(tree.root), Some(0));

    assert!(tree.is_height_balanced());
}

// Inserting 1, 3, 2 needs the double rotation: right at 3, then left at 1.
#[test]
fn rl_insert_rotation() {
    let tree = tree_of(&[1, 3, 2]);

    assert_eq!(key_at(tree.root), Some(2));
    assert_eq!(key_at(left_of(tree.root)), Some(1));
    assert_eq!(key_at(right_of(tree.root)), Some(3));

    assert!(tree.is_height_balanced());
}

#[test]
fn lr_insert_rotation() {
    let tree = tree_of(&[3, 1, 2]);

    assert_eq!(key_at(tree.root), Some(2));
    assert_eq!(key_at(left_of(tree.root)), Some(1));
    assert_eq!(key_at(right_of(tree.root)), Some(3));

    assert!(tree.is_height_balanced());
}

#[test]
fn duplicate_insert_replaces_node() {
    let mut tree = tree_of(&[2, 1, 3]);

    let displaced = tree.insert(TestNode::new(2)).expect("incumbent returned");
    assert_eq!(displaced.key, 2);

    assert_eq!(tree.len(), 3);
    assert_eq!(key_at(tree.root), Some(2));
    assert_eq!(keys_in_order(&tree), vec![1, 2, 3]);
    tree.assert_invariants();
}

#[test]
fn sequential_inserts_stay_balanced() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for key in 0..100 {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
        assert!(tree.is_height_balanced());
    }

    assert_eq!(keys_in_order(&tree), (0..100).collect::<Vec<_>>());

    // AVL height bound: h <= 1.4405 * log2(n + 2).
    let height = tree.subtree_height(tree.root);
    assert!((height as f64) <= 1.4405 * 102f64.log2());
}

#[test]
fn descending_inserts_stay_balanced() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for key in (0..100).rev() {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
        assert!(tree.is_height_balanced());
    }

    assert_eq!(keys_in_order(&tree), (0..100).collect::<Vec<_>>());
}

// A parent that already has one child gains its second without any balance
// propagation: its height is unchanged, but so is its stored balance factor,
// which goes stale (the true balance is 0).
#[test]
fn second_child_insert_skips_propagation() {
    let tree = tree_of(&[2, 1, 3]);

    assert_eq!(balance_at(tree.root), Some(-1));
    assert!(tree.is_height_balanced());
}

// Removing the root of 5(3(2,4), 8(7,9)) swaps in the in-order
// predecessor 4, which inherits the root position and balance factor.
#[test]
fn remove_two_children_predecessor() {
    let mut tree = tree_of(&[5, 3, 8, 2, 4, 7, 9]);

    let node = tree.remove(&5).expect("item not found");
    assert_eq!(node.key, 5);

    assert_eq!(key_at(tree.root), Some(4));
    assert_eq!(key_at(left_of(tree.root)), Some(3));
    assert_eq!(key_at(left_of(left_of(tree.root))), Some(2));
    assert_eq!(key_at(right_of(left_of(tree.root))), None);
    assert_eq!(key_at(right_of(tree.root)), Some(8));
    assert_eq!(key_at(left_of(right_of(tree.root))), Some(7));
    assert_eq!(key_at(right_of(right_of(tree.root))), Some(9));

    assert_eq!(keys_in_order(&tree), vec![2, 3, 4, 7, 8, 9]);
    assert!(tree.get_raw(&5).is_none());

    tree.assert_invariants();
    assert!(tree.is_height_balanced());
}

// Removing a non-root node with two children: the predecessor is lifted out
// of the middle of the left subtree.
#[test]
fn remove_two_children_inner_node() {
    let mut tree = tree_of(&[8, 5, 10, 3, 6, 11, 2, 4, 7]);

    tree.remove(&5).expect("item not found");

    assert_eq!(keys_in_order(&tree), vec![2, 3, 4, 6, 7, 8, 10, 11]);
    assert_eq!(key_at(left_of(tree.root)), Some(4));

    tree.assert_invariants();
    assert!(tree.is_height_balanced());
}

// Removal from the right side tipping the parent to -2 with a lean-left (or
// even) left child takes the single right rotation.
#[test]
fn remove_ll_case() {
    let mut tree = tree_of(&[5, 3, 8, 2]);

    tree.remove(&8).expect("item not found");

    assert_eq!(key_at(tree.root), Some(3));
    assert_eq!(key_at(left_of(tree.root)), Some(2));
    assert_eq!(key_at(right_of(tree.root)), Some(5));

    tree.assert_invariants();
    assert!(tree.is_height_balanced());
}

#[test]
fn remove_lr_case() {
    let mut tree = tree_of(&[5, 3, 8, 4]);

    tree.remove(&8).expect("item not found");

    assert_eq!(key_at(tree.root), Some(4));
    assert_eq!(key_at(left_of(tree.root)), Some(3));
    assert_eq!(key_at(right_of(tree.root)), Some(5));

    tree.assert_invariants();
    assert!(tree.is_height_balanced());
}

#[test]
fn remove_rr_case() {
    let mut tree = tree_of(&[5, 3, 8, 9]);

    tree.remove(&3).expect("item not found");

    assert_eq!(key_at(tree.root), Some(8));
    assert_eq!(key_at(left_of(tree.root)), Some(5));
    assert_eq!(key_at(right_of(tree.root)), Some(9));

    tree.assert_invariants();
    assert!(tree.is_height_balanced());
}

#[test]
fn remove_rl_case() {
    let mut tree = tree_of(&[5, 3, 9, 8]);

    tree.remove(&3).expect("item not found");

    assert_eq!(key_at(tree.root), Some(8));
    assert_eq!(key_at(left_of(tree.root)), Some(5));
    assert_eq!(key_at(right_of(tree.root)), Some(9));

    tree.assert_invariants();
    assert!(tree.is_height_balanced());
}

// Removal repairs the unlinked node's immediate parent only. Removing 11
// from 8(5(3(2,4), 6(_,7)), 10(_,11)) leaves the parent 10 balanced, but
// drives the root to a true balance of -2, which nothing repairs. Ordering
// is intact throughout.
#[test]
fn remove_rebalances_immediate_parent_only() {
    let mut tree = tree_of(&[8, 5, 10, 3, 6, 11, 2, 4, 7]);
    assert!(tree.is_height_balanced());

    tree.remove(&11).expect("item not found");

    assert_eq!(key_at(tree.root), Some(8));
    assert_eq!(balance_at(right_of(tree.root)), Some(0));

    let left_height = tree.subtree_height(left_of(tree.root));
    let right_height = tree.subtree_height(right_of(tree.root));
    assert_eq!(right_height - left_height, -2);

    assert!(!tree.is_height_balanced());
    assert_eq!(keys_in_order(&tree), vec![2, 3, 4, 5, 6, 7, 8, 10]);
    tree.assert_invariants();
}

#[test]
fn remove_missing_key_is_a_noop() {
    let mut tree = tree_of(&[2, 1, 3]);

    assert!(tree.remove(&7).is_none());
    assert_eq!(tree.len(), 3);
    tree.assert_invariants();
}

#[test]
fn first_and_last() {
    let tree = tree_of(&[5, 3, 8, 2, 4, 7, 9]);

    assert_eq!(tree.first().map(|node| node.key), Some(2));
    assert_eq!(tree.last().map(|node| node.key), Some(9));
}

#[test]
fn check_invariants_reports_order_violation() {
    let tree = tree_of(&[2, 1, 3]);
    assert!(tree.try_check_invariants().is_ok());

    // Corrupt the left child's key so it orders above the root.
    let node = tree.get_raw(&1).unwrap();
    unsafe { (*node.as_ptr()).key = 9 };

    assert!(matches!(
        tree.try_check_invariants(),
        Err(StructureError::OrderViolation(_))
    ));
}

#[test]
fn check_invariants_reports_duplicate_key() {
    let tree = tree_of(&[2, 1, 3]);

    let node = tree.get_raw(&1).unwrap();
    unsafe { (*node.as_ptr()).key = 2 };

    assert!(matches!(
        tree.try_check_invariants(),
        Err(StructureError::DuplicateKey(_))
    ));
}

#[test]
fn structure_rendering() {
    let tree = tree_of(&[2, 1, 3]);

    assert_eq!(tree.structure().to_string(), "(2:-1 1:0 3:0)");

    let mut dot = String::new();
    tree.dotgraph("t", &mut dot).unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("label=\"2:-1\""));
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_map_equivalence(ops);
    }
}
