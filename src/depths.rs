//! A standalone check that every root-to-leaf path in a binary tree has the
//! same length.
//!
//! This has nothing to do with rebalancing; it treats the tree as an
//! arbitrary binary structure. Note the local height convention: the probe
//! counts an empty subtree as 1, so a probed path length is the number of
//! nodes on the path plus one. The balance-factor arithmetic elsewhere in
//! this crate counts an empty subtree as 0; the two conventions are kept
//! deliberately separate.

use crate::{AvlTree, Link, Links, TreeNode};

/// Returns `true` if every root-to-leaf path in `tree` has the same length.
///
/// Empty and single-node trees trivially qualify.
pub fn equal_leaf_depths<T>(tree: &AvlTree<T>) -> bool
where
    T: TreeNode<Links<T>> + ?Sized,
{
    let Some(root) = tree.root else {
        return true;
    };

    // Probe one path to fix the expected length, then walk every path
    // against it.
    let expected = probe_height::<T>(Some(root));
    walk::<T>(Some(root), expected, 1)
}

// Length of a single root-to-leaf path, preferring left children. The empty
// subtree counts as 1 here (see the module comment).
fn probe_height<T>(node: Link<T>) -> usize
where
    T: TreeNode<Links<T>> + ?Sized,
{
    let Some(node) = node else {
        return 1;
    };

    unsafe {
        let links = T::links(node).as_ref();

        match links.left() {
            Some(left) => 1 + probe_height::<T>(Some(left)),
            None => 1 + probe_height::<T>(links.right()),
        }
    }
}

// Checks that every leaf under `node` sits at path length `expected`.
// `depth` counts the nodes from the root up to and including `node`.
fn walk<T>(node: Link<T>, expected: usize, depth: usize) -> bool
where
    T: TreeNode<Links<T>> + ?Sized,
{
    let Some(node) = node else {
        return true;
    };

    unsafe {
        let links = T::links(node).as_ref();

        match (links.left(), links.right()) {
            (None, None) => depth + 1 == expected,
            (left, right) => {
                walk::<T>(left, expected, depth + 1) && walk::<T>(right, expected, depth + 1)
            }
        }
    }
}
