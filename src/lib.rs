//! An intrusive AVL tree.

// Conventions used in comments:
// - The balance factor of a node `x` is b(x) = height(right(x)) - height(left(x)),
//   where the height of an empty subtree is 0.
// - A node is unbalanced when its balance factor reaches ±2.
//
// The fundamental invariants of the tree are:
// 1. For every node, all keys in its left subtree order strictly below its key
//    and all keys in its right subtree strictly above it.
// 2. Every balance factor on a path recomputed by insertion lands in {-1, 0, 1}.
//
// Insertion restores (2) along the whole root-ward path. Removal recomputes
// and repairs the balance factor at the unlinked node's recorded parent only,
// so a removal can leave deeper ancestors outside {-1, 0, 1}; see
// `is_height_balanced`.

use core::{
    cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not, pin::Pin,
    ptr::NonNull,
};
use std::borrow::Borrow;

use cordyceps::Linked;
use thiserror::Error;

mod debug;
pub mod depths;
mod iter;
pub mod map;
#[cfg(any(test, feature = "model"))]
pub mod model;
#[cfg(test)]
mod tests;

pub use crate::debug::Structure;
pub use crate::iter::Iter;
pub use crate::map::AvlMap;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// Nodes carry their own link header ([`Links`]) with parent and child
/// pointers plus a balance factor. The tree rebalances itself with single and
/// double rotations, selected by the classical LL/RR/LR/RL case split on
/// balance factors.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

/// The link header embedded in every tree node: parent and child pointers
/// plus the node's balance factor.
pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    balance: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

/// A structural fault found by [`AvlTree::try_check_invariants`].
///
/// None of these arise from the ordinary insert and remove paths; the type
/// exists for defensive checks against internal corruption.
#[derive(Debug, Error)]
pub enum StructureError {
    /// A child's parent pointer does not point back at the node it hangs from.
    #[error("parent link under {0} does not point back to it")]
    BrokenParentLink(String),
    /// A key is on the wrong side of an ancestor.
    #[error("key ordering violated at {0}")]
    OrderViolation(String),
    /// Two nodes with the same key are present.
    #[error("duplicate key {0} materialized in the tree")]
    DuplicateKey(String),
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Panics if a structural invariant does not hold.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        if let Err(err) = self.try_check_invariants() {
            panic!("tree invariant violated: {err}");
        }
    }

    /// Walks the whole tree checking parent links and key ordering.
    pub fn try_check_invariants(&self) -> Result<(), StructureError> {
        match self.root {
            Some(root) => unsafe { self.check_node(root, None, None, None) },
            None => Ok(()),
        }
    }

    #[allow(clippy::only_used_in_recursion)]
    unsafe fn check_node(
        &self,
        node: NonNull<T>,
        parent: Link<T>,
        min: Link<T>,
        max: Link<T>,
    ) -> Result<(), StructureError> {
        unsafe {
            let links = T::links(node).as_ref();
            let key = node.as_ref().key();

            if links.parent() != parent {
                return Err(StructureError::BrokenParentLink(format!("{key:?}")));
            }

            if let Some(lo) = min {
                match key.cmp(lo.as_ref().key()) {
                    Ordering::Greater => (),
                    Ordering::Equal => {
                        return Err(StructureError::DuplicateKey(format!("{key:?}")));
                    }
                    Ordering::Less => {
                        return Err(StructureError::OrderViolation(format!("{key:?}")));
                    }
                }
            }

            if let Some(hi) = max {
                match key.cmp(hi.as_ref().key()) {
                    Ordering::Less => (),
                    Ordering::Equal => {
                        return Err(StructureError::DuplicateKey(format!("{key:?}")));
                    }
                    Ordering::Greater => {
                        return Err(StructureError::OrderViolation(format!("{key:?}")));
                    }
                }
            }

            if let Some(left) = links.left() {
                self.check_node(left, Some(node), min, Some(node))?;
            }

            if let Some(right) = links.right() {
                self.check_node(right, Some(node), Some(node), max)?;
            }

            Ok(())
        }
    }

    /// Reports whether every node satisfies |height(left) - height(right)| <= 1,
    /// measured from true subtree heights.
    ///
    /// Insertion maintains this unconditionally. Removal repairs only the
    /// unlinked node's recorded parent, so remove sequences can drive deeper
    /// ancestors outside the rule; this probe observes that state.
    pub fn is_height_balanced(&self) -> bool {
        self.balanced_height(self.root).is_some()
    }

    // Returns the subtree height if the subtree is height-balanced.
    fn balanced_height(&self, node: Link<T>) -> Option<isize> {
        let node = match node {
            Some(node) => node,
            None => return Some(0),
        };

        let left = self.balanced_height(unsafe { T::links(node).as_ref().left() })?;
        let right = self.balanced_height(unsafe { T::links(node).as_ref().right() })?;

        ((left - right).abs() <= 1).then(|| 1 + left.max(right))
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a mutable reference to the node corresponding to `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    /// Returns `true` if the tree contains a node with the given key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = T::links(cur).as_ref().left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = T::links(cur).as_ref().right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.first_raw()
            .map(|node| unsafe { Pin::new_unchecked(node.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.last_raw()
            .map(|node| unsafe { Pin::new_unchecked(node.as_ref()) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let node = self.first_raw()?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let node = self.last_raw()?;
        Some(unsafe { self.remove_at(node) })
    }

    fn first_raw(&self) -> Link<T> {
        let mut cur = self.root?;

        unsafe {
            while let Some(left) = T::links(cur).as_ref().left() {
                cur = left;
            }
        }

        Some(cur)
    }

    fn last_raw(&self) -> Link<T> {
        let mut cur = self.root?;

        unsafe {
            while let Some(right) = T::links(cur).as_ref().right() {
                cur = right;
            }
        }

        Some(cur)
    }

    /// Returns an iterator over the tree's elements in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with
    // `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        unsafe {
            let links = T::links(parent).as_mut();

            if links.child(Dir::Left) == Some(old_child) {
                links.set_child(Dir::Left, new_child);
            } else {
                debug_assert_eq!(
                    links.child(Dir::Right),
                    Some(old_child),
                    "`old_child` must be a child of `parent`"
                );
                links.set_child(Dir::Right, new_child);
            }
        }
    }

    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if unsafe { T::links(parent).as_ref().left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }

    // Height of the subtree at `node`, measured in nodes; an empty subtree
    // has height 0. Derived by walking the subtree, never from stored
    // balance factors.
    fn subtree_height(&self, node: Link<T>) -> isize {
        match node {
            None => 0,
            Some(node) => unsafe {
                let left = self.subtree_height(T::links(node).as_ref().left());
                let right = self.subtree_height(T::links(node).as_ref().right());
                1 + left.max(right)
            },
        }
    }

    // Recomputes `node`'s balance factor from true subtree heights.
    unsafe fn update_balance(&mut self, node: NonNull<T>) {
        unsafe {
            let left = self.subtree_height(T::links(node).as_ref().left());
            let right = self.subtree_height(T::links(node).as_ref().right());

            T::links(node).as_mut().set_balance((right - left) as i8);
        }
    }

    // A node is unbalanced when its stored balance factor hits ±2.
    unsafe fn is_unbalanced(&self, node: NonNull<T>) -> bool {
        unsafe { T::links(node).as_ref().balance().abs() == 2 }
    }

    unsafe fn child_balance(&self, node: NonNull<T>, dir: Dir) -> Option<i8> {
        unsafe {
            T::links(node)
                .as_ref()
                .child(dir)
                .map(|child| T::links(child).as_ref().balance())
        }
    }

    // The four insertion imbalance shapes. The examined child sits on the
    // path insertion just recomputed, so its stored balance is current.

    unsafe fn needs_ll_rotation(&self, node: NonNull<T>) -> bool {
        unsafe {
            T::links(node).as_ref().balance() == -2
                && self.child_balance(node, Dir::Left) == Some(-1)
        }
    }

    unsafe fn needs_rr_rotation(&self, node: NonNull<T>) -> bool {
        unsafe {
            T::links(node).as_ref().balance() == 2 && self.child_balance(node, Dir::Right) == Some(1)
        }
    }

    unsafe fn needs_rl_rotation(&self, node: NonNull<T>) -> bool {
        unsafe {
            T::links(node).as_ref().balance() == 2
                && self.child_balance(node, Dir::Right) == Some(-1)
        }
    }

    unsafe fn needs_lr_rotation(&self, node: NonNull<T>) -> bool {
        unsafe {
            T::links(node).as_ref().balance() == -2 && self.child_balance(node, Dir::Left) == Some(1)
        }
    }

    // Removal widens the single-rotation cases: a child balance of 0 also
    // takes the single rotation.

    unsafe fn needs_ll_rotation_removal(&self, node: NonNull<T>) -> bool {
        unsafe {
            T::links(node).as_ref().balance() == -2
                && matches!(self.child_balance(node, Dir::Left), Some(-1) | Some(0))
        }
    }

    unsafe fn needs_rr_rotation_removal(&self, node: NonNull<T>) -> bool {
        unsafe {
            T::links(node).as_ref().balance() == 2
                && matches!(self.child_balance(node, Dir::Right), Some(1) | Some(0))
        }
    }

    // Rotates the subtree at `node` in direction `dir`, lifting the `!dir`
    // child to the subtree root. For `Dir::Right` this is the classic right
    // rotation: the left child becomes the new top, `node` becomes the new
    // top's right child, and the new top's former right child is reattached
    // as `node`'s left child.
    //
    // `node` must have a `!dir` child. Balance factors of the two rotated
    // nodes are recomputed from subtree heights after relinking; ancestors
    // are untouched and must be recomputed by the caller if needed.
    fn rotate(&mut self, node: NonNull<T>, dir: Dir) {
        unsafe {
            let new_top = T::links(node)
                .as_ref()
                .child(!dir)
                .expect("rotation requires a child on the rising side");
            let across = T::links(new_top).as_ref().child(dir);
            let parent = T::links(node).as_ref().parent();

            T::links(node).as_mut().set_child(!dir, across);
            self.maybe_set_parent(across, Some(node));

            T::links(new_top).as_mut().set_child(dir, Some(node));
            T::links(node).as_mut().set_parent(Some(new_top));
            T::links(new_top).as_mut().set_parent(parent);

            self.replace_child_or_set_root(parent, node, Some(new_top));

            self.update_balance(node);
            self.update_balance(new_top);
        }
    }

    fn rotate_right(&mut self, node: NonNull<T>) {
        self.rotate(node, Dir::Right);
    }

    fn rotate_left(&mut self, node: NonNull<T>) {
        self.rotate(node, Dir::Left);
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already contains a node with an equal key, the new node
    /// takes over the incumbent's position, relations and balance factor,
    /// and the incumbent's handle is returned; the tree shape is unchanged.
    ///
    /// This operation completes in _O(log(n))_ descent time, plus the height
    /// recomputation cost of the rebalancing walk.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        unsafe {
            let links = T::links(ptr).as_mut();
            links.set_parent(None);
            links.set_left(None);
            links.set_right(None);
            links.set_balance(0);
        }

        let Some(root) = self.root else {
            // Tree is empty. Set `item` as the root and return.
            self.root = Some(ptr);
            self.len += 1;
            return None;
        };

        // Descend the tree, looking for a suitable leaf.
        let mut cur = root;
        let (parent, dir, parent_was_leaf) = loop {
            let ordering = unsafe { ptr.as_ref().key().cmp(cur.as_ref().key()) };

            let dir = match ordering {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => {
                    let displaced = unsafe { self.replace_node(cur, ptr) };
                    self.trace_structure("insert");
                    return Some(displaced);
                }
            };

            match unsafe { T::links(cur).as_ref().child(dir) } {
                // Descend.
                Some(child) => cur = child,

                // Attach `item` as a new leaf.
                None => {
                    let was_leaf = unsafe {
                        let parent_links = T::links(cur).as_mut();
                        let was_leaf = parent_links.is_leaf();
                        parent_links.set_child(dir, Some(ptr));
                        T::links(ptr).as_mut().set_parent(Some(cur));
                        was_leaf
                    };
                    break (cur, dir, was_leaf);
                }
            }
        };

        // A parent that gains its second child keeps its height, so nothing
        // above it can have changed; rebalancing is only in play when the
        // parent was previously a leaf.
        if parent_was_leaf {
            self.propagate_insert(parent, dir);
        }

        self.len += 1;
        self.trace_structure("insert");

        None
    }

    // Swaps `new` into `old`'s position, taking over its parent, children
    // and balance factor. `old` is unlinked.
    unsafe fn replace_node(&mut self, old: NonNull<T>, new: NonNull<T>) -> T::Handle {
        unsafe {
            let parent = T::links(old).as_ref().parent();
            let left = T::links(old).as_ref().left();
            let right = T::links(old).as_ref().right();
            let balance = T::links(old).as_ref().balance();

            let links = T::links(new).as_mut();
            links.set_parent(parent);
            links.set_left(left);
            links.set_right(right);
            links.set_balance(balance);

            self.maybe_set_parent(left, Some(new));
            self.maybe_set_parent(right, Some(new));
            self.replace_child_or_set_root(parent, old, Some(new));

            T::from_ptr(old)
        }
    }

    // Walks from `node` to the root, recomputing each balance factor from
    // true subtree heights and resolving any ±2 imbalance with the matching
    // rotation case. The walk continues past a resolving rotation; balances
    // above are recomputed from real heights at every step either way.
    fn propagate_insert(&mut self, node: NonNull<T>, new_child_dir: Dir) {
        log::trace!(
            "propagating balance from {:?} ({:?} child attached)",
            unsafe { node.as_ref().key() },
            new_child_dir,
        );

        let mut cur = Some(node);
        while let Some(node) = cur {
            unsafe { self.update_balance(node) };

            // Captured before rotating: a rotation at `node` hoists a new
            // subtree root above it, and the climb resumes from the old
            // parent either way.
            let parent = unsafe { T::links(node).as_ref().parent() };

            if unsafe { self.is_unbalanced(node) } {
                unsafe { self.rebalance_inserted(node) };
            }

            cur = parent;
        }
    }

    // Resolves a ±2 balance factor at `node` using the insertion case split.
    unsafe fn rebalance_inserted(&mut self, node: NonNull<T>) {
        unsafe {
            if self.needs_ll_rotation(node) {
                log::debug!("LL rotation at {:?}", node.as_ref().key());
                self.rotate_right(node);
            } else if self.needs_rr_rotation(node) {
                log::debug!("RR rotation at {:?}", node.as_ref().key());
                self.rotate_left(node);
            } else if self.needs_rl_rotation(node) {
                log::debug!("RL rotation at {:?}", node.as_ref().key());
                let right = T::links(node)
                    .as_ref()
                    .right()
                    .expect("RL case requires a right child");
                self.rotate_right(right);
                self.rotate_left(node);
            } else if self.needs_lr_rotation(node) {
                log::debug!("LR rotation at {:?}", node.as_ref().key());
                let left = T::links(node)
                    .as_ref()
                    .left()
                    .expect("LR case requires a left child");
                self.rotate_left(left);
                self.rotate_right(node);
            }
        }
    }

    // Returns the maximum node in the subtree.
    //
    // If the subtree root is not the maximum, also returns the maximum
    // node's parent.
    #[inline]
    unsafe fn max_in_subtree(&self, root: NonNull<T>) -> (NonNull<T>, Option<NonNull<T>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(right) = unsafe { T::links(cur).as_ref().right() } {
            parent = Some(cur);
            cur = right;
        }

        (cur, parent)
    }

    /// Removes the node with the given key, returning its handle, or `None`
    /// if no such node exists.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        let handle = unsafe { self.remove_at(node) };
        self.trace_structure("remove");
        Some(handle)
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// A node with two children is replaced by its in-order predecessor: the
    /// predecessor is lifted out of the left subtree (it has no right child,
    /// so that is a 0/1-child unlink) and takes over the node's position and
    /// balance factor. Afterwards the recorded parent's balance factor is
    /// recomputed from true heights and at most one rotation case is
    /// resolved there; no further ancestors are examined.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element
    /// of `self`, and not any other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            // The rebalance site is fixed before any relinking: the parent
            // of the node as found by key, and the side the node hung from.
            let parent = T::links(node).as_ref().parent();
            let removed_dir = parent.map(|p| self.which_child(p, node));

            let left = T::links(node).as_ref().left();
            let right = T::links(node).as_ref().right();

            match (left, right) {
                (Some(left), Some(right)) => {
                    let (pred, pred_parent) = self.max_in_subtree(left);
                    let pred_left = T::links(pred).as_ref().left();

                    if let Some(pred_parent) = pred_parent {
                        // Lift the predecessor out, elevating its left child.
                        self.replace_child(pred_parent, pred, pred_left);
                        self.maybe_set_parent(pred_left, Some(pred_parent));

                        T::links(pred).as_mut().set_left(Some(left));
                        T::links(left).as_mut().set_parent(Some(pred));
                    }
                    // Left link is updated above iff pred != left.

                    self.replace_child_or_set_root(parent, node, Some(pred));
                    T::links(pred).as_mut().set_parent(parent);
                    T::links(pred).as_mut().set_right(Some(right));
                    T::links(right).as_mut().set_parent(Some(pred));

                    // Transfer balance of `node` to `pred`.
                    let balance = T::links(node).as_ref().balance();
                    T::links(pred).as_mut().set_balance(balance);
                }

                (Some(child), None) | (None, Some(child)) => {
                    self.replace_child_or_set_root(parent, node, Some(child));
                    T::links(child).as_mut().set_parent(parent);
                }

                (None, None) => {
                    self.replace_child_or_set_root(parent, node, None);
                }
            }

            if let Some(parent) = parent {
                self.update_balance(parent);
                self.rebalance_removed(parent, removed_dir.expect("parent implies a direction"));
            }

            self.len -= 1;

            T::from_ptr(node)
        }
    }

    // Repairs at most one imbalance at the recorded parent after a
    // structural removal. Deletion from the right side can only tip the
    // parent leftward (LL/LR cases); deletion from the left side mirrors
    // (RR/RL). No further ancestors are examined.
    unsafe fn rebalance_removed(&mut self, parent: NonNull<T>, removed_dir: Dir) {
        unsafe {
            match removed_dir {
                Dir::Right => {
                    if self.needs_ll_rotation_removal(parent) {
                        log::debug!("LL rotation at {:?}", parent.as_ref().key());
                        self.rotate_right(parent);
                    } else if self.needs_lr_rotation(parent) {
                        log::debug!("LR rotation at {:?}", parent.as_ref().key());
                        let left = T::links(parent)
                            .as_ref()
                            .left()
                            .expect("LR case requires a left child");
                        self.rotate_left(left);
                        self.rotate_right(parent);
                    }
                }

                Dir::Left => {
                    if self.needs_rr_rotation_removal(parent) {
                        log::debug!("RR rotation at {:?}", parent.as_ref().key());
                        self.rotate_left(parent);
                    } else if self.needs_rl_rotation(parent) {
                        log::debug!("RL rotation at {:?}", parent.as_ref().key());
                        let right = T::links(parent)
                            .as_ref()
                            .right()
                            .expect("RL case requires a right child");
                        self.rotate_right(right);
                        self.rotate_left(parent);
                    }
                }
            }
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the maximum node.
                let (cur, parent) = self.max_in_subtree(cur);
                let parent = parent.or_else(|| T::links(cur).as_ref().parent());

                let left = T::links(cur).as_ref().left();

                // Elevate the node's left child (which may be None).
                self.replace_child_or_set_root(parent, cur, left);
                self.maybe_set_parent(left, parent);

                // Drop the node.
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no left child, climb to the parent. If the
                // node had no parent, the tree is empty.
                opt_cur = left.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    fn trace_structure(&self, op: &str) {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("after {op}: {}", self.structure());
        }
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                balance: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Returns the stored balance factor.
    #[inline]
    pub fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    /// Adjusts the stored balance factor by `delta` without consulting
    /// subtree heights.
    #[inline]
    pub fn update_balance(&mut self, delta: i8) {
        self.inner.get_mut().balance += delta;
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_balance(&mut self, balance: i8) {
        self.inner.get_mut().balance = balance;
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("balance", &self.balance())
            .finish_non_exhaustive()
    }
}
