use core::fmt::{self, Write as _};
use core::ptr::NonNull;
use std::collections::VecDeque;

use crate::{AvlTree, Link, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a compact one-line rendering of the tree, showing each node
    /// as `key:balance` with children in parentheses.
    ///
    /// This is the payload of the trace-level log line emitted after each
    /// mutating operation.
    pub fn structure(&self) -> Structure<'_, T> {
        Structure { tree: self }
    }

    /// Writes the tree as a Graphviz dot graph, one node per key, labeled
    /// `key:balance`. Missing children are rendered as points so sibling
    /// order is preserved.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            let remaining = queue.len();

            write!(w, "{{rank=same; ")?;

            for _ in 0..remaining {
                let node = match queue.pop_front().unwrap() {
                    Item::Node(node) => node,
                    Item::Missing(id) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let key = unsafe { node.as_ref().key() };
                let balance = unsafe { T::links(node).as_ref().balance() };
                write!(w, "\"graph{name}-{key:?}\" [label=\"{key:?}:{balance}\"]; ")?;

                for child in unsafe {
                    [T::links(node).as_ref().left(), T::links(node).as_ref().right()]
                } {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };

                            queue.push_back(Item::Node(child));
                            writeln!(
                                links,
                                "\"graph{name}-{key:?}\" -> \"graph{name}-{child_key:?}\";"
                            )?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                links,
                                "\"graph{name}-{key:?}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}

/// Displayable snapshot of an [`AvlTree`]'s shape; see [`AvlTree::structure`].
pub struct Structure<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> fmt::Display for Structure<'tree, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_subtree::<T>(f, self.tree.root)
    }
}

fn fmt_subtree<T>(f: &mut fmt::Formatter<'_>, node: Link<T>) -> fmt::Result
where
    T: TreeNode<Links<T>> + ?Sized,
{
    let Some(node) = node else {
        return f.write_str("_");
    };

    unsafe {
        let links = T::links(node).as_ref();
        let key = node.as_ref().key();
        let balance = links.balance();

        if links.left().is_none() && links.right().is_none() {
            return write!(f, "{key:?}:{balance}");
        }

        write!(f, "({key:?}:{balance} ")?;
        fmt_subtree::<T>(f, links.left())?;
        f.write_str(" ")?;
        fmt_subtree::<T>(f, links.right())?;
        f.write_str(")")
    }
}
