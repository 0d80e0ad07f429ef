//! Ordered, parent-linked tree stored in an arena.
//!
//! Nodes are addressed by [`NodeId`]. A node owns the ordered list of its
//! children's ids; its parent is a plain index used for upward traversal.
//! Construction goes through [`TreeBuilder`], which carries the transient
//! insertion cursor so the finished [`Tree`] has none.

use core::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<T> {
    pub value: T,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    root: Option<NodeId>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Tree {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub fn value(&self, id: NodeId) -> &T {
        &self.nodes[id.0].value
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.nodes[id.0].children.is_empty()
    }

    /// Append a node under `parent`. A parentless node becomes the root
    /// unless one already exists.
    fn attach(&mut self, value: T, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
        id
    }

    /// Pre-order walk from the root.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Childless nodes in left-to-right order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| !self.has_children(*id))
            .collect()
    }

    /// Depth-indented outline, one node per line. Leaves are rendered as
    /// `[label]`, inner nodes as `<label>`.
    pub fn render(&self, label: impl Fn(&T) -> String) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.render_node(root, 0, &label, &mut out);
        }
        out
    }

    fn render_node(
        &self,
        id: NodeId,
        depth: usize,
        label: &impl Fn(&T) -> String,
        out: &mut String,
    ) {
        let text = label(self.value(id));
        let dashes = "-".repeat(depth);
        if self.has_children(id) {
            let _ = writeln!(out, "{dashes}<{text}>");
            for &child in self.children(id) {
                self.render_node(child, depth + 1, label, out);
            }
        } else {
            let _ = writeln!(out, "{dashes}[{text}]");
        }
    }
}

/// Builds a [`Tree`] through a movable insertion cursor.
///
/// `add_branch` appends a node under the cursor and moves the cursor onto
/// it; `climb` moves the cursor back to the parent; `add_leaf` appends
/// without moving.
#[derive(Debug)]
pub struct TreeBuilder<T> {
    tree: Tree<T>,
    cursor: Option<NodeId>,
}

impl<T> Default for TreeBuilder<T> {
    fn default() -> Self {
        TreeBuilder {
            tree: Tree::new(),
            cursor: None,
        }
    }
}

impl<T> TreeBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn tree(&self) -> &Tree<T> {
        &self.tree
    }

    pub fn add_branch(&mut self, value: T) -> NodeId {
        let id = self.tree.attach(value, self.cursor);
        self.cursor = Some(id);
        id
    }

    pub fn add_leaf(&mut self, value: T) -> NodeId {
        self.tree.attach(value, self.cursor)
    }

    pub fn climb(&mut self) {
        self.cursor = self.cursor.and_then(|id| self.tree.parent(id));
    }

    pub fn finish(self) -> Tree<T> {
        self.tree
    }
}
