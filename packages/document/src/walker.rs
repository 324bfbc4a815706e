//! # Walker
//!
//! Tree navigation parameterized by a visibility policy.
//!
//! Every query on [`NodeRef`] is one of these algorithms run under
//! [`Walker::TANGIBLE`]. [`Walker::STRUCTURAL`] runs the same algorithms over
//! the raw structure, markers included. Invisible nodes are skipped as results
//! but still traversed, so their visible descendants stay reachable.
//!
//! Ordering (`is_before`/`is_after`) is structural and policy independent.

use crate::node::{any, NodeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walker {
    ignore_intangible: bool,
}

impl Walker {
    /// Skips intangible nodes. The policy of every `NodeRef` method.
    pub const TANGIBLE: Walker = Walker::new(true);

    /// Sees every node, intangible ones included.
    pub const STRUCTURAL: Walker = Walker::new(false);

    pub const fn new(ignore_intangible: bool) -> Self {
        Self { ignore_intangible }
    }

    pub fn ignores_intangible(&self) -> bool {
        self.ignore_intangible
    }

    fn visible(&self, node: NodeRef<'_>) -> bool {
        !self.ignore_intangible || node.is_tangible()
    }

    pub fn parent<'a>(&self, node: NodeRef<'a>) -> Option<NodeRef<'a>> {
        let mut current = node.parent_link();
        while let Some(parent) = current {
            if self.visible(parent) {
                return Some(parent);
            }
            current = parent.parent_link();
        }
        None
    }

    pub fn children<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Vec<NodeRef<'a>> {
        let mut children = Vec::new();
        self.collect_children(node, &predicate, &mut children);
        children
    }

    fn collect_children<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: &dyn Fn(NodeRef<'a>) -> bool,
        out: &mut Vec<NodeRef<'a>>,
    ) {
        for child in node.child_links() {
            if self.visible(child) {
                if predicate(child) {
                    out.push(child);
                }
            } else {
                self.collect_children(child, predicate, out);
            }
        }
    }

    pub fn first_child<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        self.find_child(node, &predicate, false)
    }

    pub fn last_child<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        self.find_child(node, &predicate, true)
    }

    fn find_child<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: &dyn Fn(NodeRef<'a>) -> bool,
        reverse: bool,
    ) -> Option<NodeRef<'a>> {
        let links: Vec<NodeRef<'a>> = if reverse {
            node.child_links().rev().collect()
        } else {
            node.child_links().collect()
        };
        for child in links {
            if self.visible(child) {
                if predicate(child) {
                    return Some(child);
                }
            } else if let Some(found) = self.find_child(child, predicate, reverse) {
                return Some(found);
            }
        }
        None
    }

    /// 1-based index into the visible children
    pub fn nth_child<'a>(&self, node: NodeRef<'a>, n: usize) -> Option<NodeRef<'a>> {
        let index = n.checked_sub(1)?;
        self.children(node, any).get(index).copied()
    }

    /// Pre-order list of visible descendants matching `predicate`
    pub fn descendants<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Vec<NodeRef<'a>> {
        let mut descendants = Vec::new();
        self.collect_descendants(node, &predicate, &mut descendants);
        descendants
    }

    fn collect_descendants<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: &dyn Fn(NodeRef<'a>) -> bool,
        out: &mut Vec<NodeRef<'a>>,
    ) {
        for child in node.child_links() {
            if self.visible(child) && predicate(child) {
                out.push(child);
            }
            self.collect_descendants(child, predicate, out);
        }
    }

    pub fn first_descendant<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        self.find_first_descendant(node, &predicate)
    }

    fn find_first_descendant<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: &dyn Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        for child in node.child_links() {
            if self.visible(child) && predicate(child) {
                return Some(child);
            }
            if let Some(found) = self.find_first_descendant(child, predicate) {
                return Some(found);
            }
        }
        None
    }

    pub fn last_descendant<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        self.find_last_descendant(node, &predicate)
    }

    fn find_last_descendant<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: &dyn Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        for child in node.child_links().rev() {
            if let Some(found) = self.find_last_descendant(child, predicate) {
                return Some(found);
            }
            if self.visible(child) && predicate(child) {
                return Some(child);
            }
        }
        None
    }

    /// Visible ancestors matching `predicate`, nearest first
    pub fn ancestors<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Vec<NodeRef<'a>> {
        let mut ancestors = Vec::new();
        let mut current = node.parent_link();
        while let Some(ancestor) = current {
            if self.visible(ancestor) && predicate(ancestor) {
                ancestors.push(ancestor);
            }
            current = ancestor.parent_link();
        }
        ancestors
    }

    pub fn ancestor<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        let mut current = node.parent_link();
        while let Some(ancestor) = current {
            if self.visible(ancestor) && predicate(ancestor) {
                return Some(ancestor);
            }
            current = ancestor.parent_link();
        }
        None
    }

    /// Deepest node matching `predicate` that contains both nodes. A node
    /// counts as containing itself.
    pub fn common_ancestor<'a>(
        &self,
        node: NodeRef<'a>,
        other: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        let path = |start: NodeRef<'a>| {
            let mut path = Vec::new();
            if self.visible(start) && predicate(start) {
                path.push(start);
            }
            path.extend(self.ancestors(start, &predicate));
            path
        };
        let mut node_path = path(node);
        let mut other_path = path(other);
        let mut common = None;
        while let (Some(a), Some(b)) = (node_path.pop(), other_path.pop()) {
            if a != b {
                break;
            }
            common = Some(a);
        }
        common
    }

    /// Visible siblings of `node` and the index at which `node` sits among
    /// them. Invisible nodes are absent from the list; their index is where
    /// they would be inserted.
    fn siblings<'a>(&self, node: NodeRef<'a>) -> Option<(Vec<NodeRef<'a>>, usize, bool)> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent, any);
        if let Some(index) = siblings.iter().position(|sibling| *sibling == node) {
            return Some((siblings, index, true));
        }
        let index = siblings
            .iter()
            .position(|sibling| self.is_before(node, *sibling))
            .unwrap_or(siblings.len());
        Some((siblings, index, false))
    }

    pub fn previous_sibling<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        let (siblings, index, _) = self.siblings(node)?;
        siblings[..index].iter().rev().copied().find(|s| predicate(*s))
    }

    pub fn next_sibling<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        let (siblings, index, found) = self.siblings(node)?;
        let start = if found { index + 1 } else { index };
        siblings[start..].iter().copied().find(|s| predicate(*s))
    }

    /// Preceding visible siblings matching `predicate`, nearest first
    pub fn previous_siblings<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Vec<NodeRef<'a>> {
        match self.siblings(node) {
            Some((siblings, index, _)) => siblings[..index]
                .iter()
                .rev()
                .copied()
                .filter(|s| predicate(*s))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn next_siblings<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Vec<NodeRef<'a>> {
        match self.siblings(node) {
            Some((siblings, index, found)) => {
                let start = if found { index + 1 } else { index };
                siblings[start..]
                    .iter()
                    .copied()
                    .filter(|s| predicate(*s))
                    .collect()
            }
            None => Vec::new(),
        }
    }

    /// Pre-order successor matching `predicate`
    pub fn next<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        let mut current = self.successor(node);
        while let Some(candidate) = current {
            if predicate(candidate) {
                return Some(candidate);
            }
            current = self.successor(candidate);
        }
        None
    }

    fn successor<'a>(&self, node: NodeRef<'a>) -> Option<NodeRef<'a>> {
        if let Some(child) = self.first_child(node, any) {
            return Some(child);
        }
        let mut cursor = node;
        loop {
            if let Some(sibling) = self.next_sibling(cursor, any) {
                return Some(sibling);
            }
            cursor = self.parent(cursor)?;
        }
    }

    /// Pre-order predecessor matching `predicate`
    pub fn previous<'a>(
        &self,
        node: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        let mut current = self.predecessor(node);
        while let Some(candidate) = current {
            if predicate(candidate) {
                return Some(candidate);
            }
            current = self.predecessor(candidate);
        }
        None
    }

    fn predecessor<'a>(&self, node: NodeRef<'a>) -> Option<NodeRef<'a>> {
        match self.previous_sibling(node, any) {
            Some(sibling) => Some(self.last_descendant(sibling, any).unwrap_or(sibling)),
            None => self.parent(node),
        }
    }

    /// Structural pre-order comparison.
    ///
    /// Nodes of different trees compare false both ways, which makes this a
    /// total order only within one tree.
    pub fn is_before(&self, node: NodeRef<'_>, other: NodeRef<'_>) -> bool {
        if node == other {
            return false;
        }
        let mut node_path = link_path(node);
        let mut other_path = link_path(other);
        if node_path.last() != other_path.last() {
            return false;
        }
        let mut shared = None;
        while let (Some(a), Some(b)) = (node_path.last(), other_path.last()) {
            if a != b {
                break;
            }
            shared = Some(*a);
            node_path.pop();
            other_path.pop();
        }
        match (node_path.last(), other_path.last(), shared) {
            (Some(a), Some(b), Some(parent)) => {
                let ids = parent.child_ids();
                let a_index = ids.iter().position(|id| *id == a.id());
                let b_index = ids.iter().position(|id| *id == b.id());
                a_index < b_index
            }
            // `node` is an ancestor of `other`
            (None, Some(_), _) => true,
            _ => false,
        }
    }

    pub fn is_after(&self, node: NodeRef<'_>, other: NodeRef<'_>) -> bool {
        self.is_before(other, node)
    }
}

/// Structural path from `node` up to its root
fn link_path(node: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut path = vec![node];
    let mut current = node;
    while let Some(parent) = current.parent_link() {
        path.push(parent);
        current = parent;
    }
    path
}
