//! # Document Tree
//!
//! Arena owning every node of one document.
//!
//! Nodes are addressed by [`NodeId`] and read through borrowed [`NodeRef`]
//! handles. All structural edits go through `&mut Document`, which keeps the
//! parent/child links mutually consistent: a node is listed by exactly one
//! parent, or by none when detached.
//!
//! ## Lifecycle
//!
//! ```text
//! create → insert → (move | split | merge | wrap | unwrap)* → remove → release
//!   ↓        ↓                                                  ↓         ↓
//! detached  reachable                                      detached   dropped
//! ```
//!
//! Every edit is recorded in a change log. [`Document::take_changes`] drains
//! it, which is the natural dirty set for a redraw.

use crate::errors::{ChildError, TreeError, TreeResult};
use crate::node::{NodeData, NodeId, NodeKind, NodeRef};
use crate::Modifiers;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Editable document tree
#[derive(Debug)]
pub struct Document {
    nodes: HashMap<NodeId, NodeData>,
    root: NodeId,

    /// Incremented by every recorded edit
    version: u64,

    changes: Vec<NodeId>,
    changed: HashSet<NodeId>,

    /// Anchor and focus selection markers, created on first use
    pub(crate) markers: Option<(NodeId, NodeId)>,
}

/// Insertion point inside a container
#[derive(Debug, Clone, Copy)]
enum Slot {
    Start,
    End,
    Before(NodeId),
    After(NodeId),
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = NodeId::next();
        let mut nodes = HashMap::new();
        let mut data = NodeData::new(NodeKind::Root);
        data.breakable = false;
        nodes.insert(root, data);
        Self {
            nodes,
            root,
            version: 0,
            changes: Vec::new(),
            changed: HashSet::new(),
            markers: None,
        }
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(self, self.root)
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of live nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().child_ids().is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.contains(id).then(|| NodeRef::new(self, id))
    }

    pub fn try_node(&self, id: NodeId) -> TreeResult<NodeRef<'_>> {
        self.node(id).ok_or(TreeError::UnknownNode(id))
    }

    /// Arena lookup for ids held by a live `NodeRef`
    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[&id]
    }

    fn data_mut(&mut self, id: NodeId) -> TreeResult<&mut NodeData> {
        self.nodes.get_mut(&id).ok_or(TreeError::UnknownNode(id))
    }

    // ---- creation --------------------------------------------------------

    /// Create a detached node
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::next();
        self.nodes.insert(id, NodeData::new(kind));
        id
    }

    pub fn create_with(&mut self, kind: NodeKind, modifiers: Modifiers) -> NodeId {
        let id = self.create(kind);
        if let Some(data) = self.nodes.get_mut(&id) {
            data.modifiers = modifiers;
        }
        id
    }

    /// One detached `Char` node per character of `text`
    pub fn create_text(&mut self, text: &str) -> Vec<NodeId> {
        text.chars().map(|c| self.create(NodeKind::char(c))).collect()
    }

    /// Shallow clone: same kind, flags and modifiers, no children
    pub fn clone_node(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let source = self.try_node(id)?;
        let mut data = NodeData::new(source.kind().clone());
        data.tangible = source.is_tangible();
        data.breakable = source.is_breakable();
        data.modifiers = source.modifiers().clone();
        let clone = NodeId::next();
        self.nodes.insert(clone, data);
        Ok(clone)
    }

    pub fn set_tangible(&mut self, id: NodeId, tangible: bool) -> TreeResult<()> {
        self.data_mut(id)?.tangible = tangible;
        self.record(id);
        Ok(())
    }

    pub fn set_breakable(&mut self, id: NodeId, breakable: bool) -> TreeResult<()> {
        self.data_mut(id)?.breakable = breakable;
        Ok(())
    }

    /// Mutate a node's modifier stack. The node is recorded as changed.
    pub fn update_modifiers<R>(
        &mut self,
        id: NodeId,
        update: impl FnOnce(&mut Modifiers) -> R,
    ) -> TreeResult<R> {
        let result = update(&mut self.data_mut(id)?.modifiers);
        self.record(id);
        Ok(result)
    }

    // ---- structural edits ------------------------------------------------

    pub fn append(&mut self, parent: NodeId, nodes: &[NodeId]) -> TreeResult<()> {
        self.place(parent, nodes, Slot::End)
    }

    pub fn prepend(&mut self, parent: NodeId, nodes: &[NodeId]) -> TreeResult<()> {
        self.place(parent, nodes, Slot::Start)
    }

    /// Insert `node` into `parent` right before `reference`, which must be a
    /// child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: NodeId) -> TreeResult<()> {
        self.place(parent, &[node], Slot::Before(reference))
    }

    pub fn insert_after(&mut self, parent: NodeId, node: NodeId, reference: NodeId) -> TreeResult<()> {
        self.place(parent, &[node], Slot::After(reference))
    }

    /// Insert `nodes` as preceding siblings of `node`
    pub fn before(&mut self, node: NodeId, nodes: &[NodeId]) -> TreeResult<()> {
        let parent = self.parent_link_of(node)?;
        self.place(parent, nodes, Slot::Before(node))
    }

    pub fn after(&mut self, node: NodeId, nodes: &[NodeId]) -> TreeResult<()> {
        let parent = self.parent_link_of(node)?;
        self.place(parent, nodes, Slot::After(node))
    }

    /// Put `wrapper` where `node` is and move `node` inside it
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) -> TreeResult<()> {
        self.before(node, &[wrapper])?;
        self.append(wrapper, &[node])
    }

    /// Detach `node` from its parent. Detached nodes are left untouched.
    pub fn remove(&mut self, node: NodeId) -> TreeResult<()> {
        self.try_node(node)?;
        self.detach(node);
        Ok(())
    }

    /// Same as [`Document::remove`]; the direction only matters to callers
    pub fn remove_forward(&mut self, node: NodeId) -> TreeResult<()> {
        self.remove(node)
    }

    pub fn remove_backward(&mut self, node: NodeId) -> TreeResult<()> {
        self.remove(node)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.check_child(parent, child)?;
        self.detach(child);
        Ok(())
    }

    /// Detach every child, returning them in order
    pub fn empty(&mut self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        let children = self.try_node(node)?.child_ids().to_vec();
        for child in &children {
            self.detach(*child);
        }
        Ok(children)
    }

    /// Replace `node` with its own children, in place
    pub fn unwrap(&mut self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        let parent = self.parent_link_of(node)?;
        let children = self.try_node(node)?.child_ids().to_vec();
        if !children.is_empty() {
            self.place(parent, &children, Slot::Before(node))?;
        }
        self.detach(node);
        Ok(children)
    }

    /// Split `node` so that `child` and every following child move into a new
    /// sibling, which is returned. An unbreakable node is returned unchanged.
    pub fn split_at(&mut self, node: NodeId, child: NodeId) -> TreeResult<NodeId> {
        let index = self.check_child(node, child)?;
        let target = self.try_node(node)?;
        if !target.is_breakable() {
            return Ok(node);
        }
        let tail = target.child_ids()[index..].to_vec();
        let sibling = self.clone_node(node)?;
        if self.try_node(node)?.parent_link().is_some() {
            self.after(node, &[sibling])?;
        }
        self.place(sibling, &tail, Slot::End)?;
        debug!(node = %node, sibling = %sibling, moved = tail.len(), "split node");
        Ok(sibling)
    }

    /// Move all children of `node` to the end of `other`, then detach `node`
    pub fn merge_with(&mut self, node: NodeId, other: NodeId) -> TreeResult<()> {
        let children = self.try_node(node)?.child_ids().to_vec();
        self.place(other, &children, Slot::End)?;
        self.detach(node);
        Ok(())
    }

    /// Drop `node` and its subtree from the arena. Selection markers found
    /// inside are detached and kept.
    pub fn release(&mut self, node: NodeId) -> TreeResult<usize> {
        if node == self.root {
            return Err(TreeError::Root(node));
        }
        self.try_node(node)?;
        self.detach(node);
        let markers = self.markers;
        let is_marker = |id: NodeId| markers.map_or(false, |(a, f)| id == a || id == f);
        let mut released = 0;
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if is_marker(id) {
                self.detach(id);
                continue;
            }
            if let Some(data) = self.nodes.remove(&id) {
                stack.extend(data.children);
                self.changed.remove(&id);
                released += 1;
            }
        }
        self.changes.retain(|id| self.nodes.contains_key(id));
        Ok(released)
    }

    // ---- change log ------------------------------------------------------

    /// Drain the nodes touched since the last call, in first-touch order
    pub fn take_changes(&mut self) -> Vec<NodeId> {
        self.changed.clear();
        std::mem::take(&mut self.changes)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    fn record(&mut self, id: NodeId) {
        self.version += 1;
        if self.changed.insert(id) {
            self.changes.push(id);
        }
    }

    // ---- internals -------------------------------------------------------

    fn parent_link_of(&self, node: NodeId) -> TreeResult<NodeId> {
        self.try_node(node)?
            .parent_link()
            .map(|parent| parent.id())
            .ok_or(TreeError::Detached(node))
    }

    /// Index of `child` among the structural children of `parent`
    fn check_child(&self, parent: NodeId, child: NodeId) -> TreeResult<usize> {
        self.try_node(parent)?;
        let child = self.try_node(child)?;
        match (child.parent_link(), child.link_index()) {
            (Some(link), Some(index)) if link.id() == parent => Ok(index),
            _ => Err(ChildError { parent, child: child.id() }.into()),
        }
    }

    /// Unlink `node` from its parent, recording both
    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get(&node).and_then(|data| data.parent) else {
            return;
        };
        let tangible = self.nodes.get(&node).map_or(true, |data| data.tangible);
        if let Some(data) = self.nodes.get_mut(&parent) {
            data.children.retain(|id| *id != node);
        }
        if let Some(data) = self.nodes.get_mut(&node) {
            data.parent = None;
        }
        // Intangible nodes never render, so moving them is not a change
        if tangible {
            self.record(node);
            self.record(parent);
        }
    }

    fn place(&mut self, parent: NodeId, nodes: &[NodeId], slot: Slot) -> TreeResult<()> {
        let container = self.try_node(parent)?;
        if container.is_atomic() {
            return Err(TreeError::Atomic(parent));
        }
        let reference = match slot {
            Slot::Before(reference) | Slot::After(reference) => {
                self.check_child(parent, reference)?;
                Some(reference)
            }
            Slot::Start | Slot::End => None,
        };

        let mut moving = Vec::with_capacity(nodes.len());
        for &node in nodes {
            self.try_node(node)?;
            if Some(node) == reference || moving.contains(&node) {
                continue;
            }
            if node == self.root {
                return Err(TreeError::Root(node));
            }
            if node == parent || self.is_structural_ancestor(node, parent) {
                return Err(TreeError::Cycle { node, parent });
            }
            moving.push(node);
        }
        if moving.is_empty() {
            return Ok(());
        }

        for &node in &moving {
            self.detach(node);
        }

        let data = self.data_mut(parent)?;
        let index = match slot {
            Slot::Start => 0,
            Slot::End => data.children.len(),
            Slot::Before(reference) | Slot::After(reference) => {
                let index = data
                    .children
                    .iter()
                    .position(|id| *id == reference)
                    .ok_or(ChildError { parent, child: reference })?;
                if matches!(slot, Slot::After(_)) {
                    index + 1
                } else {
                    index
                }
            }
        };
        data.children.splice(index..index, moving.iter().copied());

        let mut tangible = false;
        for &node in &moving {
            let data = self.data_mut(node)?;
            data.parent = Some(parent);
            if data.tangible {
                tangible = true;
                self.record(node);
            }
        }
        if tangible {
            self.record(parent);
        }
        Ok(())
    }

    /// Whether `ancestor` is on the structural parent chain of `node`
    fn is_structural_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(&node).and_then(|data| data.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|data| data.parent);
        }
        false
    }

    /// Characters of the tangible `Char` descendants of `node`
    pub fn text_content(&self, node: NodeId) -> String {
        match self.node(node) {
            Some(node) => node.descendants(|n| n.is_char()).iter().filter_map(|n| n.char()).collect(),
            None => String::new(),
        }
    }
}
