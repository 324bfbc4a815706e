//! # Nodes
//!
//! Identity, concrete kinds and the borrowed [`NodeRef`] handle through which
//! every read-only query on the tree is made.
//!
//! Navigation methods on `NodeRef` use the tangible-only policy: intangible
//! nodes (selection markers) are skipped as if absent, while their children are
//! still reached. [`Walker`] exposes the same queries under other policies.

use crate::{Document, Modifiers, Walker};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity. Monotonically increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Concrete node type. A node never changes kind; type changes are
/// replacements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    /// Document root
    Root,

    /// Block or inline container such as `p`, `h1` or `li`
    Container { name: String },

    /// Single character leaf
    Char { value: char },

    LineBreak,

    /// Other atomic leaf such as `img`
    Atomic { name: String },

    /// Intangible selection marker
    Marker,
}

impl NodeKind {
    pub fn container(name: impl Into<String>) -> Self {
        NodeKind::Container { name: name.into() }
    }

    pub fn atomic(name: impl Into<String>) -> Self {
        NodeKind::Atomic { name: name.into() }
    }

    pub fn char(value: char) -> Self {
        NodeKind::Char { value }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Container { .. })
    }

    pub fn is_atomic(&self) -> bool {
        !self.is_container()
    }

    /// Inline leaves flow with surrounding text
    pub fn is_inline(&self) -> bool {
        matches!(self, NodeKind::Char { .. } | NodeKind::Atomic { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Container { name } | NodeKind::Atomic { name } => name,
            NodeKind::Char { .. } => "char",
            NodeKind::LineBreak => "br",
            NodeKind::Marker => "marker",
        }
    }

    pub(crate) fn default_tangible(&self) -> bool {
        !matches!(self, NodeKind::Marker)
    }

    pub(crate) fn default_breakable(&self) -> bool {
        matches!(self, NodeKind::Container { .. })
    }
}

/// Arena slot for a single node
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) tangible: bool,
    pub(crate) breakable: bool,
    pub(crate) modifiers: Modifiers,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            tangible: kind.default_tangible(),
            breakable: kind.default_breakable(),
            kind,
            parent: None,
            children: Vec::new(),
            modifiers: Modifiers::new(),
        }
    }
}

/// Predicate accepting every node
pub fn any(_: NodeRef<'_>) -> bool {
    true
}

/// Borrowed handle on a node of a [`Document`]
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind().name(), self.id)
    }
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    fn data(&self) -> &'a NodeData {
        self.doc.data(self.id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.data().kind
    }

    pub fn name(&self) -> &'a str {
        self.data().kind.name()
    }

    pub fn char(&self) -> Option<char> {
        match self.data().kind {
            NodeKind::Char { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_char(&self) -> bool {
        matches!(self.data().kind, NodeKind::Char { .. })
    }

    pub fn is_container(&self) -> bool {
        self.data().kind.is_container()
    }

    pub fn is_atomic(&self) -> bool {
        self.data().kind.is_atomic()
    }

    pub fn is_tangible(&self) -> bool {
        self.data().tangible
    }

    pub fn is_breakable(&self) -> bool {
        self.data().breakable
    }

    pub fn modifiers(&self) -> &'a Modifiers {
        &self.data().modifiers
    }

    /// Editability: the nearest explicit flag on this node or a tangible
    /// ancestor wins; editable when no flag is found.
    pub fn editable(&self) -> bool {
        let mut current = Some(*self);
        while let Some(node) = current {
            if let Some(editable) = node.modifiers().editable() {
                return editable;
            }
            current = node.parent();
        }
        true
    }

    /// Direct structural parent, possibly intangible
    pub fn parent_link(&self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| NodeRef::new(self.doc, id))
    }

    /// Direct structural children, intangible ones included
    pub fn child_links(&self) -> impl DoubleEndedIterator<Item = NodeRef<'a>> + ExactSizeIterator + 'a {
        let doc = self.doc;
        self.data().children.iter().map(move |id| NodeRef::new(doc, *id))
    }

    pub fn child_ids(&self) -> &'a [NodeId] {
        &self.data().children
    }

    /// Whether this node belongs to the document's main tree
    pub fn is_attached(&self) -> bool {
        self.root_link().id == self.doc.root_id()
    }

    /// Topmost structural ancestor (self when detached)
    pub fn root_link(&self) -> NodeRef<'a> {
        let mut current = *self;
        while let Some(parent) = current.parent_link() {
            current = parent;
        }
        current
    }

    /// Index among the structural children of `parent_link`
    pub fn link_index(&self) -> Option<usize> {
        let parent = self.parent_link()?;
        parent.child_ids().iter().position(|id| *id == self.id)
    }

    pub fn test(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> bool {
        predicate(*self)
    }

    // Tangible-policy navigation, see `Walker`.

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.parent(*self)
    }

    pub fn children(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Vec<NodeRef<'a>> {
        Walker::TANGIBLE.children(*self, predicate)
    }

    pub fn has_children(&self) -> bool {
        Walker::TANGIBLE.first_child(*self, any).is_some()
    }

    pub fn first_child(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.first_child(*self, predicate)
    }

    pub fn last_child(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.last_child(*self, predicate)
    }

    /// 1-based
    pub fn nth_child(&self, n: usize) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.nth_child(*self, n)
    }

    pub fn descendants(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Vec<NodeRef<'a>> {
        Walker::TANGIBLE.descendants(*self, predicate)
    }

    pub fn first_descendant(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.first_descendant(*self, predicate)
    }

    pub fn last_descendant(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.last_descendant(*self, predicate)
    }

    pub fn ancestors(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Vec<NodeRef<'a>> {
        Walker::TANGIBLE.ancestors(*self, predicate)
    }

    pub fn ancestor(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.ancestor(*self, predicate)
    }

    pub fn common_ancestor(
        &self,
        other: NodeRef<'a>,
        predicate: impl Fn(NodeRef<'a>) -> bool,
    ) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.common_ancestor(*self, other, predicate)
    }

    pub fn previous_sibling(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.previous_sibling(*self, predicate)
    }

    pub fn next_sibling(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.next_sibling(*self, predicate)
    }

    pub fn previous_siblings(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Vec<NodeRef<'a>> {
        Walker::TANGIBLE.previous_siblings(*self, predicate)
    }

    pub fn next_siblings(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Vec<NodeRef<'a>> {
        Walker::TANGIBLE.next_siblings(*self, predicate)
    }

    /// Pre-order predecessor
    pub fn previous(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.previous(*self, predicate)
    }

    /// Pre-order successor
    pub fn next(&self, predicate: impl Fn(NodeRef<'a>) -> bool) -> Option<NodeRef<'a>> {
        Walker::TANGIBLE.next(*self, predicate)
    }

    /// Total order within one tree. Ancestors come before their descendants.
    /// Nodes of different trees are unordered: false in both directions.
    pub fn is_before(&self, other: NodeRef<'a>) -> bool {
        Walker::TANGIBLE.is_before(*self, other)
    }

    pub fn is_after(&self, other: NodeRef<'a>) -> bool {
        Walker::TANGIBLE.is_after(*self, other)
    }
}
