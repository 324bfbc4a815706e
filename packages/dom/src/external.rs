//! # External Tree
//!
//! In-memory stand-in for a live browser document.
//!
//! Element and text nodes live in an arena and are never freed, like nodes a
//! page script still holds on to. Every change to a node connected to the
//! document root is appended to a record log shaped after `MutationObserver`
//! records; changes to detached subtrees are free. This is what redraw tests
//! count.

use crate::errors::{DomError, DomResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use vellum_document::{Attributes, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId(u32);

impl ExternalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Content {
    Element { tag: String, attributes: Attributes },
    Text(String),
}

#[derive(Debug, Clone)]
struct ExternalNode {
    content: Content,
    parent: Option<ExternalId>,
    children: Vec<ExternalId>,
}

/// Observable change to the connected tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MutationRecord {
    ChildList {
        target: ExternalId,
        added: Vec<ExternalId>,
        removed: Vec<ExternalId>,
    },
    Attributes {
        target: ExternalId,
        name: String,
    },
    CharacterData {
        target: ExternalId,
    },
}

impl MutationRecord {
    pub fn target(&self) -> ExternalId {
        match self {
            MutationRecord::ChildList { target, .. }
            | MutationRecord::Attributes { target, .. }
            | MutationRecord::CharacterData { target } => *target,
        }
    }
}

/// Caret position: a child index inside an element, or a character offset
/// inside a text node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPoint {
    pub node: ExternalId,
    pub offset: usize,
}

impl ExternalPoint {
    pub fn new(node: ExternalId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSelection {
    pub anchor: ExternalPoint,
    pub focus: ExternalPoint,
    pub direction: Direction,
}

#[derive(Debug, Clone)]
pub struct ExternalDom {
    nodes: Vec<ExternalNode>,
    root: ExternalId,
    records: Vec<MutationRecord>,
    mutation_count: usize,
    selection: Option<ExternalSelection>,
}

impl Default for ExternalDom {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalDom {
    /// Empty document with a `body` root
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: ExternalId(0),
            records: Vec::new(),
            mutation_count: 0,
            selection: None,
        };
        dom.root = dom.create_element("body");
        dom
    }

    pub fn root(&self) -> ExternalId {
        self.root
    }

    fn node(&self, id: ExternalId) -> DomResult<&ExternalNode> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: ExternalId) -> DomResult<&mut ExternalNode> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn element_attributes_mut(&mut self, id: ExternalId) -> DomResult<&mut Attributes> {
        match &mut self.node_mut(id)?.content {
            Content::Element { attributes, .. } => Ok(attributes),
            Content::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn element_attributes(&self, id: ExternalId) -> DomResult<&Attributes> {
        match &self.node(id)?.content {
            Content::Element { attributes, .. } => Ok(attributes),
            Content::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn push(&mut self, content: Content) -> ExternalId {
        let id = ExternalId(self.nodes.len() as u32);
        self.nodes.push(ExternalNode {
            content,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, tag: &str) -> ExternalId {
        self.push(Content::Element {
            tag: tag.to_string(),
            attributes: Attributes::new(),
        })
    }

    pub fn create_text(&mut self, content: &str) -> ExternalId {
        self.push(Content::Text(content.to_string()))
    }

    // ---- queries ---------------------------------------------------------

    pub fn contains(&self, id: ExternalId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Whether `id` is reachable from the document root
    pub fn is_connected(&self, id: ExternalId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.nodes.get(node.index()).and_then(|n| n.parent);
        }
        false
    }

    pub fn is_element(&self, id: ExternalId) -> bool {
        matches!(self.node(id).map(|n| &n.content), Ok(Content::Element { .. }))
    }

    pub fn is_text(&self, id: ExternalId) -> bool {
        matches!(self.node(id).map(|n| &n.content), Ok(Content::Text(_)))
    }

    pub fn parent(&self, id: ExternalId) -> Option<ExternalId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ExternalId) -> DomResult<&[ExternalId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn index_of(&self, id: ExternalId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.nodes[parent.index()].children.iter().position(|c| *c == id)
    }

    pub fn tag(&self, id: ExternalId) -> Option<&str> {
        match &self.node(id).ok()?.content {
            Content::Element { tag, .. } => Some(tag),
            Content::Text(_) => None,
        }
    }

    pub fn text(&self, id: ExternalId) -> Option<&str> {
        match &self.node(id).ok()?.content {
            Content::Text(text) => Some(text),
            Content::Element { .. } => None,
        }
    }

    pub fn attribute(&self, id: ExternalId, name: &str) -> Option<String> {
        self.element_attributes(id).ok()?.get(name)
    }

    pub fn attributes(&self, id: ExternalId) -> Option<&Attributes> {
        self.element_attributes(id).ok()
    }

    pub fn classes(&self, id: ExternalId) -> Vec<String> {
        self.element_attributes(id)
            .map(|a| a.classes().to_vec())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: ExternalId, class: &str) -> bool {
        self.element_attributes(id).map_or(false, |a| a.has_class(class))
    }

    pub fn style_value(&self, id: ExternalId, property: &str) -> Option<String> {
        self.element_attributes(id)
            .ok()?
            .style_value(property)
            .map(str::to_string)
    }

    // ---- mutations -------------------------------------------------------

    fn record(&mut self, record: MutationRecord) {
        if self.is_connected(record.target()) {
            self.mutation_count += 1;
            self.records.push(record);
        }
    }

    /// Insert `child` into `parent` before `reference`, or last when
    /// `reference` is `None`. A connected child is moved.
    pub fn insert_before(
        &mut self,
        parent: ExternalId,
        child: ExternalId,
        reference: Option<ExternalId>,
    ) -> DomResult<()> {
        self.element_attributes(parent)?;
        self.node(child)?;
        if Some(child) == reference {
            return Ok(());
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }
        let mut ancestor = Some(parent);
        while let Some(node) = ancestor {
            if node == child {
                return Err(DomError::Hierarchy { parent, child });
            }
            ancestor = self.parent(node);
        }

        self.detach(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let index = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    pub fn append_child(&mut self, parent: ExternalId, child: ExternalId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Detach `id` from its parent. Detached nodes are left untouched.
    pub fn remove(&mut self, id: ExternalId) -> DomResult<()> {
        self.node(id)?;
        self.detach(id)
    }

    fn detach(&mut self, id: ExternalId) -> DomResult<()> {
        let Some(parent) = self.parent(id) else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|c| *c != id);
        self.node_mut(id)?.parent = None;
        self.record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![id],
        });
        Ok(())
    }

    pub fn set_attribute(&mut self, id: ExternalId, name: &str, value: &str) -> DomResult<()> {
        self.element_attributes_mut(id)?.set(name, value);
        self.record(MutationRecord::Attributes {
            target: id,
            name: name.to_string(),
        });
        Ok(())
    }

    /// Returns whether the attribute was present
    pub fn remove_attribute(&mut self, id: ExternalId, name: &str) -> DomResult<bool> {
        let removed = self.element_attributes_mut(id)?.remove(name);
        if removed {
            self.record(MutationRecord::Attributes {
                target: id,
                name: name.to_string(),
            });
        }
        Ok(removed)
    }

    pub fn add_class(&mut self, id: ExternalId, class: &str) -> DomResult<()> {
        let attributes = self.element_attributes_mut(id)?;
        if !attributes.has_class(class) {
            attributes.add_class(class);
            self.record(MutationRecord::Attributes {
                target: id,
                name: "class".to_string(),
            });
        }
        Ok(())
    }

    pub fn remove_class(&mut self, id: ExternalId, class: &str) -> DomResult<()> {
        if self.element_attributes_mut(id)?.remove_class(class) {
            self.record(MutationRecord::Attributes {
                target: id,
                name: "class".to_string(),
            });
        }
        Ok(())
    }

    pub fn set_style(&mut self, id: ExternalId, property: &str, value: &str) -> DomResult<()> {
        let attributes = self.element_attributes_mut(id)?;
        if attributes.style_value(property) != Some(value) {
            attributes.set_style(property, value);
            self.record(MutationRecord::Attributes {
                target: id,
                name: "style".to_string(),
            });
        }
        Ok(())
    }

    pub fn remove_style(&mut self, id: ExternalId, property: &str) -> DomResult<()> {
        if self.element_attributes_mut(id)?.remove_style(property) {
            self.record(MutationRecord::Attributes {
                target: id,
                name: "style".to_string(),
            });
        }
        Ok(())
    }

    pub fn set_text(&mut self, id: ExternalId, content: &str) -> DomResult<()> {
        match &mut self.node_mut(id)?.content {
            Content::Text(text) => *text = content.to_string(),
            Content::Element { .. } => return Err(DomError::NotText(id)),
        }
        self.record(MutationRecord::CharacterData { target: id });
        Ok(())
    }

    // ---- records and selection ------------------------------------------

    pub fn records(&self) -> &[MutationRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    /// Records produced since creation, drained or not
    pub fn mutation_count(&self) -> usize {
        self.mutation_count
    }

    pub fn selection(&self) -> Option<ExternalSelection> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Option<ExternalSelection>) {
        self.selection = selection;
    }

    // ---- serialization ---------------------------------------------------

    pub fn text_content(&self, id: ExternalId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: ExternalId, out: &mut String) {
        let Ok(node) = self.node(id) else { return };
        match &node.content {
            Content::Text(text) => out.push_str(text),
            Content::Element { .. } => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn to_html(&self, id: ExternalId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: ExternalId) -> String {
        let mut out = String::new();
        if let Ok(node) = self.node(id) {
            for child in &node.children {
                self.write_html(*child, &mut out);
            }
        }
        out
    }

    fn write_html(&self, id: ExternalId, out: &mut String) {
        let Ok(node) = self.node(id) else { return };
        match &node.content {
            Content::Text(text) => out.push_str(&escape(text, false)),
            Content::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes.to_pairs() {
                    out.push_str(&format!(" {}=\"{}\"", name, escape(&value, true)));
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "br" | "img" | "hr" | "input" | "meta" | "link" | "wbr"
    )
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
