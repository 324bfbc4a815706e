//! Render descriptions: what a renderer says a node should look like.
//!
//! A description is an engine-agnostic tree. `Node` entries refer to other
//! document nodes, which the engine renders with their own renderers and
//! splices in place.

use crate::external::ExternalId;
use std::fmt;
use std::rc::Rc;
use vellum_document::NodeId;

/// Side effect run with an external node
pub type Hook = Rc<dyn Fn(ExternalId)>;

/// Optional lifecycle hooks of an element or fragment
#[derive(Clone, Default)]
pub struct Hooks {
    /// Called after a newly built external node is inserted
    pub attach: Option<Hook>,
    /// Called when an external node is discarded
    pub detach: Option<Hook>,
}

impl Hooks {
    pub fn is_empty(&self) -> bool {
        self.attach.is_none() && self.detach.is_none()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("attach", &self.attach.is_some())
            .field("detach", &self.detach.is_some())
            .finish()
    }
}

impl PartialEq for Hooks {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: &Option<Hook>, b: &Option<Hook>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        same(&self.attach, &other.attach) && same(&self.detach, &other.detach)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementDescription {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<RenderDescription>,
    /// Extra document nodes represented by this element
    pub nodes: Vec<NodeId>,
    pub hooks: Hooks,
}

/// Character range of a text node standing for one document node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextDescription {
    pub content: String,
    pub spans: Vec<TextSpan>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentDescription {
    pub children: Vec<RenderDescription>,
    pub hooks: Hooks,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderDescription {
    Element(ElementDescription),

    Text(TextDescription),

    /// Children spliced into the parent with no wrapping node
    Fragment(FragmentDescription),

    /// External nodes built by foreign code, placed verbatim
    Native(Vec<ExternalId>),

    /// Another document node, rendered by its own renderer
    Node(NodeId),
}

impl RenderDescription {
    pub fn element(tag: impl Into<String>) -> Self {
        RenderDescription::Element(ElementDescription {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            nodes: Vec::new(),
            hooks: Hooks::default(),
        })
    }

    pub fn text(content: impl Into<String>) -> Self {
        RenderDescription::Text(TextDescription {
            content: content.into(),
            spans: Vec::new(),
        })
    }

    pub fn fragment(children: Vec<RenderDescription>) -> Self {
        RenderDescription::Fragment(FragmentDescription {
            children,
            hooks: Hooks::default(),
        })
    }

    pub fn empty() -> Self {
        Self::fragment(Vec::new())
    }

    pub fn native(nodes: Vec<ExternalId>) -> Self {
        RenderDescription::Native(nodes)
    }

    pub fn node(id: NodeId) -> Self {
        RenderDescription::Node(id)
    }

    /// Element attribute; pairs keep insertion order, a repeated key is
    /// overwritten in place
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let RenderDescription::Element(ref mut element) = self {
            let key = key.into();
            let value = value.into();
            match element.attributes.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => element.attributes.push((key, value)),
            }
        }
        self
    }

    pub fn with_attrs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        for (key, value) in pairs {
            self = self.with_attr(key, value);
        }
        self
    }

    pub fn with_child(mut self, child: RenderDescription) -> Self {
        match self {
            RenderDescription::Element(ElementDescription {
                ref mut children, ..
            })
            | RenderDescription::Fragment(FragmentDescription {
                ref mut children, ..
            }) => children.push(child),
            _ => {}
        }
        self
    }

    pub fn with_children(mut self, new_children: impl IntoIterator<Item = RenderDescription>) -> Self {
        match self {
            RenderDescription::Element(ElementDescription {
                ref mut children, ..
            })
            | RenderDescription::Fragment(FragmentDescription {
                ref mut children, ..
            }) => children.extend(new_children),
            _ => {}
        }
        self
    }

    /// Register extra document nodes represented by this element
    pub fn with_nodes(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        if let RenderDescription::Element(ref mut element) = self {
            element.nodes.extend(ids);
        }
        self
    }

    /// Map `node` onto characters `start..end` of this text
    pub fn with_span(mut self, node: NodeId, start: usize, end: usize) -> Self {
        if let RenderDescription::Text(ref mut text) = self {
            text.spans.push(TextSpan { node, start, end });
        }
        self
    }

    pub fn on_attach(mut self, hook: impl Fn(ExternalId) + 'static) -> Self {
        if let Some(hooks) = self.hooks_mut() {
            hooks.attach = Some(Rc::new(hook));
        }
        self
    }

    pub fn on_detach(mut self, hook: impl Fn(ExternalId) + 'static) -> Self {
        if let Some(hooks) = self.hooks_mut() {
            hooks.detach = Some(Rc::new(hook));
        }
        self
    }

    fn hooks_mut(&mut self) -> Option<&mut Hooks> {
        match self {
            RenderDescription::Element(element) => Some(&mut element.hooks),
            RenderDescription::Fragment(fragment) => Some(&mut fragment.hooks),
            _ => None,
        }
    }

    /// Maximal runs of consecutive `Node` entries, in order. A top-level
    /// `Node` is a run of its own.
    pub fn node_runs(&self) -> Vec<Vec<NodeId>> {
        let mut runs = Vec::new();
        match self {
            RenderDescription::Node(id) => runs.push(vec![*id]),
            _ => collect_runs(self, &mut runs),
        }
        runs
    }

    /// Every document node referenced anywhere in the description
    pub fn node_refs(&self) -> Vec<NodeId> {
        self.node_runs().into_iter().flatten().collect()
    }
}

fn collect_runs(description: &RenderDescription, runs: &mut Vec<Vec<NodeId>>) {
    let children = match description {
        RenderDescription::Element(element) => &element.children,
        RenderDescription::Fragment(fragment) => &fragment.children,
        _ => return,
    };
    let mut run = Vec::new();
    for child in children {
        match child {
            RenderDescription::Node(id) => run.push(*id),
            other => {
                if !run.is_empty() {
                    runs.push(std::mem::take(&mut run));
                }
                collect_runs(other, runs);
            }
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_document::{Document, NodeKind};

    #[test]
    fn test_builders() {
        let description = RenderDescription::element("a")
            .with_attr("href", "/x")
            .with_attr("href", "/y")
            .with_child(RenderDescription::text("link"));
        match description {
            RenderDescription::Element(element) => {
                assert_eq!(element.attributes, vec![("href".to_string(), "/y".to_string())]);
                assert_eq!(element.children.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_node_runs_split_on_other_children() {
        let mut doc = Document::new();
        let ids: Vec<NodeId> = (0..4).map(|_| doc.create(NodeKind::char('x'))).collect();
        let description = RenderDescription::fragment(vec![
            RenderDescription::node(ids[0]),
            RenderDescription::node(ids[1]),
            RenderDescription::element("hr"),
            RenderDescription::element("div").with_child(RenderDescription::node(ids[2])),
            RenderDescription::node(ids[3]),
        ]);
        assert_eq!(
            description.node_runs(),
            vec![vec![ids[0], ids[1]], vec![ids[2]], vec![ids[3]]]
        );
        assert_eq!(description.node_refs(), ids);
    }
}
