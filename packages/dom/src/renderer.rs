//! Pluggable per-node renderers.
//!
//! Dispatch is single-match: the registry is searched from the most recently
//! registered renderer backwards, and the first whose predicate accepts the
//! node wins. Defaults are registered first, so any plugin overrides them.

use crate::config::EngineConfig;
use crate::description::RenderDescription;
use crate::errors::{RedrawError, RenderError};
use crate::renderers;
use async_trait::async_trait;
use std::rc::Rc;
use tracing::trace;
use vellum_document::{Document, NodeId, NodeRef};

/// Describes how nodes of some type are rendered.
///
/// Rendering may be asynchronous (a renderer can wait for foreign content to
/// load); the engine awaits every render before it touches the external tree.
#[async_trait(?Send)]
pub trait Renderer {
    fn name(&self) -> &str;

    fn predicate(&self, node: NodeRef<'_>) -> bool;

    async fn render(&self, node: NodeRef<'_>) -> Result<RenderDescription, RenderError>;

    /// Whether `next`, the sibling right after `previous`, joins the same
    /// render call
    fn batches_with(&self, _previous: NodeRef<'_>, _next: NodeRef<'_>) -> bool {
        false
    }

    /// Render a batch of consecutive siblings at once
    async fn render_batch(&self, nodes: &[NodeRef<'_>]) -> Result<RenderDescription, RenderError> {
        let mut children = Vec::with_capacity(nodes.len());
        for node in nodes {
            children.push(self.render(*node).await?);
        }
        Ok(RenderDescription::fragment(children))
    }
}

#[derive(Default)]
pub struct RendererRegistry {
    renderers: Vec<Rc<dyn Renderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in renderers for every node kind
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        renderers::register_defaults(&mut registry, config);
        registry
    }

    pub fn register(&mut self, renderer: impl Renderer + 'static) {
        self.renderers.push(Rc::new(renderer));
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    fn position(&self, node: NodeRef<'_>) -> Option<usize> {
        self.renderers.iter().rposition(|r| r.predicate(node))
    }

    pub fn find(&self, node: NodeRef<'_>) -> Option<Rc<dyn Renderer>> {
        self.position(node).map(|index| self.renderers[index].clone())
    }

    /// Split consecutive siblings into render calls
    pub fn group(&self, doc: &Document, ids: &[NodeId]) -> Result<Vec<Vec<NodeId>>, RedrawError> {
        let mut groups: Vec<Vec<NodeId>> = Vec::new();
        let mut previous: Option<(usize, NodeRef<'_>)> = None;
        for &id in ids {
            let node = doc.try_node(id)?;
            let index = self.position(node).ok_or(RedrawError::NoRenderer(id))?;
            let joins = match previous {
                Some((previous_index, previous_node)) => {
                    previous_index == index && self.renderers[index].batches_with(previous_node, node)
                }
                None => false,
            };
            match groups.last_mut() {
                Some(group) if joins => group.push(id),
                _ => groups.push(vec![id]),
            }
            previous = Some((index, node));
        }
        Ok(groups)
    }

    /// Render one group produced by [`RendererRegistry::group`]
    pub async fn render_group(&self, doc: &Document, ids: &[NodeId]) -> Result<RenderDescription, RedrawError> {
        let nodes = ids
            .iter()
            .map(|id| doc.try_node(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let Some(first) = nodes.first().copied() else {
            return Ok(RenderDescription::empty());
        };
        let renderer = self.find(first).ok_or(RedrawError::NoRenderer(first.id()))?;
        trace!(renderer = renderer.name(), node = %first.id(), batch = nodes.len(), "rendering");
        let description = if nodes.len() == 1 {
            renderer.render(first).await?
        } else {
            renderer.render_batch(&nodes).await?
        };
        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_document::{any, NodeKind, Outline};

    struct Heading;

    #[async_trait(?Send)]
    impl Renderer for Heading {
        fn name(&self) -> &str {
            "heading"
        }

        fn predicate(&self, node: NodeRef<'_>) -> bool {
            node.name() == "h1"
        }

        async fn render(&self, _node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
            Ok(RenderDescription::element("header"))
        }
    }

    #[tokio::test]
    async fn test_later_registration_wins() {
        let doc = Document::from_outline(&[Outline::container("h1", vec![])]).unwrap();
        let h1 = doc.root().first_child(any).unwrap();

        let mut registry = RendererRegistry::with_defaults(&EngineConfig::default());
        assert_eq!(registry.find(h1).unwrap().name(), "container");

        registry.register(Heading);
        assert_eq!(registry.find(h1).unwrap().name(), "heading");
        let description = registry.render_group(&doc, &[h1.id()]).await.unwrap();
        assert_eq!(description, RenderDescription::element("header"));
    }

    #[test]
    fn test_grouping_batches_equal_characters() {
        let doc = Document::from_outline(&[Outline::container(
            "p",
            vec![
                Outline::text("ab"),
                Outline::formatted("c", &["b"]),
                Outline::Keyword(vellum_document::Keyword::LineBreak),
                Outline::text("d"),
            ],
        )])
        .unwrap();
        let p = doc.root().first_child(any).unwrap();
        let ids: Vec<_> = p.children(any).iter().map(|n| n.id()).collect();

        let registry = RendererRegistry::with_defaults(&EngineConfig::default());
        let groups = registry.group(&doc, &ids).unwrap();
        assert_eq!(
            groups,
            vec![vec![ids[0], ids[1]], vec![ids[2]], vec![ids[3]], vec![ids[4]]]
        );
    }

    #[test]
    fn test_missing_renderer() {
        let mut doc = Document::new();
        let node = doc.create(NodeKind::char('x'));
        let registry = RendererRegistry::new();
        assert!(matches!(
            registry.group(&doc, &[node]),
            Err(RedrawError::NoRenderer(id)) if id == node
        ));
    }
}
