//! Built-in renderers, one per node kind.
//!
//! They reference children through `RenderDescription::Node`, so only
//! tangible children are ever rendered and selection markers never reach the
//! external tree.

use crate::config::EngineConfig;
use crate::description::RenderDescription;
use crate::errors::RenderError;
use crate::renderer::{Renderer, RendererRegistry};
use crate::whitespace::visible_spaces;
use async_trait::async_trait;
use vellum_document::{any, Modifier, NodeKind, NodeRef};

pub(crate) fn register_defaults(registry: &mut RendererRegistry, config: &EngineConfig) {
    registry.register(RootRenderer);
    registry.register(ContainerRenderer);
    registry.register(TextRenderer {
        visible_whitespace: config.visible_whitespace,
    });
    registry.register(LineBreakRenderer);
    registry.register(AtomicRenderer);
    registry.register(MarkerRenderer);
}

fn child_refs(node: NodeRef<'_>) -> Vec<RenderDescription> {
    node.children(any)
        .into_iter()
        .map(|child| RenderDescription::node(child.id()))
        .collect()
}

pub struct RootRenderer;

#[async_trait(?Send)]
impl Renderer for RootRenderer {
    fn name(&self) -> &str {
        "root"
    }

    fn predicate(&self, node: NodeRef<'_>) -> bool {
        matches!(node.kind(), NodeKind::Root)
    }

    async fn render(&self, node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
        Ok(RenderDescription::fragment(child_refs(node)))
    }
}

pub struct ContainerRenderer;

#[async_trait(?Send)]
impl Renderer for ContainerRenderer {
    fn name(&self) -> &str {
        "container"
    }

    fn predicate(&self, node: NodeRef<'_>) -> bool {
        matches!(node.kind(), NodeKind::Container { .. })
    }

    async fn render(&self, node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
        Ok(RenderDescription::element(node.name())
            .with_attrs(node.modifiers().attribute_pairs())
            .with_children(child_refs(node)))
    }
}

/// Runs of characters with equal modifiers become one text node, wrapped in
/// one element per format.
pub struct TextRenderer {
    pub visible_whitespace: bool,
}

impl TextRenderer {
    fn describe(&self, nodes: &[NodeRef<'_>]) -> Result<RenderDescription, RenderError> {
        let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
            return Ok(RenderDescription::empty());
        };
        let mut content = String::new();
        for node in nodes {
            let value = node.char().ok_or_else(|| RenderError {
                renderer: self.name().to_string(),
                node: node.id(),
                message: format!("expected a character, found {}", node.name()),
            })?;
            content.push(value);
        }
        if self.visible_whitespace {
            let inline = |sibling: Option<NodeRef<'_>>| sibling.map_or(false, |s| s.kind().is_inline());
            let block_start = !inline(first.previous_sibling(any));
            let block_end = !inline(last.next_sibling(any));
            content = visible_spaces(&content, block_start, block_end);
        }

        let mut description = RenderDescription::text(content);
        for (offset, node) in nodes.iter().enumerate() {
            description = description.with_span(node.id(), offset, offset + 1);
        }

        let modifiers = first.modifiers();
        let own = modifiers.attribute_pairs();
        if !own.is_empty() {
            description = RenderDescription::element("span")
                .with_attrs(own)
                .with_child(description);
        }
        let formats: Vec<_> = modifiers.formats().collect();
        for format in formats.into_iter().rev() {
            if let Modifier::Format { name, attributes } = format {
                description = RenderDescription::element(name.as_str())
                    .with_attrs(attributes.to_pairs())
                    .with_child(description);
            }
        }
        Ok(description)
    }
}

#[async_trait(?Send)]
impl Renderer for TextRenderer {
    fn name(&self) -> &str {
        "text"
    }

    fn predicate(&self, node: NodeRef<'_>) -> bool {
        node.is_char()
    }

    fn batches_with(&self, previous: NodeRef<'_>, next: NodeRef<'_>) -> bool {
        previous.is_char() && next.is_char() && previous.modifiers() == next.modifiers()
    }

    async fn render(&self, node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
        self.describe(&[node])
    }

    async fn render_batch(&self, nodes: &[NodeRef<'_>]) -> Result<RenderDescription, RenderError> {
        self.describe(nodes)
    }
}

pub struct LineBreakRenderer;

#[async_trait(?Send)]
impl Renderer for LineBreakRenderer {
    fn name(&self) -> &str {
        "lineBreak"
    }

    fn predicate(&self, node: NodeRef<'_>) -> bool {
        matches!(node.kind(), NodeKind::LineBreak)
    }

    async fn render(&self, _node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
        Ok(RenderDescription::element("br"))
    }
}

pub struct AtomicRenderer;

#[async_trait(?Send)]
impl Renderer for AtomicRenderer {
    fn name(&self) -> &str {
        "atomic"
    }

    fn predicate(&self, node: NodeRef<'_>) -> bool {
        matches!(node.kind(), NodeKind::Atomic { .. })
    }

    async fn render(&self, node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
        Ok(RenderDescription::element(node.name()).with_attrs(node.modifiers().attribute_pairs()))
    }
}

/// Markers have no external representation
pub struct MarkerRenderer;

#[async_trait(?Send)]
impl Renderer for MarkerRenderer {
    fn name(&self) -> &str {
        "marker"
    }

    fn predicate(&self, node: NodeRef<'_>) -> bool {
        matches!(node.kind(), NodeKind::Marker)
    }

    async fn render(&self, _node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
        Ok(RenderDescription::empty())
    }
}
