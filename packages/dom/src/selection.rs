//! Translation between document selections and external selections, through
//! the location map.

use crate::external::{ExternalDom, ExternalId, ExternalPoint, ExternalSelection};
use crate::reconciler::Reconciler;
use tracing::debug;
use vellum_document::{Document, NodeId, Point, RelativePosition, SelectionState};

impl Reconciler {
    /// Resolve an external selection to document points.
    ///
    /// A caret inside a tracked text node resolves at character granularity.
    /// Anything else falls back to the nearest mapped ancestor: inside it if
    /// it is a container, before it otherwise.
    pub fn parse_selection(
        &self,
        doc: &Document,
        dom: &ExternalDom,
        selection: &ExternalSelection,
    ) -> Option<SelectionState> {
        let anchor = self.parse_point(doc, dom, selection.anchor)?;
        let focus = self.parse_point(doc, dom, selection.focus)?;
        Some(SelectionState {
            anchor,
            focus,
            direction: selection.direction,
        })
    }

    fn parse_point(&self, doc: &Document, dom: &ExternalDom, point: ExternalPoint) -> Option<Point> {
        if dom.is_text(point.node) {
            let spans = self.locations().spans_in(point.node);
            let spans: Vec<_> = spans
                .into_iter()
                .filter(|(node, _)| is_live(doc, *node))
                .collect();
            if let Some((node, _)) = spans.iter().find(|(_, span)| point.offset < span.end) {
                return Some(Point::before(*node));
            }
            if let Some((node, _)) = spans.last() {
                return Some(Point::after(*node));
            }
        } else if let Ok(children) = dom.children(point.node) {
            if let Some(child) = children.get(point.offset) {
                if let Some(node) = self.first_node_in(doc, dom, *child) {
                    return Some(Point::before(node));
                }
            } else if let Some(child) = children.last() {
                if let Some(node) = self.last_node_in(doc, dom, *child) {
                    return Some(Point::after(node));
                }
            }
        }
        self.covering_point(doc, dom, point.node)
    }

    fn first_node_in(&self, doc: &Document, dom: &ExternalDom, ext: ExternalId) -> Option<NodeId> {
        if let Some((node, _)) = self
            .locations()
            .spans_in(ext)
            .into_iter()
            .find(|(node, _)| is_live(doc, *node))
        {
            return Some(node);
        }
        if let Some(node) = self.live_nodes(doc, ext).next() {
            return Some(node);
        }
        let children = dom.children(ext).ok()?;
        children.iter().find_map(|child| self.first_node_in(doc, dom, *child))
    }

    fn last_node_in(&self, doc: &Document, dom: &ExternalDom, ext: ExternalId) -> Option<NodeId> {
        if let Some((node, _)) = self
            .locations()
            .spans_in(ext)
            .into_iter()
            .rev()
            .find(|(node, _)| is_live(doc, *node))
        {
            return Some(node);
        }
        if let Some(node) = self.live_nodes(doc, ext).last() {
            return Some(node);
        }
        let children = dom.children(ext).ok()?;
        children.iter().rev().find_map(|child| self.last_node_in(doc, dom, *child))
    }

    fn live_nodes<'a>(&'a self, doc: &'a Document, ext: ExternalId) -> impl Iterator<Item = NodeId> + 'a {
        self.get_nodes(ext).iter().copied().filter(move |node| is_live(doc, *node))
    }

    fn covering_point(&self, doc: &Document, dom: &ExternalDom, ext: ExternalId) -> Option<Point> {
        let mut current = Some(ext);
        while let Some(ext) = current {
            // the innermost node wins when several share an external node
            let node = self
                .live_nodes(doc, ext)
                .filter_map(|id| doc.node(id))
                .reduce(|a, b| if a.is_before(b) { b } else { a });
            if let Some(node) = node {
                return Some(if node.is_container() {
                    Point::inside(node.id())
                } else {
                    Point::before(node.id())
                });
            }
            current = dom.parent(ext);
        }
        None
    }

    /// Show `selection` on the external tree.
    ///
    /// Returns `false` without touching the external selection when a point
    /// refers to a node that is no longer drawn.
    pub fn render_selection(&self, doc: &Document, dom: &mut ExternalDom, selection: &SelectionState) -> bool {
        let anchor = self.render_point(doc, dom, selection.anchor);
        let focus = self.render_point(doc, dom, selection.focus);
        match (anchor, focus) {
            (Some(anchor), Some(focus)) => {
                dom.set_selection(Some(ExternalSelection {
                    anchor,
                    focus,
                    direction: selection.direction,
                }));
                true
            }
            _ => {
                debug!(
                    anchor = %selection.anchor.node,
                    focus = %selection.focus.node,
                    "selection refers to nodes that are not drawn, skipped"
                );
                false
            }
        }
    }

    fn render_point(&self, doc: &Document, dom: &ExternalDom, point: Point) -> Option<ExternalPoint> {
        if !is_live(doc, point.node) {
            return None;
        }
        if let Some(span) = self.text_span(point.node) {
            if dom.is_connected(span.text) {
                let offset = match point.position {
                    RelativePosition::After => span.end,
                    RelativePosition::Before | RelativePosition::Inside => span.start,
                };
                return Some(ExternalPoint::new(span.text, offset));
            }
        }
        let externals: Vec<ExternalId> = self
            .get_external_nodes(point.node)
            .iter()
            .copied()
            .filter(|ext| dom.is_connected(*ext))
            .collect();
        match point.position {
            RelativePosition::Inside => {
                let ext = externals.iter().copied().find(|ext| dom.is_element(*ext))?;
                Some(ExternalPoint::new(ext, 0))
            }
            RelativePosition::Before => {
                let ext = *externals.first()?;
                Some(ExternalPoint::new(dom.parent(ext)?, dom.index_of(ext)?))
            }
            RelativePosition::After => {
                let ext = *externals.last()?;
                Some(ExternalPoint::new(dom.parent(ext)?, dom.index_of(ext)? + 1))
            }
        }
    }
}

fn is_live(doc: &Document, node: NodeId) -> bool {
    doc.node(node).map_or(false, |n| n.is_attached())
}
