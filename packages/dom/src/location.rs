//! # Location Map
//!
//! Bidirectional index between document nodes and the external nodes that
//! represent them. Both directions are updated in the same call, so a query
//! from either side always agrees with the other.
//!
//! Many-to-one is common (a run of characters shares one text node, every
//! member of a batched render maps to the same external nodes); one-to-many
//! happens for fragments. Text spans refine a node's entry with the character
//! range it occupies inside a shared text node.

use crate::external::ExternalId;
use std::collections::HashMap;
use vellum_document::NodeId;

/// Where a document node sits inside an external text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanLocation {
    pub text: ExternalId,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Default)]
pub struct LocationMap {
    to_external: HashMap<NodeId, Vec<ExternalId>>,
    to_nodes: HashMap<ExternalId, Vec<NodeId>>,
    spans: HashMap<NodeId, SpanLocation>,
}

impl LocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn external_nodes(&self, node: NodeId) -> &[ExternalId] {
        self.to_external.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn nodes(&self, ext: ExternalId) -> &[NodeId] {
        self.to_nodes.get(&ext).map_or(&[], Vec::as_slice)
    }

    pub fn span(&self, node: NodeId) -> Option<SpanLocation> {
        self.spans.get(&node).copied()
    }

    /// Nodes spanning characters of `text`, ordered by offset
    pub fn spans_in(&self, text: ExternalId) -> Vec<(NodeId, SpanLocation)> {
        let mut spans: Vec<_> = self
            .nodes(text)
            .iter()
            .filter_map(|node| {
                self.span(*node)
                    .filter(|span| span.text == text)
                    .map(|span| (*node, span))
            })
            .collect();
        spans.sort_by_key(|(_, span)| span.start);
        spans
    }

    pub fn add(&mut self, node: NodeId, ext: ExternalId) {
        let externals = self.to_external.entry(node).or_default();
        if !externals.contains(&ext) {
            externals.push(ext);
        }
        let nodes = self.to_nodes.entry(ext).or_default();
        if !nodes.contains(&node) {
            nodes.push(node);
        }
    }

    /// Replace every entry of `node` with `externals`
    pub fn set(&mut self, node: NodeId, externals: &[ExternalId]) {
        self.forget_node(node);
        for ext in externals {
            self.add(node, *ext);
        }
    }

    pub fn set_span(&mut self, node: NodeId, text: ExternalId, start: usize, end: usize) {
        self.set(node, &[text]);
        self.spans.insert(node, SpanLocation { text, start, end });
    }

    pub fn forget_node(&mut self, node: NodeId) {
        self.spans.remove(&node);
        for ext in self.to_external.remove(&node).unwrap_or_default() {
            if let Some(nodes) = self.to_nodes.get_mut(&ext) {
                nodes.retain(|n| *n != node);
                if nodes.is_empty() {
                    self.to_nodes.remove(&ext);
                }
            }
        }
    }

    pub fn forget_external(&mut self, ext: ExternalId) {
        for node in self.to_nodes.remove(&ext).unwrap_or_default() {
            if let Some(externals) = self.to_external.get_mut(&node) {
                externals.retain(|e| *e != ext);
                if externals.is_empty() {
                    self.to_external.remove(&node);
                }
            }
            if self.spans.get(&node).map_or(false, |span| span.text == ext) {
                self.spans.remove(&node);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.to_external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_external.is_empty()
    }

    /// Both directions agree
    pub fn is_consistent(&self) -> bool {
        self.to_external.iter().all(|(node, externals)| {
            externals
                .iter()
                .all(|ext| self.nodes(*ext).contains(node))
        }) && self.to_nodes.iter().all(|(ext, nodes)| {
            nodes
                .iter()
                .all(|node| self.external_nodes(*node).contains(ext))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_document::{Document, NodeKind};

    #[test]
    fn test_updates_both_directions() {
        let mut doc = Document::new();
        let chars = doc.create_text("ab");
        let mut dom = crate::ExternalDom::new();
        let text = dom.create_text("ab");
        let other = dom.create_text("x");

        let mut map = LocationMap::new();
        map.set_span(chars[0], text, 0, 1);
        map.set_span(chars[1], text, 1, 2);
        assert_eq!(map.nodes(text), &[chars[0], chars[1]]);
        assert_eq!(map.spans_in(text).len(), 2);

        map.set(chars[1], &[other]);
        assert_eq!(map.nodes(text), &[chars[0]]);
        assert!(map.span(chars[1]).is_none());
        assert!(map.is_consistent());

        map.forget_external(text);
        assert!(map.external_nodes(chars[0]).is_empty());
        assert!(map.span(chars[0]).is_none());
        assert!(map.is_consistent());

        let p = doc.create(NodeKind::container("p"));
        assert!(map.external_nodes(p).is_empty());
    }
}
