//! Document-side selection.
//!
//! A selection is stored as two intangible marker nodes living in the tree.
//! Because markers are invisible to semantic navigation, placing them never
//! changes what a tangible node sees as its siblings, and moving them never
//! shows up in the change log.

use crate::errors::{TreeError, TreeResult};
use crate::node::{any, NodeId, NodeKind, NodeRef};
use crate::{Document, Walker};
use serde::{Deserialize, Serialize};

/// Where a point sits relative to its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelativePosition {
    Before,
    After,
    /// Inside an (empty or end-of) container
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub node: NodeId,
    pub position: RelativePosition,
}

impl Point {
    pub fn new(node: NodeId, position: RelativePosition) -> Self {
        Self { node, position }
    }

    pub fn before(node: NodeId) -> Self {
        Self::new(node, RelativePosition::Before)
    }

    pub fn after(node: NodeId) -> Self {
        Self::new(node, RelativePosition::After)
    }

    pub fn inside(node: NodeId) -> Self {
        Self::new(node, RelativePosition::Inside)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub anchor: Point,
    pub focus: Point,
    pub direction: Direction,
}

impl SelectionState {
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

impl Document {
    /// Move the selection markers to `anchor` and `focus`
    pub fn set_selection(&mut self, anchor: Point, focus: Point) -> TreeResult<()> {
        let (anchor_marker, focus_marker) = self.ensure_markers();
        self.place_marker(anchor_marker, anchor)?;
        self.place_marker(focus_marker, focus)
    }

    pub fn collapse(&mut self, point: Point) -> TreeResult<()> {
        self.set_selection(point, point)
    }

    pub fn clear_selection(&mut self) {
        if let Some((anchor, focus)) = self.markers {
            // markers are arena members, removal cannot fail
            let _ = self.remove(anchor);
            let _ = self.remove(focus);
        }
    }

    pub fn anchor_marker(&self) -> Option<NodeId> {
        self.markers.map(|(anchor, _)| anchor)
    }

    pub fn focus_marker(&self) -> Option<NodeId> {
        self.markers.map(|(_, focus)| focus)
    }

    /// Read the selection back from the marker positions. `None` when no
    /// selection is set or a marker was detached.
    pub fn selection(&self) -> Option<SelectionState> {
        let (anchor, focus) = self.markers?;
        let anchor = self.node(anchor)?;
        let focus = self.node(focus)?;
        if !anchor.is_attached() || !focus.is_attached() {
            return None;
        }
        let direction = if Walker::STRUCTURAL.is_before(focus, anchor) {
            Direction::Backward
        } else {
            Direction::Forward
        };
        Some(SelectionState {
            anchor: marker_point(anchor)?,
            focus: marker_point(focus)?,
            direction,
        })
    }

    fn ensure_markers(&mut self) -> (NodeId, NodeId) {
        if let Some(markers) = self.markers {
            return markers;
        }
        let markers = (self.create(NodeKind::Marker), self.create(NodeKind::Marker));
        self.markers = Some(markers);
        markers
    }

    fn place_marker(&mut self, marker: NodeId, point: Point) -> TreeResult<()> {
        let atomic = self.try_node(point.node)?.is_atomic();
        match point.position {
            RelativePosition::Before => self.before(point.node, &[marker]),
            RelativePosition::After => self.after(point.node, &[marker]),
            RelativePosition::Inside if atomic => Err(TreeError::Atomic(point.node)),
            RelativePosition::Inside => self.append(point.node, &[marker]),
        }
    }
}

fn marker_point(marker: NodeRef<'_>) -> Option<Point> {
    if let Some(next) = marker.next_sibling(any) {
        return Some(Point::before(next.id()));
    }
    if let Some(previous) = marker.previous_sibling(any) {
        return Some(Point::after(previous.id()));
    }
    marker.parent().map(|parent| Point::inside(parent.id()))
}
