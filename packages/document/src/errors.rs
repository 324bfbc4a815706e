//! Error types for the document tree

use crate::NodeId;
use thiserror::Error;

/// A reference node was expected among the children of a container but was
/// not found there. Always a caller bug.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("node {child} is not a child of {parent}")]
pub struct ChildError {
    pub parent: NodeId,
    pub child: NodeId,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error(transparent)]
    Child(#[from] ChildError),

    #[error("node {0} has no parent to insert next to")]
    Detached(NodeId),

    #[error("atomic node {0} cannot have children")]
    Atomic(NodeId),

    #[error("inserting {node} into {parent} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },

    #[error("the document root {0} cannot be moved or released")]
    Root(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("invalid outline: {0}")]
    Outline(String),
}

pub type TreeResult<T> = Result<T, TreeError>;
