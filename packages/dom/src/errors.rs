use crate::external::ExternalId;
use thiserror::Error;
use vellum_document::{NodeId, TreeError};

/// Invalid operation on the external tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown external node {0}")]
    UnknownNode(ExternalId),

    #[error("external node {0} is not an element")]
    NotAnElement(ExternalId),

    #[error("external node {0} is not a text node")]
    NotText(ExternalId),

    #[error("inserting {child} into {parent} would create a cycle")]
    Hierarchy {
        parent: ExternalId,
        child: ExternalId,
    },

    #[error("external node {child} is not a child of {parent}")]
    NotAChild {
        parent: ExternalId,
        child: ExternalId,
    },
}

pub type DomResult<T> = Result<T, DomError>;

/// A renderer could not describe a node
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("renderer '{renderer}' failed on node {node}: {message}")]
pub struct RenderError {
    pub renderer: String,
    pub node: NodeId,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum RedrawError {
    /// No valid mount point is left for a required insertion. Mutations
    /// applied before the failure are kept; recover with a full redraw from a
    /// stable ancestor.
    #[error("impossible to redraw subtree {node} at mount {mount}: {reason}")]
    Impossible {
        node: NodeId,
        mount: ExternalId,
        reason: String,
    },

    #[error("no renderer accepts node {0}")]
    NoRenderer(NodeId),

    #[error("node {0} is referenced more than once in one render")]
    DuplicateReference(NodeId),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type RedrawResult<T> = Result<T, RedrawError>;
