use thiserror::Error;

use crate::layout::NodeKind;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("No node with id {0:?}")]
    UnknownNode(String),
    #[error("Node {id:?} is a {found}, expected {expected}")]
    WrongKind {
        id: String,
        expected: &'static str,
        found: NodeKind,
    },
    #[error("Node {node:?} is not a child of {parent:?}")]
    NotAChild { parent: String, node: String },
    #[error("{path}: a {} cannot be placed {}", .child.tag(), placement(.parent))]
    KindMismatch {
        path: String,
        parent: Option<NodeKind>,
        child: NodeKind,
    },
    #[error("{path}: a {kind} must have children")]
    EmptyContainer { path: String, kind: NodeKind },
    #[error("{path}: {found} sizes given for {expected} children")]
    SizesLengthMismatch {
        path: String,
        expected: usize,
        found: usize,
    },
    #[error("{path}: invalid sizes {sizes:?}: {reason}")]
    InvalidSizes {
        path: String,
        sizes: Vec<f64>,
        reason: &'static str,
    },
    #[error("{path}: duplicate node id {id:?}")]
    DuplicateId { path: String, id: String },
    #[error("{path}: active pane {id:?} is not one of the panel's panes")]
    UnknownActivePane { path: String, id: String },
    #[error("Split boundary {boundary} out of range for {count} children")]
    InvalidBoundary { boundary: usize, count: usize },
    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

fn placement(parent: &Option<NodeKind>) -> String {
    match parent {
        Some(parent) => format!("inside a {}", parent.tag()),
        None => "at the document root".to_owned(),
    }
}

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;
