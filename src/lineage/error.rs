//! Error types for lineage resolution and rendering

use crate::lineage::models::DisplayRow;

/// Structural failures that stop graph construction or traversal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineageError {
    #[error("Object has no metadata.uid: {0}")]
    MissingUid(String),

    #[error("Root object not found in node map: {0}")]
    RootNotFound(String),

    #[error("Node {parent} lists dependent {dependent} which is not in the node map")]
    DanglingDependent { parent: String, dependent: String },

    #[error("Lineage depth limit of {limit} exceeded below {uid}")]
    DepthExceeded { uid: String, limit: usize },
}

/// Field-path expression parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Unterminated bracket at offset {0}")]
    UnterminatedBracket(usize),

    #[error("Empty field name at offset {0}")]
    EmptyField(usize),

    #[error("Invalid index '{0}'")]
    InvalidIndex(String),

    #[error("Invalid filter expression '{0}'")]
    InvalidFilter(String),

    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
}

/// A render that failed part way through
///
/// Carries every row emitted before the failure so callers can still print
/// the partial lineage.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct PartialRender {
    pub rows: Vec<DisplayRow>,
    #[source]
    pub error: LineageError,
}
