//! Core error types for lineage graph processing
//!
//! Missing references inside node data are never errors: the engine skips
//! them. These variants cover commands the host issues against ids the
//! engine does not know, invalid configuration, and malformed documents.

use thiserror::Error;

use super::{FieldId, NodeId};

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, LineageError>;

/// Core error types for lineage graph processing
#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Unknown node: {node_id}")]
    UnknownNode { node_id: NodeId },

    #[error("Node is not visible: {node_id}")]
    NodeNotVisible { node_id: NodeId },

    #[error("Unknown field {field_id} on node {node_id}")]
    UnknownField { node_id: NodeId, field_id: FieldId },

    #[error("Invalid page delta {delta}: expected -1 or +1")]
    InvalidPageDelta { delta: i32 },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid graph document: {message}")]
    InvalidDocument { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl LineageError {
    /// Create a new unknown node error
    pub fn unknown_node(node_id: &NodeId) -> Self {
        Self::UnknownNode {
            node_id: node_id.clone(),
        }
    }

    /// Create a new not-visible error
    pub fn not_visible(node_id: &NodeId) -> Self {
        Self::NodeNotVisible {
            node_id: node_id.clone(),
        }
    }

    /// Create a new unknown field error
    pub fn unknown_field(node_id: &NodeId, field_id: &FieldId) -> Self {
        Self::UnknownField {
            node_id: node_id.clone(),
            field_id: field_id.clone(),
        }
    }

    /// Create a new invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new invalid document error
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }
}

/// Rejection reported by the lazy-load collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Load failed: {message}")]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
