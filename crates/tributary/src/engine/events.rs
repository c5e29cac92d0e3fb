//! Mutation events emitted by engine commands
//!
//! Renderers that patch a scene incrementally drain these after each
//! command instead of diffing whole render models.

use serde::Serialize;

use super::edges::EdgeId;
use crate::core::{NodeId, Rect};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    NodeAdded { node_id: NodeId, rect: Rect },
    NodeRemoved { node_id: NodeId },
    NodeMoved { node_id: NodeId, rect: Rect },
    NodeResized { node_id: NodeId, rect: Rect },
    EdgeAdded { edge_id: EdgeId },
    EdgeUpdated { edge_id: EdgeId },
    EdgeRemoved { edge_id: EdgeId },
    /// Highlight or dim state changed on some edges
    EdgesRestyled { highlighted: usize },
}

impl GraphEvent {
    /// Node the event concerns, if any
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            GraphEvent::NodeAdded { node_id, .. }
            | GraphEvent::NodeRemoved { node_id }
            | GraphEvent::NodeMoved { node_id, .. }
            | GraphEvent::NodeResized { node_id, .. } => Some(node_id),
            _ => None,
        }
    }
}
