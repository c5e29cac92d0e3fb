//! Cache of nodes hidden by a collapse
//!
//! Re-expanding a node restores its former descendants (or ancestors) at
//! the rectangle they occupied, with the expansion state and page they had,
//! instead of laying them out afresh.

use std::collections::HashMap;
use tracing::trace;

use crate::core::{Node, NodeId, Rect};

/// Snapshot of a node at the moment it was hidden
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    pub rect: Rect,
    pub level: i32,
    pub anchor: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct RemovedNodeCache {
    entries: HashMap<NodeId, RemovedNode>,
}

impl RemovedNodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a snapshot, replacing any older one for the same node
    pub fn remember(&mut self, removed: RemovedNode) {
        trace!(node_id = %removed.node.id, y = removed.rect.y, "Caching removed node");
        self.entries.insert(removed.node.id.clone(), removed);
    }

    pub fn get(&self, id: &NodeId) -> Option<&RemovedNode> {
        self.entries.get(id)
    }

    /// Take a snapshot out of the cache for restoration
    pub fn take(&mut self, id: &NodeId) -> Option<RemovedNode> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn forget(&mut self, id: &NodeId) {
        self.entries.remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
