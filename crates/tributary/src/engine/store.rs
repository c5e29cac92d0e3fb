//! Node storage for a lineage view
//!
//! Holds every node the view knows about (supplied initially or returned by
//! a lazy load) in insertion order. A node is *visible* while it has a
//! placement; hidden nodes stay loaded so a later expansion can show them
//! without another fetch.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::core::{Direction, Field, FieldRef, Node, NodeId, Rect};

/// Where a visible node sits and which node it was placed against
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub rect: Rect,
    pub anchor: Option<NodeId>,
}

/// Node storage with visibility tracking
#[derive(Debug, Default)]
pub struct NodeStore {
    /// Nodes indexed by ID
    nodes: HashMap<NodeId, Node>,
    /// Node IDs in insertion order
    order: Vec<NodeId>,
    /// Placements of visible nodes
    visible: HashMap<NodeId, Placement>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or refresh the authored data of a known one
    ///
    /// New nodes receive the next insertion index. For known nodes the
    /// derived state (`level`, `page_offset`, `expanded`, `index`) is kept.
    /// Returns true if the node was new.
    pub fn insert(&mut self, mut node: Node) -> bool {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => {
                trace!(node_id = %node.id, "Refreshing node data");
                node.level = existing.level;
                node.page_offset = existing.page_offset;
                node.expanded = existing.expanded;
                node.index = existing.index;
                *existing = node;
                false
            }
            None => {
                node.index = self.order.len();
                trace!(node_id = %node.id, index = node.index, "Adding node to store");
                self.order.push(node.id.clone());
                self.nodes.insert(node.id.clone(), node);
                true
            }
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate over all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_visible(&self, id: &NodeId) -> bool {
        self.visible.contains_key(id)
    }

    pub fn placement(&self, id: &NodeId) -> Option<&Placement> {
        self.visible.get(id)
    }

    pub fn rect(&self, id: &NodeId) -> Option<Rect> {
        self.visible.get(id).map(|p| p.rect)
    }

    /// Show a node at the given placement
    pub fn place(&mut self, id: &NodeId, placement: Placement) {
        debug_assert!(self.nodes.contains_key(id), "placing unknown node {}", id);
        self.visible.insert(id.clone(), placement);
    }

    /// Update the rectangle of a visible node
    pub fn set_rect(&mut self, id: &NodeId, rect: Rect) {
        if let Some(placement) = self.visible.get_mut(id) {
            placement.rect = rect;
        }
    }

    /// Hide a node, returning its last placement
    pub fn hide(&mut self, id: &NodeId) -> Option<Placement> {
        self.visible.remove(id)
    }

    /// Visible nodes in insertion order
    pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| self.visible.contains_key(&n.id))
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Visible nodes on a level with their rectangles
    pub fn column(&self, level: i32) -> Vec<(NodeId, Rect)> {
        self.visible_nodes()
            .filter(|n| n.level == level)
            .filter_map(|n| self.rect(&n.id).map(|r| (n.id.clone(), r)))
            .collect()
    }

    pub fn field(&self, field: &FieldRef) -> Option<&Field> {
        self.nodes
            .get(&field.node_id)
            .and_then(|n| n.field(&field.field_id))
    }

    /// True if `from` points at `to` along the view direction
    ///
    /// Either side's declaration counts, so one-sided relation data still
    /// links the pair.
    pub fn links_toward(&self, from: &NodeId, to: &NodeId, direction: Direction) -> bool {
        let forward = self
            .nodes
            .get(from)
            .is_some_and(|n| n.relations(direction).contains(to));
        let backward = self
            .nodes
            .get(to)
            .is_some_and(|n| n.back_relations(direction).contains(from));
        forward || backward
    }

    /// Visible nodes pointing at `id` along the view direction
    pub fn visible_referrers(&self, id: &NodeId, direction: Direction) -> Vec<NodeId> {
        self.visible_nodes()
            .filter(|n| &n.id != id && self.links_toward(&n.id, id, direction))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Related ids of `id` along the view direction, sorted by insertion index
    ///
    /// Unknown ids are dropped.
    pub fn known_relations(&self, id: &NodeId, direction: Direction) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut related: Vec<&Node> = node
            .relations(direction)
            .iter()
            .filter_map(|r| self.nodes.get(r))
            .collect();
        related.sort_by_key(|n| n.index);
        related.into_iter().map(|n| n.id.clone()).collect()
    }

    /// Related ids of `id` that are not loaded yet
    pub fn missing_relations(&self, id: &NodeId, direction: Direction) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|n| {
                n.relations(direction)
                    .iter()
                    .filter(|r| !self.nodes.contains_key(*r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        debug!(node_count = self.nodes.len(), "Clearing node store");
        self.nodes.clear();
        self.order.clear();
        self.visible.clear();
    }
}
