//! Connector bookkeeping
//!
//! Every rendered connector links one upstream field to one downstream
//! field through a pair of ports. Edges are keyed by their field link, so a
//! relation survives port changes (paging, collapsing) as a retarget rather
//! than a delete and re-add.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{trace, warn};

use super::ports::{PortId, PortRegistry};
use crate::core::{FieldId, FieldRef, NodeId};

/// Identifier of an edge, unique within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge-{}", self.0)
    }
}

/// Field-level relation carried by an edge: upstream source, downstream target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldLink {
    pub source: FieldRef,
    pub target: FieldRef,
}

impl FieldLink {
    pub fn new(source: FieldRef, target: FieldRef) -> Self {
        Self { source, target }
    }

    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source.node_id == node_id || &self.target.node_id == node_id
    }
}

/// A rendered connector
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub link: FieldLink,
    pub source_port: PortId,
    pub target_port: PortId,
    pub highlighted: bool,
    pub dimmed: bool,
}

impl Edge {
    pub fn source_node_id(&self) -> &NodeId {
        &self.link.source.node_id
    }

    pub fn source_field_id(&self) -> &FieldId {
        &self.link.source.field_id
    }

    pub fn target_node_id(&self) -> &NodeId {
        &self.link.target.node_id
    }

    pub fn target_field_id(&self) -> &FieldId {
        &self.link.target.field_id
    }

    /// Returns true if either end is attached to the port
    pub fn uses_port(&self, port_id: PortId) -> bool {
        self.source_port == port_id || self.target_port == port_id
    }

    /// Field bound through the given port by this edge
    fn field_at(&self, port_id: PortId) -> Option<&FieldId> {
        if self.source_port == port_id {
            Some(&self.link.source.field_id)
        } else if self.target_port == port_id {
            Some(&self.link.target.field_id)
        } else {
            None
        }
    }
}

/// Registry of every connector in a view
#[derive(Debug, Default)]
pub struct EdgeRegistry {
    edges: BTreeMap<EdgeId, Edge>,
    by_link: HashMap<FieldLink, EdgeId>,
    by_port: HashMap<PortId, BTreeSet<EdgeId>>,
    next_id: u64,
}

impl EdgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_port(&mut self, port_id: PortId, edge_id: EdgeId) {
        self.by_port.entry(port_id).or_default().insert(edge_id);
    }

    fn unindex_port(&mut self, port_id: PortId, edge_id: EdgeId) {
        if let Some(set) = self.by_port.get_mut(&port_id) {
            set.remove(&edge_id);
            if set.is_empty() {
                self.by_port.remove(&port_id);
            }
        }
    }

    /// Register a connector between two ports
    ///
    /// If the link already has an edge, that edge is retargeted onto the
    /// given ports and its id returned.
    pub fn add_edge(
        &mut self,
        ports: &PortRegistry,
        source_port: PortId,
        target_port: PortId,
        link: FieldLink,
    ) -> EdgeId {
        debug_assert!(ports.contains(source_port), "edge source {} not registered", source_port);
        debug_assert!(ports.contains(target_port), "edge target {} not registered", target_port);
        if let Some(&existing) = self.by_link.get(&link) {
            self.retarget(existing, source_port, target_port);
            return existing;
        }
        let id = EdgeId(self.next_id);
        self.next_id += 1;
        trace!(edge_id = %id, source = %link.source, target = %link.target, "Adding edge");
        self.index_port(source_port, id);
        self.index_port(target_port, id);
        self.by_link.insert(link.clone(), id);
        self.edges.insert(
            id,
            Edge {
                id,
                link,
                source_port,
                target_port,
                highlighted: false,
                dimmed: false,
            },
        );
        id
    }

    /// Move an edge onto new ports; returns true if anything changed
    pub fn retarget(&mut self, edge_id: EdgeId, source_port: PortId, target_port: PortId) -> bool {
        let Some(edge) = self.edges.get(&edge_id) else {
            return false;
        };
        let (old_source, old_target) = (edge.source_port, edge.target_port);
        if old_source == source_port && old_target == target_port {
            return false;
        }
        trace!(edge_id = %edge_id, %old_source, %source_port, %old_target, %target_port, "Retargeting edge");
        self.unindex_port(old_source, edge_id);
        self.unindex_port(old_target, edge_id);
        self.index_port(source_port, edge_id);
        self.index_port(target_port, edge_id);
        if let Some(edge) = self.edges.get_mut(&edge_id) {
            edge.source_port = source_port;
            edge.target_port = target_port;
        }
        true
    }

    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&edge_id)?;
        trace!(edge_id = %edge_id, "Removing edge");
        self.unindex_port(edge.source_port, edge_id);
        self.unindex_port(edge.target_port, edge_id);
        self.by_link.remove(&edge.link);
        Some(edge)
    }

    /// Remove every edge attached to a port
    ///
    /// Afterwards each touched port that no edge references any more is
    /// released, and fields no remaining edge binds through a port are
    /// unbound from it.
    pub fn remove_edges_for_port(
        &mut self,
        port_id: PortId,
        ports: &mut PortRegistry,
    ) -> Vec<EdgeId> {
        let ids: Vec<EdgeId> = self
            .by_port
            .get(&port_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        let mut touched: Vec<(PortId, FieldId)> = Vec::new();
        for id in &ids {
            if let Some(edge) = self.remove_edge(*id) {
                touched.push((edge.source_port, edge.link.source.field_id.clone()));
                touched.push((edge.target_port, edge.link.target.field_id.clone()));
            }
        }
        for (port, field) in touched {
            if !self.is_port_referenced(port) {
                ports.release_port(port);
            } else if !self.binds_field(port, &field) {
                ports.unbind_field(port, &field);
            }
        }
        if !self.is_port_referenced(port_id) {
            ports.release_port(port_id);
        }
        ids
    }

    /// Release a port only if no edge references it
    ///
    /// Releasing a referenced port would leave dangling edges; that is a
    /// registry desync and trips a debug assertion. Release builds refuse
    /// and log instead.
    pub fn release_unreferenced_port(&self, port_id: PortId, ports: &mut PortRegistry) -> bool {
        if self.is_port_referenced(port_id) {
            warn!(port_id = %port_id, "Refusing to release a port that still has edges");
            debug_assert!(false, "released {} while edges still reference it", port_id);
            return false;
        }
        ports.release_port(port_id).is_some()
    }

    pub fn is_port_referenced(&self, port_id: PortId) -> bool {
        self.by_port.get(&port_id).is_some_and(|set| !set.is_empty())
    }

    /// True if some edge binds `field_id` through `port_id`
    pub fn binds_field(&self, port_id: PortId, field_id: &FieldId) -> bool {
        self.by_port.get(&port_id).is_some_and(|set| {
            set.iter()
                .filter_map(|id| self.edges.get(id))
                .any(|e| e.field_at(port_id) == Some(field_id))
        })
    }

    pub fn find(&self, link: &FieldLink) -> Option<EdgeId> {
        self.by_link.get(link).copied()
    }

    pub fn get(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Edges with either end on the node
    pub fn edges_for_node(&self, node_id: &NodeId) -> Vec<EdgeId> {
        self.edges
            .values()
            .filter(|e| e.link.touches(node_id))
            .map(|e| e.id)
            .collect()
    }

    pub fn edges_for_port(&self, port_id: PortId) -> Vec<EdgeId> {
        self.by_port
            .get(&port_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Highlight edges whose both fields lie in `fields`, dim all others
    ///
    /// Returns the number of highlighted edges.
    pub fn set_highlighted(&mut self, fields: &HashSet<FieldRef>) -> usize {
        let mut count = 0;
        for edge in self.edges.values_mut() {
            let on_path = fields.contains(&edge.link.source) && fields.contains(&edge.link.target);
            edge.highlighted = on_path;
            edge.dimmed = !on_path;
            if on_path {
                count += 1;
            }
        }
        count
    }

    /// Reset every edge to its normal style
    pub fn clear_highlight(&mut self) {
        for edge in self.edges.values_mut() {
            edge.highlighted = false;
            edge.dimmed = false;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.by_link.clear();
        self.by_port.clear();
    }
}
