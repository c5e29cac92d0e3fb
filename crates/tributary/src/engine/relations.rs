//! Field-level relation wiring
//!
//! Turns the field references of visible nodes into edges between ports.
//! Each end of a relation is attached to the port matching the field's
//! current slot: its own row port when the row is on screen, otherwise the
//! Header or Overflow aggregate of its node. Relations whose other end is
//! hidden, unknown, or names a missing field are skipped.

use std::collections::{BTreeSet, HashSet};
use tracing::{debug, span, trace, Level};

use super::edges::{EdgeId, EdgeRegistry, FieldLink};
use super::layout::{FieldSlot, LayoutEngine};
use super::ports::{PortId, PortRegistry};
use super::store::NodeStore;
use crate::core::{FieldRef, NodeId, PortSite, Side};

/// Edge changes produced by one refresh
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RefreshReport {
    pub added: Vec<EdgeId>,
    pub updated: Vec<EdgeId>,
    pub removed: Vec<EdgeId>,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Resolves relations of visible nodes against the current layout state
pub struct RelationResolver<'a> {
    store: &'a NodeStore,
    layout: &'a LayoutEngine,
}

impl<'a> RelationResolver<'a> {
    pub fn new(store: &'a NodeStore, layout: &'a LayoutEngine) -> Self {
        Self { store, layout }
    }

    /// True if the field exists on a visible node
    fn is_wirable(&self, field: &FieldRef) -> bool {
        self.store.is_visible(&field.node_id) && self.store.field(field).is_some()
    }

    /// Every relation touching `node_id` whose both ends are wirable
    ///
    /// Declarations on either end are honored, so a reference listed only
    /// in the other node's `childFields` still produces the link.
    pub fn field_links(&self, node_id: &NodeId) -> BTreeSet<FieldLink> {
        let mut links = BTreeSet::new();
        let Some(node) = self.store.get(node_id) else {
            return links;
        };
        if !self.store.is_visible(node_id) {
            return links;
        }

        let mut candidates: Vec<FieldLink> = Vec::new();
        for field in &node.fields {
            let here = FieldRef::new(node.id.clone(), field.id.clone());
            for parent in &field.parent_fields {
                candidates.push(FieldLink::new(parent.clone(), here.clone()));
            }
            for child in &field.child_fields {
                candidates.push(FieldLink::new(here.clone(), child.clone()));
            }
        }
        for other in self.store.visible_nodes().filter(|n| &n.id != node_id) {
            for field in &other.fields {
                let there = FieldRef::new(other.id.clone(), field.id.clone());
                for parent in field.parent_fields.iter().filter(|p| &p.node_id == node_id) {
                    candidates.push(FieldLink::new(parent.clone(), there.clone()));
                }
                for child in field.child_fields.iter().filter(|c| &c.node_id == node_id) {
                    candidates.push(FieldLink::new(there.clone(), child.clone()));
                }
            }
        }

        for link in candidates {
            if self.is_wirable(&link.source) && self.is_wirable(&link.target) {
                links.insert(link);
            } else {
                trace!(source = %link.source, target = %link.target, "Skipping relation with a hidden or missing end");
            }
        }
        links
    }

    /// Port a field should attach to on one side, created or rebound as
    /// needed and placed at its current offset
    pub fn resolve_port(&self, ports: &mut PortRegistry, field: &FieldRef, side: Side) -> Option<PortId> {
        let node = self.store.get(&field.node_id)?;
        let index = node.field_index(&field.field_id)?;
        let slot = FieldSlot::locate(node, index, self.layout.config().page_size);
        let port = match slot.site {
            PortSite::Paginated => ports.create_field_port(field, side),
            site => {
                let port = ports.get_or_create_aggregate_port(&field.node_id, side, site);
                ports.bind_field(port, &field.field_id);
                port
            }
        };
        ports.place(port, self.layout.port_offset(node, slot));
        Some(port)
    }

    /// Bring the edges around one node in line with its current state
    pub fn refresh(
        &self,
        node_id: &NodeId,
        ports: &mut PortRegistry,
        edges: &mut EdgeRegistry,
    ) -> RefreshReport {
        let refresh_span = span!(Level::TRACE, "refresh_relations", node_id = %node_id);
        let _enter = refresh_span.enter();

        let mut report = RefreshReport::default();
        let desired = self.field_links(node_id);
        let mut touched: HashSet<NodeId> = HashSet::new();
        touched.insert(node_id.clone());

        for link in &desired {
            let (Some(source), Some(target)) = (
                self.resolve_port(ports, &link.source, Side::Right),
                self.resolve_port(ports, &link.target, Side::Left),
            ) else {
                continue;
            };
            touched.insert(link.source.node_id.clone());
            touched.insert(link.target.node_id.clone());
            match edges.find(link) {
                Some(id) => {
                    if edges.retarget(id, source, target) {
                        report.updated.push(id);
                    }
                }
                None => report.added.push(edges.add_edge(ports, source, target, link.clone())),
            }
        }

        for id in edges.edges_for_node(node_id) {
            let Some(edge) = edges.get(id) else { continue };
            if desired.contains(&edge.link) {
                continue;
            }
            touched.insert(edge.link.source.node_id.clone());
            touched.insert(edge.link.target.node_id.clone());
            edges.remove_edge(id);
            report.removed.push(id);
        }

        for id in &touched {
            sweep_ports(id, ports, edges);
        }

        if !report.is_empty() {
            debug!(
                added = report.added.len(),
                updated = report.updated.len(),
                removed = report.removed.len(),
                "Refreshed relations"
            );
        }
        report
    }
}

/// Drop port bindings no edge uses and release ports without edges
pub fn sweep_ports(node_id: &NodeId, ports: &mut PortRegistry, edges: &EdgeRegistry) {
    for port_id in ports.ports_of(node_id) {
        if !edges.is_port_referenced(port_id) {
            edges.release_unreferenced_port(port_id, ports);
            continue;
        }
        let stale: Vec<_> = ports
            .get(port_id)
            .map(|p| {
                p.fields
                    .iter()
                    .filter(|f| !edges.binds_field(port_id, f))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for field_id in stale {
            ports.unbind_field(port_id, &field_id);
        }
    }
}
