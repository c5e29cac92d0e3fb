//! Port bookkeeping
//!
//! A port is an anchor on the left or right side of a node. Paginated ports
//! belong to a single visible field row; Header and Overflow ports aggregate
//! every field that is currently hidden above or below the visible page.
//!
//! For a given `(node, side, field)` at most one port owns the field. Binding
//! a field to a new port moves ownership away from the previous one.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::trace;

use crate::core::{FieldId, FieldRef, NodeId, PortSite, Side};

/// Identifier of a port, unique within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PortId(pub u64);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port-{}", self.0)
    }
}

/// An anchor point on one side of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    pub node_id: NodeId,
    pub side: Side,
    pub site: PortSite,
    /// Distance from the node's top edge
    pub offset_y: f64,
    /// Fields this port currently stands for
    pub fields: BTreeSet<FieldId>,
}

type OwnerKey = (NodeId, Side, FieldId);
type AggregateKey = (NodeId, Side, PortSite);

/// Registry of every port in a view
#[derive(Debug, Default)]
pub struct PortRegistry {
    ports: BTreeMap<PortId, Port>,
    owners: HashMap<OwnerKey, PortId>,
    aggregates: HashMap<AggregateKey, PortId>,
    next_id: u64,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, node_id: &NodeId, side: Side, site: PortSite) -> PortId {
        let id = PortId(self.next_id);
        self.next_id += 1;
        trace!(port_id = %id, node_id = %node_id, ?side, ?site, "Creating port");
        self.ports.insert(
            id,
            Port {
                id,
                node_id: node_id.clone(),
                side,
                site,
                offset_y: 0.0,
                fields: BTreeSet::new(),
            },
        );
        id
    }

    /// Port currently owning a field on one side
    pub fn get_port(&self, field: &FieldRef, side: Side) -> Option<PortId> {
        self.owners
            .get(&(field.node_id.clone(), side, field.field_id.clone()))
            .copied()
    }

    /// Existing Header/Overflow port of a node side, created on demand
    pub fn get_or_create_aggregate_port(
        &mut self,
        node_id: &NodeId,
        side: Side,
        site: PortSite,
    ) -> PortId {
        debug_assert!(site.is_aggregate(), "aggregate port requested for {:?}", site);
        let key = (node_id.clone(), side, site);
        if let Some(&id) = self.aggregates.get(&key) {
            return id;
        }
        let id = self.allocate(node_id, side, site);
        self.aggregates.insert(key, id);
        id
    }

    /// Paginated port for one field, reusing the current one if it is already
    /// a row port
    pub fn create_field_port(&mut self, field: &FieldRef, side: Side) -> PortId {
        if let Some(id) = self.get_port(field, side) {
            if self.ports.get(&id).is_some_and(|p| p.site == PortSite::Paginated) {
                return id;
            }
        }
        let id = self.allocate(&field.node_id, side, PortSite::Paginated);
        self.bind_field(id, &field.field_id);
        id
    }

    /// Record that a port also represents a field
    ///
    /// Idempotent. Ownership of the field on this node side moves to `port_id`.
    pub fn bind_field(&mut self, port_id: PortId, field_id: &FieldId) {
        let Some(port) = self.ports.get(&port_id) else {
            debug_assert!(false, "binding field to unknown {}", port_id);
            return;
        };
        let key = (port.node_id.clone(), port.side, field_id.clone());
        if let Some(previous) = self.owners.insert(key, port_id) {
            if previous != port_id {
                trace!(field_id = %field_id, from = %previous, to = %port_id, "Moving field ownership");
                if let Some(old) = self.ports.get_mut(&previous) {
                    old.fields.remove(field_id);
                }
            }
        }
        if let Some(port) = self.ports.get_mut(&port_id) {
            port.fields.insert(field_id.clone());
        }
    }

    /// Drop a field from a port if the port owns it
    pub fn unbind_field(&mut self, port_id: PortId, field_id: &FieldId) {
        let Some(port) = self.ports.get_mut(&port_id) else {
            return;
        };
        port.fields.remove(field_id);
        let key = (port.node_id.clone(), port.side, field_id.clone());
        if self.owners.get(&key) == Some(&port_id) {
            self.owners.remove(&key);
        }
    }

    /// Set a port's distance from its node's top edge
    pub fn place(&mut self, port_id: PortId, offset_y: f64) {
        if let Some(port) = self.ports.get_mut(&port_id) {
            port.offset_y = offset_y;
        }
    }

    /// Remove a port and all its field bindings
    pub fn release_port(&mut self, port_id: PortId) -> Option<Port> {
        let port = self.ports.remove(&port_id)?;
        trace!(port_id = %port_id, node_id = %port.node_id, "Releasing port");
        for field_id in &port.fields {
            let key = (port.node_id.clone(), port.side, field_id.clone());
            if self.owners.get(&key) == Some(&port_id) {
                self.owners.remove(&key);
            }
        }
        if port.site.is_aggregate() {
            self.aggregates
                .remove(&(port.node_id.clone(), port.side, port.site));
        }
        Some(port)
    }

    pub fn get(&self, port_id: PortId) -> Option<&Port> {
        self.ports.get(&port_id)
    }

    pub fn contains(&self, port_id: PortId) -> bool {
        self.ports.contains_key(&port_id)
    }

    /// Ports attached to a node
    pub fn ports_of(&self, node_id: &NodeId) -> Vec<PortId> {
        self.ports
            .values()
            .filter(|p| &p.node_id == node_id)
            .map(|p| p.id)
            .collect()
    }

    pub fn ids(&self) -> Vec<PortId> {
        self.ports.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn clear(&mut self) {
        self.ports.clear();
        self.owners.clear();
        self.aggregates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_port_is_shared() {
        let mut ports = PortRegistry::new();
        let node = NodeId::from("b");
        let first = ports.get_or_create_aggregate_port(&node, Side::Left, PortSite::Header);
        let second = ports.get_or_create_aggregate_port(&node, Side::Left, PortSite::Header);
        let other_side = ports.get_or_create_aggregate_port(&node, Side::Right, PortSite::Header);
        assert_eq!(first, second);
        assert_ne!(first, other_side);
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_aggregate_port_represents_many_fields() {
        let mut ports = PortRegistry::new();
        let node = NodeId::from("b");
        let header = ports.get_or_create_aggregate_port(&node, Side::Left, PortSite::Header);
        ports.bind_field(header, &FieldId::from("1"));
        ports.bind_field(header, &FieldId::from("2"));
        ports.bind_field(header, &FieldId::from("2"));
        assert_eq!(ports.get(header).unwrap().fields.len(), 2);
        assert_eq!(ports.get_port(&FieldRef::new("b", "2"), Side::Left), Some(header));
        assert_eq!(ports.get_port(&FieldRef::new("b", "2"), Side::Right), None);
    }

    #[test]
    fn test_binding_moves_ownership() {
        let mut ports = PortRegistry::new();
        let field = FieldRef::new("b", "12");
        let overflow =
            ports.get_or_create_aggregate_port(&field.node_id, Side::Left, PortSite::Overflow);
        ports.bind_field(overflow, &field.field_id);

        let row = ports.create_field_port(&field, Side::Left);
        assert_ne!(row, overflow);
        assert_eq!(ports.get_port(&field, Side::Left), Some(row));
        assert!(ports.get(overflow).unwrap().fields.is_empty());
        assert_eq!(ports.get(row).unwrap().site, PortSite::Paginated);
    }

    #[test]
    fn test_field_port_reused() {
        let mut ports = PortRegistry::new();
        let field = FieldRef::new("b", "1");
        let first = ports.create_field_port(&field, Side::Left);
        let second = ports.create_field_port(&field, Side::Left);
        assert_eq!(first, second);
    }

    #[test]
    fn test_release_drops_bindings() {
        let mut ports = PortRegistry::new();
        let field = FieldRef::new("b", "1");
        let row = ports.create_field_port(&field, Side::Left);
        let released = ports.release_port(row).unwrap();
        assert_eq!(released.node_id, NodeId::from("b"));
        assert_eq!(ports.get_port(&field, Side::Left), None);
        assert!(ports.is_empty());
        assert!(ports.release_port(row).is_none());
    }

    #[test]
    fn test_release_aggregate_allows_recreation() {
        let mut ports = PortRegistry::new();
        let node = NodeId::from("b");
        let header = ports.get_or_create_aggregate_port(&node, Side::Left, PortSite::Header);
        ports.release_port(header);
        let again = ports.get_or_create_aggregate_port(&node, Side::Left, PortSite::Header);
        assert_ne!(header, again);
        assert_eq!(ports.ports_of(&node), vec![again]);
    }

    #[test]
    fn test_unbind_only_clears_own_binding() {
        let mut ports = PortRegistry::new();
        let field = FieldRef::new("b", "1");
        let header =
            ports.get_or_create_aggregate_port(&field.node_id, Side::Left, PortSite::Header);
        ports.bind_field(header, &field.field_id);
        let row = ports.create_field_port(&field, Side::Left);
        ports.unbind_field(header, &field.field_id);
        assert_eq!(ports.get_port(&field, Side::Left), Some(row));
    }
}
