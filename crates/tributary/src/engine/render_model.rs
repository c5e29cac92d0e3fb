//! Renderer-facing snapshot of a lineage view
//!
//! Everything is in absolute canvas coordinates. Port positions are derived
//! from the owning node's rectangle and the port's offset, so a renderer
//! only needs to draw what it receives.

use serde::Serialize;
use std::collections::HashSet;

use super::edges::{EdgeId, EdgeRegistry};
use super::layout::LayoutEngine;
use super::ports::{PortId, PortRegistry};
use super::store::NodeStore;
use crate::core::{FieldId, FieldRef, NodeId, NodeKind, PortSite, Rect, Side};

/// A field row on the node's current page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRow {
    pub field_id: FieldId,
    pub label: String,
    /// Vertical center of the row
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub level: i32,
    pub rect: Rect,
    pub expanded: bool,
    /// A lazy load for this node is in flight
    pub busy: bool,
    pub page_offset: usize,
    pub page_count: usize,
    pub rows: Vec<RenderRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPort {
    pub id: PortId,
    pub node_id: NodeId,
    pub side: Side,
    pub site: PortSite,
    pub x: f64,
    pub y: f64,
    pub fields: Vec<FieldId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderEdge {
    pub id: EdgeId,
    pub source: FieldRef,
    pub target: FieldRef,
    pub source_port: PortId,
    pub target_port: PortId,
    pub highlighted: bool,
    pub dimmed: bool,
}

/// Complete drawable state of a view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderModel {
    pub nodes: Vec<RenderNode>,
    pub ports: Vec<RenderPort>,
    pub edges: Vec<RenderEdge>,
}

impl RenderModel {
    pub(crate) fn build(
        store: &NodeStore,
        ports: &PortRegistry,
        edges: &EdgeRegistry,
        layout: &LayoutEngine,
        busy: &HashSet<NodeId>,
    ) -> Self {
        let page_size = layout.config().page_size;
        let header = layout.config().header_height;

        let nodes = store
            .visible_nodes()
            .filter_map(|node| {
                let rect = store.rect(&node.id)?;
                let row_height = layout.config().row_height(node.kind);
                let rows = layout
                    .visible_rows(node)
                    .enumerate()
                    .map(|(row, index)| {
                        let field = &node.fields[index];
                        RenderRow {
                            field_id: field.id.clone(),
                            label: field.label.clone(),
                            y: rect.y + header + row as f64 * row_height + row_height / 2.0,
                        }
                    })
                    .collect();
                Some(RenderNode {
                    id: node.id.clone(),
                    kind: node.kind,
                    label: node.label.clone(),
                    level: node.level,
                    rect,
                    expanded: node.expanded,
                    busy: busy.contains(&node.id),
                    page_offset: node.page_offset,
                    page_count: node.page_count(page_size),
                    rows,
                })
            })
            .collect();

        let ports = ports
            .iter()
            .filter_map(|port| {
                let rect = store.rect(&port.node_id)?;
                let x = match port.side {
                    Side::Left => rect.x,
                    Side::Right => rect.right(),
                };
                Some(RenderPort {
                    id: port.id,
                    node_id: port.node_id.clone(),
                    side: port.side,
                    site: port.site,
                    x,
                    y: rect.y + port.offset_y,
                    fields: port.fields.iter().cloned().collect(),
                })
            })
            .collect();

        let edges = edges
            .iter()
            .map(|edge| RenderEdge {
                id: edge.id,
                source: edge.link.source.clone(),
                target: edge.link.target.clone(),
                source_port: edge.source_port,
                target_port: edge.target_port,
                highlighted: edge.highlighted,
                dimmed: edge.dimmed,
            })
            .collect();

        Self { nodes, ports, edges }
    }

    pub fn node(&self, id: &NodeId) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn port(&self, id: PortId) -> Option<&RenderPort> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Edge carrying the relation between two fields
    pub fn edge_between(&self, source: &FieldRef, target: &FieldRef) -> Option<&RenderEdge> {
        self.edges
            .iter()
            .find(|e| &e.source == source && &e.target == target)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
