//! Core type definitions for lineage graphs
//!
//! This module contains the data model shared by every engine component:
//! identifiers, node kinds, nodes with their fields, the view direction,
//! port sides and sites, and canvas rectangles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a data asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a field, unique within its owning node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FieldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A field addressed through its owning node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub node_id: NodeId,
    pub field_id: FieldId,
}

impl FieldRef {
    pub fn new(node_id: impl Into<NodeId>, field_id: impl Into<FieldId>) -> Self {
        Self {
            node_id: node_id.into(),
            field_id: field_id.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_id, self.field_id)
    }
}

/// Kind of data asset
///
/// The set is closed: every place that needs per-kind behaviour (row height,
/// display name) matches on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Physical warehouse table
    #[default]
    PhysicalTable,
    /// Logical view defined over other assets
    LogicalView,
    /// Indicator computed from other indicators or fields
    ComputedIndicator,
    /// Base indicator bound directly to a table field
    AtomicIndicator,
    /// Form-backed data entry view
    FormView,
}

impl NodeKind {
    /// Returns true for kinds rendered as plain data tables (compact rows)
    pub fn is_data_table(&self) -> bool {
        matches!(self, NodeKind::PhysicalTable | NodeKind::FormView)
    }

    /// Returns true for indicator kinds
    pub fn is_indicator(&self) -> bool {
        matches!(self, NodeKind::ComputedIndicator | NodeKind::AtomicIndicator)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::PhysicalTable => write!(f, "physical-table"),
            NodeKind::LogicalView => write!(f, "logical-view"),
            NodeKind::ComputedIndicator => write!(f, "computed-indicator"),
            NodeKind::AtomicIndicator => write!(f, "atomic-indicator"),
            NodeKind::FormView => write!(f, "form-view"),
        }
    }
}

/// Expansion direction of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Walk parent links; levels are negative and grow leftwards
    Ancestors,
    /// Walk child links; levels are positive and grow rightwards
    #[default]
    Descendants,
}

impl Direction {
    /// Level step taken when moving one hop away from the ingress
    pub fn step(&self) -> i32 {
        match self {
            Direction::Ancestors => -1,
            Direction::Descendants => 1,
        }
    }

    /// Returns true if the view reads from farthest ancestor to ingress
    pub fn is_reversed(&self) -> bool {
        matches!(self, Direction::Ancestors)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ancestors => write!(f, "ancestors"),
            Direction::Descendants => write!(f, "descendants"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ancestors" | "upstream" | "parents" => Ok(Direction::Ancestors),
            "descendants" | "downstream" | "children" => Ok(Direction::Descendants),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

/// Side of a node a port is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Semantic site of a port on its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSite {
    /// Aggregate port on the node header (collapsed or earlier-page fields)
    Header,
    /// Dedicated port on a visible field row
    Paginated,
    /// Aggregate port on the bottom edge (later-page fields)
    Overflow,
}

impl PortSite {
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, PortSite::Paginated)
    }
}

/// A column of a data asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parent_fields: Vec<FieldRef>,
    #[serde(default)]
    pub child_fields: Vec<FieldRef>,
}

impl Field {
    /// Create a field whose label equals its id
    pub fn new(id: impl Into<FieldId>) -> Self {
        let id = id.into();
        Self {
            label: id.0.clone(),
            id,
            parent_fields: Vec::new(),
            child_fields: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_parent(mut self, parent: FieldRef) -> Self {
        self.parent_fields.push(parent);
        self
    }

    pub fn with_child(mut self, child: FieldRef) -> Self {
        self.child_fields.push(child);
        self
    }
}

/// A data asset in the lineage graph
///
/// `level`, `page_offset`, `expanded` and `index` are derived by the engine;
/// hosts may supply `expanded` to mark the initially expanded set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub parent_ids: BTreeSet<NodeId>,
    #[serde(default)]
    pub child_ids: BTreeSet<NodeId>,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub page_offset: usize,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub index: usize,
}

impl Node {
    /// Create a physical table node whose label equals its id
    pub fn new(id: impl Into<NodeId>) -> Self {
        let id = id.into();
        Self {
            label: id.0.clone(),
            id,
            kind: NodeKind::default(),
            fields: Vec::new(),
            parent_ids: BTreeSet::new(),
            child_ids: BTreeSet::new(),
            level: 0,
            page_offset: 0,
            expanded: false,
            index: 0,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent_ids.insert(parent.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<NodeId>) -> Self {
        self.child_ids.insert(child.into());
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    /// Related node ids in the given view direction
    pub fn relations(&self, direction: Direction) -> &BTreeSet<NodeId> {
        match direction {
            Direction::Ancestors => &self.parent_ids,
            Direction::Descendants => &self.child_ids,
        }
    }

    /// Related node ids against the given view direction
    pub fn back_relations(&self, direction: Direction) -> &BTreeSet<NodeId> {
        match direction {
            Direction::Ancestors => &self.child_ids,
            Direction::Descendants => &self.parent_ids,
        }
    }

    pub fn field(&self, field_id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| &f.id == field_id)
    }

    pub fn field_index(&self, field_id: &FieldId) -> Option<usize> {
        self.fields.iter().position(|f| &f.id == field_id)
    }

    /// Number of field pages for the given page size (at least one)
    pub fn page_count(&self, page_size: usize) -> usize {
        let page_size = page_size.max(1);
        self.fields.len().div_ceil(page_size).max(1)
    }
}

/// Axis-aligned rectangle in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Returns true if the two rectangles overlap vertically
    pub fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.y < other.bottom() && other.y < self.bottom()
    }
}

/// Serialized form of a lineage view: the initial node list, the ingress and
/// the expansion direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    pub ingress: NodeId,
    #[serde(default)]
    pub direction: Direction,
    pub nodes: Vec<Node>,
}
