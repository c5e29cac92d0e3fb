//! Node sizing and placement
//!
//! Columns are levels: the ingress column sits at x = 0, ancestors extend to
//! the left and descendants to the right. Within a column, the siblings
//! produced by one anchor node are stacked top to bottom and centered on
//! that anchor. Node heights depend on the node kind, whether its fields are
//! shown, and the current page of its field list.

use std::collections::HashMap;
use std::ops::Range;
use tracing::{debug, span, trace, Level};
use unicode_width::UnicodeWidthStr;

use super::levels::LevelAssignment;
use super::store::{NodeStore, Placement};
use crate::core::{LayoutConfig, Node, NodeId, PortSite, Rect};

/// Where a field of a node is drawn in the node's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    pub site: PortSite,
    /// Row within the visible page, for `PortSite::Paginated`
    pub row: Option<usize>,
}

impl FieldSlot {
    /// Classify the field at `field_index` against the node's page window
    pub fn locate(node: &Node, field_index: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let page = field_index / page_size;
        if !node.expanded || page < node.page_offset {
            Self {
                site: PortSite::Header,
                row: None,
            }
        } else if page == node.page_offset {
            Self {
                site: PortSite::Paginated,
                row: Some(field_index % page_size),
            }
        } else {
            Self {
                site: PortSite::Overflow,
                row: None,
            }
        }
    }
}

/// Sizing and stacking of lineage nodes
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Field indices shown on the node's current page
    pub fn visible_rows(&self, node: &Node) -> Range<usize> {
        if !node.expanded {
            return 0..0;
        }
        let page_size = self.config.page_size.max(1);
        let start = (node.page_offset * page_size).min(node.fields.len());
        let end = (start + page_size).min(node.fields.len());
        start..end
    }

    fn has_pager(&self, node: &Node) -> bool {
        node.expanded && node.fields.len() > self.config.page_size
    }

    /// Height of a node in its current state
    pub fn height_of(&self, node: &Node) -> f64 {
        let rows = self.visible_rows(node).len() as f64;
        let pager = if self.has_pager(node) {
            self.config.pager_height
        } else {
            0.0
        };
        self.config.header_height + rows * self.config.row_height(node.kind) + pager
    }

    /// Width of a node from its widest label
    pub fn width_of(&self, node: &Node) -> f64 {
        let widest = node
            .fields
            .iter()
            .map(|f| UnicodeWidthStr::width(f.label.as_str()))
            .chain(std::iter::once(UnicodeWidthStr::width(node.label.as_str())))
            .max()
            .unwrap_or(0);
        let width = widest as f64 * self.config.char_width + self.config.node_padding;
        width.clamp(self.config.min_node_width, self.config.max_node_width)
    }

    /// Left edge of the column holding `level`
    pub fn column_x(&self, level: i32) -> f64 {
        level as f64 * self.config.column_pitch()
    }

    /// Port offset from the node top for a field slot
    pub fn port_offset(&self, node: &Node, slot: FieldSlot) -> f64 {
        match slot.site {
            PortSite::Header => self.config.header_height / 2.0,
            PortSite::Paginated => {
                let row_height = self.config.row_height(node.kind);
                let row = slot.row.unwrap_or(0) as f64;
                self.config.header_height + row * row_height + row_height / 2.0
            }
            PortSite::Overflow => self.height_of(node),
        }
    }

    /// Place a sibling stack centered on its anchor
    ///
    /// `members` must already be sorted by insertion index. Members found in
    /// `pinned` keep their cached rectangle and the stack continues below it.
    pub fn place_group(
        &self,
        members: &[&Node],
        anchor: &Rect,
        level: i32,
        pinned: &HashMap<NodeId, Rect>,
    ) -> Vec<(NodeId, Rect)> {
        if members.is_empty() {
            return Vec::new();
        }
        let gutter = self.config.node_gutter;
        let heights: Vec<f64> = members
            .iter()
            .map(|n| {
                pinned
                    .get(&n.id)
                    .map(|r| r.height)
                    .unwrap_or_else(|| self.height_of(n))
            })
            .collect();
        let total: f64 = heights.iter().sum::<f64>() + gutter * (members.len() - 1) as f64;

        let x = self.column_x(level);
        let mut cursor = anchor.center_y() - total / 2.0;
        let mut placed = Vec::with_capacity(members.len());
        for (node, height) in members.iter().zip(heights) {
            let rect = match pinned.get(&node.id) {
                Some(cached) => {
                    trace!(node_id = %node.id, y = cached.y, "Reusing cached position");
                    *cached
                }
                None => Rect::new(x, cursor, self.width_of(node), height),
            };
            cursor = rect.bottom() + gutter;
            placed.push((node.id.clone(), rect));
        }
        placed
    }

    /// Push overlapping nodes of one column downwards
    ///
    /// Returns the nodes that moved with their new rectangles. A column that
    /// is already free of overlaps is left untouched.
    pub fn restack(&self, column: &[(NodeId, Rect)]) -> Vec<(NodeId, Rect)> {
        let mut sorted: Vec<&(NodeId, Rect)> = column.iter().collect();
        sorted.sort_by(|a, b| a.1.y.total_cmp(&b.1.y));

        let mut moved = Vec::new();
        let mut floor: Option<f64> = None;
        for (id, rect) in sorted {
            let mut rect = *rect;
            if let Some(min_y) = floor {
                if rect.y < min_y {
                    trace!(node_id = %id, from = rect.y, to = min_y, "Restacking node");
                    rect.y = min_y;
                    moved.push((id.clone(), rect));
                }
            }
            floor = Some(rect.bottom() + self.config.node_gutter);
        }
        moved
    }

    /// Place every node of a fresh level assignment
    pub fn layout_initial(
        &self,
        assignment: &LevelAssignment,
        store: &NodeStore,
    ) -> HashMap<NodeId, Placement> {
        let layout_span = span!(
            Level::DEBUG,
            "layout_initial",
            node_count = assignment.levels.len()
        );
        let _enter = layout_span.enter();

        let mut placements: HashMap<NodeId, Placement> = HashMap::new();
        let no_pins = HashMap::new();

        for group in assignment.groups_outward() {
            if group.level == 0 {
                for id in &group.nodes {
                    if let Some(node) = store.get(id) {
                        let rect =
                            Rect::new(self.column_x(0), 0.0, self.width_of(node), self.height_of(node));
                        placements.insert(id.clone(), Placement { rect, anchor: None });
                    }
                }
                continue;
            }

            // Sibling stacks keyed by anchor, visited in the anchors' vertical order.
            let mut stacks: Vec<(NodeId, Vec<&Node>)> = Vec::new();
            for id in &group.nodes {
                let (Some(node), Some(anchor)) = (store.get(id), assignment.anchor_of(id)) else {
                    continue;
                };
                match stacks.iter_mut().find(|(a, _)| a == anchor) {
                    Some((_, members)) => members.push(node),
                    None => stacks.push((anchor.clone(), vec![node])),
                }
            }
            stacks.sort_by(|(a, _), (b, _)| {
                let ay = placements.get(a).map(|p| p.rect.y).unwrap_or(0.0);
                let by = placements.get(b).map(|p| p.rect.y).unwrap_or(0.0);
                ay.total_cmp(&by)
            });

            let mut column: Vec<(NodeId, Rect)> = Vec::new();
            let mut anchors: HashMap<NodeId, NodeId> = HashMap::new();
            for (anchor, mut members) in stacks {
                let Some(anchor_rect) = placements.get(&anchor).map(|p| p.rect) else {
                    continue;
                };
                members.sort_by_key(|n| n.index);
                for (id, rect) in self.place_group(&members, &anchor_rect, group.level, &no_pins) {
                    anchors.insert(id.clone(), anchor.clone());
                    column.push((id, rect));
                }
            }
            for (id, rect) in self.restack(&column) {
                if let Some(entry) = column.iter_mut().find(|(c, _)| c == &id) {
                    entry.1 = rect;
                }
            }
            for (id, rect) in column {
                let anchor = anchors.remove(&id);
                placements.insert(id, Placement { rect, anchor });
            }
        }

        debug!(placed = placements.len(), "Initial layout completed");
        placements
    }
}
