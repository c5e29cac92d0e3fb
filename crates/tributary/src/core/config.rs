//! Layout configuration
//!
//! All geometry is expressed in canvas pixels.

use serde::{Deserialize, Serialize};

use super::{LineageError, NodeKind, Result};

/// Default number of field rows shown per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Layout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_size: usize,
    pub header_height: f64,
    pub table_row_height: f64, // PhysicalTable and FormView rows
    pub logic_row_height: f64, // views and indicators
    pub pager_height: f64,
    pub node_gutter: f64,      // vertical gap between siblings in a column
    pub level_gap: f64,        // horizontal gap between columns
    pub min_node_width: f64,
    pub max_node_width: f64,
    pub char_width: f64,
    pub node_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            header_height: 40.0,
            table_row_height: 24.0,
            logic_row_height: 32.0,
            pager_height: 24.0,
            node_gutter: 24.0,
            level_gap: 160.0,
            min_node_width: 200.0,
            max_node_width: 320.0,
            char_width: 8.0,
            node_padding: 48.0,
        }
    }
}

impl LayoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_gutter(mut self, gutter: f64) -> Self {
        self.node_gutter = gutter;
        self
    }

    /// Row height for a node kind
    pub fn row_height(&self, kind: NodeKind) -> f64 {
        match kind {
            NodeKind::PhysicalTable | NodeKind::FormView => self.table_row_height,
            NodeKind::LogicalView | NodeKind::ComputedIndicator | NodeKind::AtomicIndicator => {
                self.logic_row_height
            }
        }
    }

    /// Horizontal distance between the left edges of adjacent columns
    pub fn column_pitch(&self) -> f64 {
        self.max_node_width + self.level_gap
    }

    /// Check the configuration for values the layout cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(LineageError::invalid_config("page_size must be at least 1"));
        }
        if self.min_node_width > self.max_node_width {
            return Err(LineageError::invalid_config(format!(
                "min_node_width {} exceeds max_node_width {}",
                self.min_node_width, self.max_node_width
            )));
        }
        let lengths = [
            ("header_height", self.header_height),
            ("table_row_height", self.table_row_height),
            ("logic_row_height", self.logic_row_height),
            ("pager_height", self.pager_height),
            ("node_gutter", self.node_gutter),
            ("level_gap", self.level_gap),
            ("char_width", self.char_width),
            ("node_padding", self.node_padding),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return Err(LineageError::invalid_config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
