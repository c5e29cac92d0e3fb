//! Tributary - interactive field-level data lineage layout
//!
//! Lays out a lineage graph of data assets (tables, views, indicators) in
//! columns around an ingress node and keeps the ports and edges between
//! their fields consistent while the user expands, collapses, pages and
//! selects.
//!
//! # Quick Start
//!
//! ```rust
//! use tributary::layout_json;
//!
//! let input = r#"{
//!     "ingress": "orders",
//!     "direction": "descendants",
//!     "nodes": [
//!         {"id": "orders", "childIds": ["daily"], "fields": [{"id": "amount"}]},
//!         {"id": "daily", "parentIds": ["orders"],
//!          "fields": [{"id": "total", "parentFields": [{"nodeId": "orders", "fieldId": "amount"}]}]}
//!     ]
//! }"#;
//! let model = layout_json(input).unwrap();
//! assert_eq!(model.nodes.len(), 2);
//! assert_eq!(model.edges.len(), 1);
//! ```
//!
//! # Interactive Use
//!
//! ```rust
//! use tributary::prelude::*;
//!
//! let nodes = vec![
//!     Node::new("a").with_child("b"),
//!     Node::new("b").with_parent("a"),
//! ];
//! let mut engine = GraphEngine::new();
//! engine.load_initial_graph(nodes, "a", Direction::Descendants).unwrap();
//!
//! let outcome = engine.collapse_node(&NodeId::from("a")).unwrap();
//! assert_eq!(outcome, CollapseOutcome::Collapsed { removed: vec![NodeId::from("b")] });
//!
//! // The hidden child comes back from the cache, no load needed.
//! let outcome = engine.expand_node(&NodeId::from("a")).unwrap();
//! assert!(matches!(outcome, ExpandOutcome::Wired { .. }));
//! ```

pub mod core;
pub mod engine;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Direction, Field, FieldId, FieldRef, GraphDocument, LayoutConfig, LineageError, LoadError,
        Node, NodeId, NodeKind, PortSite, Rect, Side,
    };
    pub use crate::engine::{
        CollapseOutcome, ExpandOutcome, GraphEngine, GraphEvent, LoadOutcome, LoadQueue,
        LoadRequest, LoadTicket, NodeLoader, PageOutcome, RenderModel,
    };
}

/// Parse a graph document and lay it out
///
/// # Arguments
/// * `input` - JSON graph document (`{"ingress", "direction", "nodes"}`)
///
/// # Returns
/// * `Ok(RenderModel)` - The initial view
/// * `Err` - If the document is malformed
pub fn layout_json(input: &str) -> anyhow::Result<engine::RenderModel> {
    layout_json_with_config(input, LayoutConfig::default())
}

/// Parse a graph document and lay it out with a specific configuration
pub fn layout_json_with_config(
    input: &str,
    config: LayoutConfig,
) -> anyhow::Result<engine::RenderModel> {
    let document = parse_document(input)?;
    let mut engine = engine::GraphEngine::with_config(config)?;
    engine.load_document(document)?;
    Ok(engine.render_model())
}

/// Parse a JSON graph document
///
/// # Example
/// ```rust
/// use tributary::{parse_document, Direction};
///
/// let doc = parse_document(r#"{"ingress": "a", "nodes": [{"id": "a"}]}"#).unwrap();
/// assert_eq!(doc.direction, Direction::Descendants);
/// ```
pub fn parse_document(input: &str) -> Result<GraphDocument> {
    serde_json::from_str(input).map_err(|e| LineageError::invalid_document(e.to_string()))
}
