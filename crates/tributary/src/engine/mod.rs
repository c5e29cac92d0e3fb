//! Lineage view engine
//!
//! Level assignment, layout, port and edge bookkeeping, and the interactive
//! [`GraphEngine`] built on top of them.

pub mod edges;
mod events;
mod graph;
pub mod layout;
pub mod levels;
pub mod loader;
pub mod ports;
pub mod relations;
pub mod removed;
pub mod render_model;
pub mod store;
pub mod trace;

pub use edges::{Edge, EdgeId, EdgeRegistry, FieldLink};
pub use events::GraphEvent;
pub use graph::{CollapseOutcome, ExpandOutcome, GraphEngine, LoadOutcome, PageOutcome};
pub use layout::{FieldSlot, LayoutEngine};
pub use levels::{assign_levels, LevelAssignment, LevelGroup};
pub use loader::{LoadQueue, LoadRequest, LoadTicket, NodeLoader, NoopLoader};
pub use ports::{Port, PortId, PortRegistry};
pub use relations::{RefreshReport, RelationResolver};
pub use removed::{RemovedNode, RemovedNodeCache};
pub use render_model::{RenderEdge, RenderModel, RenderNode, RenderPort, RenderRow};
pub use store::{NodeStore, Placement};
pub use trace::trace_field_lineage;
