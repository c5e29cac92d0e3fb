//! WebAssembly bindings for Tributary
//!
//! Exposes one lineage view to JavaScript. Everything crosses the boundary
//! as JSON strings. Lazy loads use a request/complete handshake: after a
//! command, `takeLoadRequests` lists what the host must fetch, and the host
//! answers each one with `completeLoad` or `failLoad`.

use wasm_bindgen::prelude::*;

use crate::core::{Direction, FieldId, LayoutConfig, LoadError, Node, NodeId};
use crate::engine::{GraphEngine, LoadQueue, LoadTicket};

/// Initialize WASM module
///
/// Sets up panic hooks and logging for better error messages in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use crate::core::logging::init_logging;
    let _ = init_logging(Some("info"), None);
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_error)
}

/// An interactive lineage view driven from JavaScript
#[wasm_bindgen]
pub struct LineageView {
    engine: GraphEngine,
    queue: LoadQueue,
}

#[wasm_bindgen]
impl LineageView {
    /// Create a view; `config_json` may be empty for the default layout
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<LineageView, JsValue> {
        let config: LayoutConfig = if config_json.trim().is_empty() {
            LayoutConfig::default()
        } else {
            serde_json::from_str(config_json).map_err(js_error)?
        };
        let queue = LoadQueue::new();
        let engine = GraphEngine::with_config(config)
            .map_err(js_error)?
            .with_loader(queue.clone());
        Ok(LineageView { engine, queue })
    }

    /// Load nodes (JSON array) around `ingress`; returns the render model
    #[wasm_bindgen(js_name = loadInitialGraph)]
    pub fn load_initial_graph(
        &mut self,
        nodes_json: &str,
        ingress: &str,
        direction: &str,
    ) -> Result<String, JsValue> {
        let nodes: Vec<Node> = serde_json::from_str(nodes_json).map_err(js_error)?;
        let direction: Direction = direction.parse().map_err(js_error)?;
        self.engine
            .load_initial_graph(nodes, ingress, direction)
            .map_err(js_error)?;
        self.render()
    }

    pub fn expand(&mut self, node_id: &str) -> Result<String, JsValue> {
        self.engine
            .expand_node(&NodeId::from(node_id))
            .map_err(js_error)?;
        self.render()
    }

    pub fn collapse(&mut self, node_id: &str) -> Result<String, JsValue> {
        self.engine
            .collapse_node(&NodeId::from(node_id))
            .map_err(js_error)?;
        self.render()
    }

    pub fn page(&mut self, node_id: &str, delta: i32) -> Result<String, JsValue> {
        self.engine
            .page_node(&NodeId::from(node_id), delta)
            .map_err(js_error)?;
        self.render()
    }

    #[wasm_bindgen(js_name = selectField)]
    pub fn select_field(&mut self, node_id: &str, field_id: &str) -> Result<String, JsValue> {
        self.engine
            .select_field(&NodeId::from(node_id), &FieldId::from(field_id))
            .map_err(js_error)?;
        self.render()
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) -> Result<String, JsValue> {
        self.engine.clear_selection();
        self.render()
    }

    /// Outstanding load requests as a JSON array
    #[wasm_bindgen(js_name = takeLoadRequests)]
    pub fn take_load_requests(&mut self) -> Result<String, JsValue> {
        to_json(&self.queue.take())
    }

    /// Answer a load request with a JSON array of nodes
    #[wasm_bindgen(js_name = completeLoad)]
    pub fn complete_load(&mut self, ticket_json: &str, nodes_json: &str) -> Result<String, JsValue> {
        let ticket: LoadTicket = serde_json::from_str(ticket_json).map_err(js_error)?;
        let nodes: Vec<Node> = serde_json::from_str(nodes_json).map_err(js_error)?;
        self.engine
            .complete_load(&ticket, Ok(nodes))
            .map_err(js_error)?;
        self.render()
    }

    /// Report that a load request could not be served
    #[wasm_bindgen(js_name = failLoad)]
    pub fn fail_load(&mut self, ticket_json: &str, message: &str) -> Result<String, JsValue> {
        let ticket: LoadTicket = serde_json::from_str(ticket_json).map_err(js_error)?;
        self.engine
            .complete_load(&ticket, Err(LoadError::new(message)))
            .map_err(js_error)?;
        self.render()
    }

    /// Mutation events since the last call, as a JSON array
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> Result<String, JsValue> {
        to_json(&self.engine.drain_events())
    }

    pub fn render(&self) -> Result<String, JsValue> {
        to_json(&self.engine.render_model())
    }

    pub fn teardown(&mut self) {
        self.engine.teardown();
        self.queue.take();
    }
}

/// Lay out a JSON graph document in one call
#[wasm_bindgen(js_name = layoutJson)]
pub fn layout_json(input: &str) -> Result<String, JsValue> {
    let model = crate::layout_json(input).map_err(js_error)?;
    to_json(&model)
}
