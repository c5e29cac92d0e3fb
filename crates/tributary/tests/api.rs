//! Integration tests for the public API

use tributary::engine::{GraphEvent, NodeLoader};
use tributary::prelude::*;
use tributary::{layout_json, parse_document};

const DOCUMENT: &str = r#"{
    "ingress": "orders",
    "direction": "descendants",
    "nodes": [
        {"id": "orders", "label": "Orders", "childIds": ["daily", "by_region"],
         "fields": [{"id": "amount"}, {"id": "region"}]},
        {"id": "daily", "kind": "logical_view", "parentIds": ["orders"],
         "fields": [{"id": "total", "parentFields": [{"nodeId": "orders", "fieldId": "amount"}]}]},
        {"id": "by_region", "kind": "computed_indicator", "parentIds": ["orders"],
         "fields": [{"id": "share", "parentFields": [
            {"nodeId": "orders", "fieldId": "amount"},
            {"nodeId": "orders", "fieldId": "region"}]}]}
    ]
}"#;

#[test]
fn test_layout_json_document() {
    let model = layout_json(DOCUMENT).unwrap();
    assert_eq!(model.nodes.len(), 3);
    assert_eq!(model.edges.len(), 3);

    let orders = model.node(&"orders".into()).unwrap();
    assert_eq!(orders.label, "Orders");
    assert!(orders.expanded);
    assert_eq!(orders.rows.len(), 2);

    let daily = model.node(&"daily".into()).unwrap();
    let by_region = model.node(&"by_region".into()).unwrap();
    assert_eq!(daily.level, 1);
    assert_eq!(daily.rect.x, by_region.rect.x);
    assert!(daily.rect.x > orders.rect.x);
    // Collapsed children draw only their header.
    assert_eq!(daily.rect.height, 40.0);
}

#[test]
fn test_collapsed_targets_share_header_port() {
    let model = layout_json(DOCUMENT).unwrap();
    let share_edges: Vec<_> = model
        .edges
        .iter()
        .filter(|e| e.target.node_id == NodeId::from("by_region"))
        .collect();
    assert_eq!(share_edges.len(), 2);
    assert_eq!(share_edges[0].target_port, share_edges[1].target_port);
    let port = model.port(share_edges[0].target_port).unwrap();
    assert_eq!(port.site, PortSite::Header);
    assert_eq!(port.side, Side::Left);
}

#[test]
fn test_render_model_serializes_camel_case() {
    let model = layout_json(DOCUMENT).unwrap();
    let json = serde_json::to_value(&model).unwrap();
    let node = &json["nodes"][0];
    assert!(node.get("pageOffset").is_some());
    assert!(node.get("pageCount").is_some());
    assert!(json["edges"][0].get("sourcePort").is_some());
}

#[test]
fn test_document_round_trip_through_engine() {
    let document = parse_document(DOCUMENT).unwrap();
    let mut engine = GraphEngine::new();
    engine.load_document(document).unwrap();
    assert_eq!(engine.ingress(), Some(&NodeId::from("orders")));
    assert_eq!(engine.direction(), Direction::Descendants);
    assert_eq!(engine.store().visible_count(), 3);
}

#[test]
fn test_events_describe_commands() {
    let mut engine = GraphEngine::new();
    engine.load_document(parse_document(DOCUMENT).unwrap()).unwrap();
    engine.drain_events();

    engine.collapse_node(&"orders".into()).unwrap();
    let events = engine.drain_events();
    let removed: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, GraphEvent::NodeRemoved { .. }))
        .filter_map(|e| e.node_id())
        .collect();
    assert_eq!(removed.len(), 2);
    assert!(events.iter().any(|e| matches!(e, GraphEvent::EdgeRemoved { .. })));
    assert!(events.iter().any(|e| matches!(e, GraphEvent::NodeResized { .. })));
}

#[test]
fn test_custom_loader() {
    #[derive(Default)]
    struct Recorder {
        seen: std::rc::Rc<std::cell::RefCell<Vec<NodeId>>>,
    }
    impl NodeLoader for Recorder {
        fn load_more(&mut self, request: &LoadRequest) {
            self.seen.borrow_mut().push(request.node_id.clone());
        }
    }

    let recorder = Recorder::default();
    let seen = recorder.seen.clone();
    let mut engine = GraphEngine::new().with_loader(recorder);
    engine
        .load_initial_graph(
            vec![Node::new("a").with_child("elsewhere")],
            "a",
            Direction::Descendants,
        )
        .unwrap();
    let outcome = engine.expand_node(&"a".into()).unwrap();
    assert!(matches!(outcome, ExpandOutcome::Pending(_)));
    assert_eq!(seen.borrow().as_slice(), &[NodeId::from("a")]);
}

#[test]
fn test_custom_page_size() {
    let config = LayoutConfig::default().with_page_size(1);
    let mut engine = GraphEngine::with_config(config).unwrap();
    engine
        .load_initial_graph(
            vec![Node::new("a").with_field(Field::new("x")).with_field(Field::new("y"))],
            "a",
            Direction::Descendants,
        )
        .unwrap();
    let model = engine.render_model();
    let node = model.node(&"a".into()).unwrap();
    assert_eq!(node.rows.len(), 1);
    assert_eq!(node.page_count, 2);
}
