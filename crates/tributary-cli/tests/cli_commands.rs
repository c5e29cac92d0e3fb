//! End-to-end tests spawning the `tributary` binary

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const DOCUMENT: &str = r#"{
    "ingress": "orders",
    "nodes": [
        {"id": "orders", "label": "Orders", "childIds": ["daily"],
         "fields": [{"id": "amount"}, {"id": "region"}, {"id": "placed_at"}]},
        {"id": "daily", "parentIds": ["orders"], "childIds": ["by_region"],
         "fields": [
            {"id": "total", "parentFields": [{"nodeId": "orders", "fieldId": "amount"}]},
            {"id": "day", "parentFields": [{"nodeId": "orders", "fieldId": "placed_at"}]}
         ]}
    ]
}"#;

const CATALOG: &str = r#"[
    {"id": "by_region", "parentIds": ["daily"],
     "fields": [{"id": "sum", "parentFields": [{"nodeId": "daily", "fieldId": "total"}]}]}
]"#;

fn write(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tributary"))
        .args(args)
        .env("TRIBUTARY_LOG_LEVEL", "off")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn node<'a>(model: &'a Value, id: &str) -> &'a Value {
    model["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == id)
        .unwrap_or_else(|| panic!("node {} missing", id))
}

#[test]
fn layout_prints_render_model() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);

    let model = stdout_json(&run(&["layout", "-i", &input]));
    assert_eq!(model["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(model["edges"].as_array().unwrap().len(), 2);
    assert_eq!(node(&model, "orders")["rect"]["x"], 0.0);
    assert_eq!(node(&model, "daily")["level"], 1);
}

#[test]
fn layout_writes_text_summary_to_file() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);
    let output_path = dir.path().join("view.txt");

    let output = run(&[
        "layout",
        "-i",
        &input,
        "-o",
        output_path.to_str().unwrap(),
        "--format",
        "text",
    ]);
    assert!(output.status.success());
    let text = std::fs::read_to_string(&output_path).unwrap();
    assert!(text.contains("Level 0"));
    assert!(text.contains("orders.amount -> daily.total"));
    assert!(!text.contains('\u{1b}'));
}

#[test]
fn page_size_flag_limits_rows() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);

    let model = stdout_json(&run(&["--page-size", "2", "layout", "-i", &input]));
    let orders = node(&model, "orders");
    assert_eq!(orders["rows"].as_array().unwrap().len(), 2);
    assert_eq!(orders["pageCount"], 2);
}

#[test]
fn levels_lists_groups() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);

    let output = run(&["levels", "-i", &input, "--json"]);
    let value = stdout_json(&output);
    assert_eq!(value["ingress"], "orders");
    assert_eq!(value["groups"][0]["level"], 0);
    assert_eq!(value["groups"][1]["nodes"][0], "daily");
}

#[test]
fn trace_prints_field_closure() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);

    let value = stdout_json(&run(&["trace", "-i", &input, "--field", "daily.total", "--json"]));
    let fields: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["daily.total", "orders.amount"]);
}

#[test]
fn trace_rejects_unknown_field() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);

    let output = run(&["trace", "-i", &input, "--field", "daily.nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown field"));
}

#[test]
fn replay_serves_loads_from_catalog() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);
    let catalog = write(&dir, "catalog.json", CATALOG);
    let script = write(
        &dir,
        "steps.txt",
        "# open the daily rollup\nexpand daily\nselect orders.amount\n",
    );

    let model = stdout_json(&run(&["replay", "-i", &input, "-s", &script, "-c", &catalog]));
    assert_eq!(node(&model, "by_region")["level"], 2);
    assert_eq!(node(&model, "daily")["busy"], false);

    let edges = model["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 3);
    let highlighted = edges.iter().filter(|e| e["highlighted"] == true).count();
    let dimmed = edges.iter().filter(|e| e["dimmed"] == true).count();
    assert_eq!(highlighted, 2);
    assert_eq!(dimmed, 1);
}

#[test]
fn replay_collapse_and_page() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);
    let script = write(&dir, "steps.txt", "page orders next\ncollapse orders\n");

    let model = stdout_json(&run(&["--page-size", "2", "replay", "-i", &input, "-s", &script]));
    assert_eq!(model["nodes"].as_array().unwrap().len(), 1);
    assert!(model["edges"].as_array().unwrap().is_empty());
    assert_eq!(node(&model, "orders")["pageOffset"], 1);
}

#[test]
fn replay_reports_bad_script_line() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);
    let script = write(&dir, "steps.txt", "expand orders\nfly daily\n");

    let output = run(&["replay", "-i", &input, "-s", &script]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 2"));
}

#[test]
fn replay_reports_command_on_hidden_node() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", DOCUMENT);
    let script = write(&dir, "steps.txt", "collapse orders\nexpand daily\n");

    let output = run(&["replay", "-i", &input, "-s", &script]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2: expand daily"));
}

#[test]
fn invalid_document_fails() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "graph.json", "{\"nodes\": []}");

    let output = run(&["layout", "-i", &input]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid graph document"));
}

#[test]
fn missing_input_file_fails() {
    let output = run(&["layout", "-i", Path::new("/nonexistent/graph.json").to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read input file"));
}
