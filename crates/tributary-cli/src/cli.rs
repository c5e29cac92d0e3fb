//! Command-line interface for the tributary utility
//!
//! Lays out lineage documents, prints level groups and field lineage, and
//! replays scripted user sessions against the interactive engine.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::script::{parse_script, ScriptCommand};
use crate::summary::render_summary;
use tributary::core::logging::init_logging;
use tributary::engine::{assign_levels, trace_field_lineage, GraphEngine, LoadQueue, LoadRequest};
use tributary::{
    parse_document, FieldRef, GraphDocument, LayoutConfig, LineageError, LoadError, Node,
};

/// Tributary - lay out interactive field-level data lineage
#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Lay out and replay interactive data lineage diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Field rows shown per page
    #[arg(long, default_value_t = 10)]
    pub page_size: usize,

    /// Vertical gap between nodes in a column
    #[arg(long, default_value_t = 24.0)]
    pub gutter: f64,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lay out a graph document and print the initial view
    Layout {
        /// Graph document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// When to use colors in text output
        #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
        color: ColorChoice,
    },

    /// Print the level of every node reachable from the ingress
    Levels {
        /// Graph document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print every field upstream and downstream of one field
    Trace {
        /// Graph document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Field to trace, written node.field
        #[arg(short, long)]
        field: String,

        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Apply a script of user commands and print the resulting view
    Replay {
        /// Graph document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Script with one command per line
        #[arg(short, long)]
        script: PathBuf,

        /// Nodes served to lazy loads (JSON array or graph document)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// When to use colors in text output
        #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
        color: ColorChoice,
    },
}

/// How views are printed
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Render model as JSON
    #[default]
    Json,
    /// Human-readable summary
    Text,
}

/// When to colorize output
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors if output is a terminal and NO_COLOR is not set
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Nodes(Vec<Node>),
    Document(GraphDocument),
}

impl CatalogFile {
    fn into_nodes(self) -> Vec<Node> {
        match self {
            CatalogFile::Nodes(nodes) => nodes,
            CatalogFile::Document(document) => document.nodes,
        }
    }
}

/// Main CLI application
pub struct TributaryApp {
    config: LayoutConfig,
}

impl TributaryApp {
    /// Create a new application instance with default settings
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    /// Create a new application instance with a layout config
    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over flags
        let log_level_str = std::env::var("TRIBUTARY_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("TRIBUTARY_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Tributary v{}", env!("CARGO_PKG_VERSION"));
        }

        self.config = self
            .config
            .clone()
            .with_page_size(cli.page_size)
            .with_gutter(cli.gutter);

        match cli.command {
            Commands::Layout {
                input,
                output,
                format,
                color,
            } => self.layout_command(input, output, format, color, cli.verbose),
            Commands::Levels { input, json } => self.levels_command(input, json),
            Commands::Trace { input, field, json } => self.trace_command(input, &field, json),
            Commands::Replay {
                input,
                script,
                catalog,
                output,
                format,
                color,
            } => self.replay_command(
                input,
                script,
                catalog,
                output,
                format,
                color,
                cli.verbose,
            ),
        }
    }

    fn load_engine(&self, content: &str, queue: Option<&LoadQueue>) -> Result<GraphEngine> {
        let document = parse_document(content)?;
        let mut engine = GraphEngine::with_config(self.config.clone())?;
        if let Some(queue) = queue {
            engine = engine.with_loader(queue.clone());
        }
        engine.load_document(document)?;
        Ok(engine)
    }

    /// Handle the layout command
    fn layout_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        format: OutputFormat,
        color: ColorChoice,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;

        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        let engine = self.load_engine(&content, None)?;
        let rendered = self.render(&engine, format, self.should_colorize(&output, color))?;
        self.write_output(output, &rendered)
    }

    /// Handle the levels command
    fn levels_command(&self, input: Option<PathBuf>, json: bool) -> Result<()> {
        let content = self.read_input(input)?;
        let document = parse_document(&content)?;
        let assignment = assign_levels(&document.nodes, &document.ingress, document.direction);
        if assignment.is_empty() {
            return Err(LineageError::unknown_node(&document.ingress).into());
        }

        if json {
            let groups: Vec<serde_json::Value> = assignment
                .groups
                .iter()
                .map(|group| {
                    serde_json::json!({
                        "level": group.level,
                        "nodes": group.nodes,
                    })
                })
                .collect();
            let value = serde_json::json!({
                "ingress": document.ingress,
                "direction": document.direction,
                "groups": groups,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            for group in &assignment.groups {
                let names: Vec<&str> = group.nodes.iter().map(|id| id.as_str()).collect();
                println!("{:>3}: {}", group.level, names.join(", "));
            }
        }
        Ok(())
    }

    /// Handle the trace command
    fn trace_command(&self, input: Option<PathBuf>, field: &str, json: bool) -> Result<()> {
        let (node_id, field_id) = field
            .rsplit_once('.')
            .ok_or_else(|| anyhow!("expected node.field, got '{}'", field))?;
        let selected = FieldRef::new(node_id, field_id);

        let content = self.read_input(input)?;
        let engine = self.load_engine(&content, None)?;
        let node = engine
            .node(&selected.node_id)
            .ok_or_else(|| LineageError::unknown_node(&selected.node_id))?;
        if node.field(&selected.field_id).is_none() {
            return Err(LineageError::unknown_field(&selected.node_id, &selected.field_id).into());
        }

        let mut lineage: Vec<FieldRef> = trace_field_lineage(engine.store(), &selected)
            .into_iter()
            .collect();
        lineage.sort();

        if json {
            let names: Vec<String> = lineage.iter().map(|f| f.to_string()).collect();
            println!("{}", serde_json::to_string_pretty(&names)?);
        } else {
            for field in &lineage {
                println!("{}", field);
            }
        }
        Ok(())
    }

    /// Handle the replay command
    #[allow(clippy::too_many_arguments)]
    fn replay_command(
        &self,
        input: Option<PathBuf>,
        script: PathBuf,
        catalog: Option<PathBuf>,
        output: Option<PathBuf>,
        format: OutputFormat,
        color: ColorChoice,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;
        let script_text = fs::read_to_string(&script)
            .map_err(|e| anyhow!("Failed to read script '{}': {}", script.display(), e))?;
        let steps = parse_script(&script_text)?;
        let catalog = match catalog {
            Some(path) => Some(self.read_catalog(path)?),
            None => None,
        };

        let queue = LoadQueue::new();
        let mut engine = self.load_engine(&content, Some(&queue))?;
        serve_loads(&mut engine, &queue, catalog.as_deref())?;

        for step in &steps {
            apply_command(&mut engine, &step.command)
                .with_context(|| format!("line {}: {}", step.line, step.command))?;
            let served = serve_loads(&mut engine, &queue, catalog.as_deref())?;
            if verbose {
                eprintln!(
                    "line {}: {} ({} visible, {} edges, {} loads)",
                    step.line,
                    step.command,
                    engine.store().visible_count(),
                    engine.edges().len(),
                    served
                );
            }
        }
        info!(steps = steps.len(), "Replay finished");

        let rendered = self.render(&engine, format, self.should_colorize(&output, color))?;
        self.write_output(output, &rendered)
    }

    fn render(&self, engine: &GraphEngine, format: OutputFormat, colorize: bool) -> Result<String> {
        let model = engine.render_model();
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&model)?),
            OutputFormat::Text => Ok(render_summary(&model, colorize)),
        }
    }

    fn read_catalog(&self, path: PathBuf) -> Result<Vec<Node>> {
        let content = fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read catalog '{}': {}", path.display(), e))?;
        let catalog: CatalogFile = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Invalid catalog '{}': {}", path.display(), e))?;
        Ok(catalog.into_nodes())
    }

    /// Determine if we should colorize the output based on color choice and output destination
    fn should_colorize(&self, output: &Option<PathBuf>, color: ColorChoice) -> bool {
        match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                if std::env::var("NO_COLOR").is_ok() {
                    return false;
                }
                match output {
                    None => crossterm::tty::IsTty::is_tty(&std::io::stdout()),
                    Some(ref p) if p.to_str() == Some("-") => {
                        crossterm::tty::IsTty::is_tty(&std::io::stdout())
                    }
                    Some(_) => false,
                }
            }
        }
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        let content = if content.is_empty() || content.ends_with('\n') {
            content.to_string()
        } else {
            format!("{}\n", content)
        };

        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                print!("{}", content);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

impl Default for TributaryApp {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_command(engine: &mut GraphEngine, command: &ScriptCommand) -> Result<()> {
    match command {
        ScriptCommand::Expand(id) => {
            let outcome = engine.expand_node(id)?;
            debug!(node_id = %id, ?outcome, "Expanded");
        }
        ScriptCommand::Collapse(id) => {
            let outcome = engine.collapse_node(id)?;
            debug!(node_id = %id, ?outcome, "Collapsed");
        }
        ScriptCommand::Page(id, delta) => {
            let outcome = engine.page_node(id, *delta)?;
            debug!(node_id = %id, ?outcome, "Paged");
        }
        ScriptCommand::Select(node_id, field_id) => {
            let highlighted = engine.select_field(node_id, field_id)?;
            debug!(node_id = %node_id, field_id = %field_id, highlighted, "Selected");
        }
        ScriptCommand::Clear => engine.clear_selection(),
    }
    Ok(())
}

/// Answer a load request from the catalog
///
/// The answer holds the catalog nodes among the requested node's relations.
fn answer_request(
    engine: &GraphEngine,
    request: &LoadRequest,
    catalog: Option<&[Node]>,
) -> std::result::Result<Vec<Node>, LoadError> {
    let catalog = catalog.ok_or_else(|| LoadError::new("no catalog to load from"))?;
    let wanted = match engine.node(&request.node_id) {
        Some(node) => node.relations(request.direction).clone(),
        None => return Err(LoadError::new(format!("unknown node {}", request.node_id))),
    };
    let nodes: Vec<Node> = catalog
        .iter()
        .filter(|node| wanted.contains(&node.id))
        .cloned()
        .collect();
    if nodes.is_empty() {
        return Err(LoadError::new(format!(
            "catalog has no relations of {}",
            request.node_id
        )));
    }
    Ok(nodes)
}

/// Serve queued loads until the engine stops asking
fn serve_loads(
    engine: &mut GraphEngine,
    queue: &LoadQueue,
    catalog: Option<&[Node]>,
) -> Result<usize> {
    let mut served = 0;
    loop {
        let requests = queue.take();
        if requests.is_empty() {
            return Ok(served);
        }
        for request in requests {
            let answer = answer_request(engine, &request, catalog);
            let outcome = engine.complete_load(&request.ticket, answer)?;
            debug!(ticket = %request.ticket, ?outcome, "Load served");
            served += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;
    use tributary::engine::LoadOutcome;
    use tributary::NodeId;

    const DOCUMENT: &str = r#"{
        "ingress": "a",
        "nodes": [
            {"id": "a", "childIds": ["b"], "fields": [{"id": "x"}]},
            {"id": "b", "parentIds": ["a"], "childIds": ["c"],
             "fields": [{"id": "y", "parentFields": [{"nodeId": "a", "fieldId": "x"}]}]}
        ]
    }"#;

    const CATALOG: &str = r#"[
        {"id": "c", "parentIds": ["b"],
         "fields": [{"id": "z", "parentFields": [{"nodeId": "b", "fieldId": "y"}]}]},
        {"id": "unrelated"}
    ]"#;

    #[test]
    fn test_cli_parsing_layout_command() {
        let args = vec![
            "tributary", "layout", "--input", "graph.json", "--output", "view.json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Layout {
                input,
                output,
                format,
                color,
            } => {
                assert_eq!(input.unwrap().to_string_lossy(), "graph.json");
                assert_eq!(output.unwrap().to_string_lossy(), "view.json");
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(color, ColorChoice::Auto);
            }
            _ => panic!("Expected Layout command"),
        }
        assert_eq!(cli.page_size, 10);
        assert_eq!(cli.gutter, 24.0);
    }

    #[test]
    fn test_cli_parsing_replay_command() {
        let args = vec![
            "tributary",
            "--page-size",
            "3",
            "replay",
            "-i",
            "graph.json",
            "-s",
            "steps.txt",
            "--catalog",
            "more.json",
            "--format",
            "text",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.page_size, 3);
        match cli.command {
            Commands::Replay {
                script,
                catalog,
                format,
                ..
            } => {
                assert_eq!(script.to_string_lossy(), "steps.txt");
                assert_eq!(catalog.unwrap().to_string_lossy(), "more.json");
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_cli_parsing_trace_requires_field() {
        assert!(Cli::try_parse_from(vec!["tributary", "trace", "-i", "g.json"]).is_err());
        let cli = Cli::try_parse_from(vec!["tributary", "trace", "--field", "a.x", "--json"]).unwrap();
        match cli.command {
            Commands::Trace { field, json, .. } => {
                assert_eq!(field, "a.x");
                assert!(json);
            }
            _ => panic!("Expected Trace command"),
        }
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::try_parse_from(vec!["tributary", "--verbose", "levels"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_read_input_from_file() {
        let app = TributaryApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("graph.json");
        fs::write(&file_path, DOCUMENT).unwrap();

        let content = app.read_input(Some(file_path)).unwrap();
        assert_eq!(content, DOCUMENT);
    }

    #[test]
    fn test_read_input_missing_file() {
        let app = TributaryApp::new();
        let err = app
            .read_input(Some(PathBuf::from("/nonexistent/graph.json")))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read input file"));
    }

    #[test]
    fn test_write_output_to_file() {
        let app = TributaryApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("view.txt");

        app.write_output(Some(file_path.clone()), "view").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "view\n");
    }

    #[test]
    fn test_catalog_accepts_array_and_document() {
        let app = TributaryApp::new();
        let dir = tempdir().unwrap();

        let array_path = dir.path().join("catalog.json");
        fs::write(&array_path, CATALOG).unwrap();
        assert_eq!(app.read_catalog(array_path).unwrap().len(), 2);

        let document_path = dir.path().join("document.json");
        fs::write(&document_path, DOCUMENT).unwrap();
        assert_eq!(app.read_catalog(document_path).unwrap().len(), 2);
    }

    #[test]
    fn test_loads_are_served_from_catalog() {
        let app = TributaryApp::new();
        let catalog: Vec<Node> = serde_json::from_str(CATALOG).unwrap();
        let queue = LoadQueue::new();
        let mut engine = app.load_engine(DOCUMENT, Some(&queue)).unwrap();
        assert_eq!(queue.pending(), 0);

        apply_command(&mut engine, &ScriptCommand::Expand(NodeId::from("b"))).unwrap();
        assert_eq!(queue.pending(), 1);
        assert_eq!(serve_loads(&mut engine, &queue, Some(&catalog)).unwrap(), 1);

        assert!(engine.store().is_visible(&NodeId::from("c")));
        assert!(engine.node(&NodeId::from("unrelated")).is_none());
        assert_eq!(engine.edges().len(), 2);
    }

    #[test]
    fn test_load_without_catalog_fails_and_reverts() {
        let app = TributaryApp::new();
        let queue = LoadQueue::new();
        let mut engine = app.load_engine(DOCUMENT, Some(&queue)).unwrap();

        apply_command(&mut engine, &ScriptCommand::Expand(NodeId::from("b"))).unwrap();
        let request = queue.take().remove(0);
        let answer = answer_request(&engine, &request, None);
        let outcome = engine.complete_load(&request.ticket, answer).unwrap();
        assert!(matches!(outcome, LoadOutcome::Failed { .. }));
        assert!(!engine.is_busy(&NodeId::from("b")));
        assert!(!engine.node(&NodeId::from("b")).unwrap().expanded);
    }

    #[test]
    fn test_unknown_node_command_fails() {
        let app = TributaryApp::new();
        let mut engine = app.load_engine(DOCUMENT, None).unwrap();
        assert!(apply_command(&mut engine, &ScriptCommand::Collapse(NodeId::from("zz"))).is_err());
    }

    #[test]
    fn test_app_default() {
        let app = TributaryApp::default();
        assert_eq!(app.config.page_size, 10);
    }
}
