//! Human-readable view summaries
//!
//! Prints a render model column by column, with ANSI colors from crossterm
//! when the caller asks for them.

use crossterm::style::{Color, Stylize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use tributary::engine::{RenderEdge, RenderModel, RenderNode};

fn paint(text: &str, color: Color, colorize: bool) -> String {
    if colorize {
        format!("{}", text.with(color))
    } else {
        text.to_string()
    }
}

fn node_line(node: &RenderNode, colorize: bool) -> String {
    let marker = if node.expanded { "▾" } else { "▸" };
    let mut line = format!(
        "  {} {} ({})",
        marker,
        paint(&node.label, Color::Cyan, colorize),
        node.kind
    );
    if node.page_count > 1 {
        let _ = write!(line, " page {}/{}", node.page_offset + 1, node.page_count);
    }
    if node.busy {
        let _ = write!(line, " {}", paint("loading", Color::Yellow, colorize));
    }
    let _ = write!(
        line,
        " at ({}, {}) {}x{}",
        node.rect.x, node.rect.y, node.rect.width, node.rect.height
    );
    line
}

fn edge_line(edge: &RenderEdge, colorize: bool) -> String {
    let text = format!("  {} -> {}", edge.source, edge.target);
    if edge.highlighted {
        paint(&text, Color::Green, colorize)
    } else if edge.dimmed {
        paint(&text, Color::DarkGrey, colorize)
    } else {
        text
    }
}

/// Render a model as text, one section per level
pub fn render_summary(model: &RenderModel, colorize: bool) -> String {
    let mut out = String::new();
    if model.is_empty() {
        out.push_str("(empty view)\n");
        return out;
    }

    let mut levels: BTreeMap<i32, Vec<&RenderNode>> = BTreeMap::new();
    for node in &model.nodes {
        levels.entry(node.level).or_default().push(node);
    }
    for (level, mut nodes) in levels {
        nodes.sort_by(|a, b| a.rect.y.total_cmp(&b.rect.y));
        let _ = writeln!(out, "{}", paint(&format!("Level {}", level), Color::Blue, colorize));
        for node in nodes {
            let _ = writeln!(out, "{}", node_line(node, colorize));
            for row in &node.rows {
                let _ = writeln!(out, "      {}", row.label);
            }
        }
    }

    if !model.edges.is_empty() {
        let _ = writeln!(out, "{}", paint("Edges", Color::Blue, colorize));
        let mut edges: Vec<&RenderEdge> = model.edges.iter().collect();
        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        for edge in edges {
            let _ = writeln!(out, "{}", edge_line(edge, colorize));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary::layout_json;

    const DOCUMENT: &str = r#"{
        "ingress": "a",
        "nodes": [
            {"id": "a", "label": "Orders", "childIds": ["b"], "fields": [{"id": "x", "label": "amount"}]},
            {"id": "b", "parentIds": ["a"], "fields": [{"id": "y", "parentFields": [{"nodeId": "a", "fieldId": "x"}]}]}
        ]
    }"#;

    #[test]
    fn test_plain_summary() {
        let model = layout_json(DOCUMENT).unwrap();
        let text = render_summary(&model, false);
        assert!(text.contains("Level 0"));
        assert!(text.contains("Level 1"));
        assert!(text.contains("▾ Orders (physical-table)"));
        assert!(text.contains("      amount"));
        assert!(text.contains("a.x -> b.y"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_colored_summary_has_escapes() {
        let model = layout_json(DOCUMENT).unwrap();
        let text = render_summary(&model, true);
        assert!(text.contains('\u{1b}'));
    }

    #[test]
    fn test_empty_view() {
        let model = RenderModel::default();
        assert_eq!(render_summary(&model, false), "(empty view)\n");
    }
}
