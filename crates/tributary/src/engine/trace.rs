//! Field lineage closure
//!
//! Selecting a field highlights everything it derives from and everything
//! derived from it. The closure is the union of an upstream walk over parent
//! references and a downstream walk over child references. Each walk keeps
//! its own visited set, so a field reached upstream can still be expanded
//! downstream.

use std::collections::{HashMap, HashSet};
use tracing::{debug, span, Level};

use super::store::NodeStore;
use crate::core::FieldRef;

/// Field adjacency in both directions, built from both declarations
#[derive(Debug, Default)]
struct FieldGraph {
    parents: HashMap<FieldRef, Vec<FieldRef>>,
    children: HashMap<FieldRef, Vec<FieldRef>>,
}

impl FieldGraph {
    fn build(store: &NodeStore) -> Self {
        let mut graph = Self::default();
        for node in store.nodes() {
            for field in &node.fields {
                let here = FieldRef::new(node.id.clone(), field.id.clone());
                for parent in &field.parent_fields {
                    graph.link(parent.clone(), here.clone());
                }
                for child in &field.child_fields {
                    graph.link(here.clone(), child.clone());
                }
            }
        }
        graph
    }

    fn link(&mut self, upstream: FieldRef, downstream: FieldRef) {
        let children = self.children.entry(upstream.clone()).or_default();
        if !children.contains(&downstream) {
            children.push(downstream.clone());
        }
        let parents = self.parents.entry(downstream).or_default();
        if !parents.contains(&upstream) {
            parents.push(upstream);
        }
    }

    fn walk(
        adjacency: &HashMap<FieldRef, Vec<FieldRef>>,
        start: &FieldRef,
        out: &mut HashSet<FieldRef>,
    ) {
        let mut visited: HashSet<&FieldRef> = HashSet::new();
        let mut stack: Vec<&FieldRef> = vec![start];
        while let Some(field) = stack.pop() {
            if !visited.insert(field) {
                continue;
            }
            out.insert(field.clone());
            if let Some(next) = adjacency.get(field) {
                stack.extend(next.iter().filter(|f| !visited.contains(f)));
            }
        }
    }
}

/// Every field connected to `selected` through lineage, `selected` included
///
/// References to fields the store does not know are still followed as far
/// as the known data allows; they simply have no further neighbours.
pub fn trace_field_lineage(store: &NodeStore, selected: &FieldRef) -> HashSet<FieldRef> {
    let trace_span = span!(Level::DEBUG, "trace_field_lineage", field = %selected);
    let _enter = trace_span.enter();

    let graph = FieldGraph::build(store);
    let mut closure = HashSet::new();
    FieldGraph::walk(&graph.parents, selected, &mut closure);
    FieldGraph::walk(&graph.children, selected, &mut closure);

    debug!(closure_size = closure.len(), "Traced field lineage");
    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Field, Node};

    fn chain_store() -> NodeStore {
        let mut store = NodeStore::new();
        store.insert(
            Node::new("a")
                .with_field(Field::new("x").with_child(FieldRef::new("b", "y")))
                .with_field(Field::new("other")),
        );
        store.insert(
            Node::new("b")
                .with_field(Field::new("y").with_parent(FieldRef::new("a", "x")))
                .with_field(Field::new("sibling").with_parent(FieldRef::new("a", "other"))),
        );
        store.insert(Node::new("c").with_field(Field::new("z").with_parent(FieldRef::new("b", "y"))));
        store
    }

    #[test]
    fn test_closure_of_middle_field() {
        let store = chain_store();
        let closure = trace_field_lineage(&store, &FieldRef::new("b", "y"));
        let expected: HashSet<FieldRef> = [
            FieldRef::new("a", "x"),
            FieldRef::new("b", "y"),
            FieldRef::new("c", "z"),
        ]
        .into_iter()
        .collect();
        assert_eq!(closure, expected);
    }

    #[test]
    fn test_walks_do_not_cross_branches() {
        // The upstream walk never turns back downstream.
        let store = chain_store();
        let closure = trace_field_lineage(&store, &FieldRef::new("c", "z"));
        assert!(!closure.contains(&FieldRef::new("a", "other")));
        assert!(!closure.contains(&FieldRef::new("b", "sibling")));
        assert_eq!(closure.len(), 3);
    }

    #[test]
    fn test_one_sided_declaration_is_honored() {
        let mut store = NodeStore::new();
        store.insert(Node::new("a").with_field(Field::new("x").with_child(FieldRef::new("b", "y"))));
        store.insert(Node::new("b").with_field(Field::new("y")));
        let closure = trace_field_lineage(&store, &FieldRef::new("b", "y"));
        assert!(closure.contains(&FieldRef::new("a", "x")));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut store = NodeStore::new();
        store.insert(Node::new("a").with_field(Field::new("x").with_child(FieldRef::new("b", "y"))));
        store.insert(Node::new("b").with_field(Field::new("y").with_child(FieldRef::new("a", "x"))));
        let closure = trace_field_lineage(&store, &FieldRef::new("a", "x"));
        assert_eq!(closure.len(), 2);
    }

    #[test]
    fn test_isolated_field_is_its_own_closure() {
        let store = chain_store();
        let closure = trace_field_lineage(&store, &FieldRef::new("c", "missing"));
        assert_eq!(closure.len(), 1);
    }
}
