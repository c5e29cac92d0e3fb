//! Level assignment relative to the ingress node
//!
//! Walks the relationship graph depth-first from the ingress along parent or
//! child links and gives every reachable node an integer level. A node seen
//! through several paths keeps the level of the first path that reached it.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, span, trace, Level};

use crate::core::{Direction, Node, NodeId};

/// Nodes sharing one level, in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelGroup {
    pub level: i32,
    pub nodes: Vec<NodeId>,
}

/// Output of the level walk
#[derive(Debug, Clone, Default)]
pub struct LevelAssignment {
    /// Level of every reachable node
    pub levels: HashMap<NodeId, i32>,
    /// Groups ordered left to right as rendered
    pub groups: Vec<LevelGroup>,
    /// Node that discovered each non-ingress node
    pub anchors: HashMap<NodeId, NodeId>,
}

impl LevelAssignment {
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_of(&self, id: &NodeId) -> Option<i32> {
        self.levels.get(id).copied()
    }

    pub fn anchor_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.anchors.get(id)
    }

    /// Groups ordered by distance from the ingress, ingress first
    pub fn groups_outward(&self) -> Vec<&LevelGroup> {
        let mut groups: Vec<&LevelGroup> = self.groups.iter().collect();
        groups.sort_by_key(|g| g.level.abs());
        groups
    }
}

/// Assign levels to every node reachable from `ingress`
///
/// Relations pointing at ids missing from `nodes` are skipped. If the ingress
/// itself is missing the assignment is empty.
pub fn assign_levels<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    ingress: &NodeId,
    direction: Direction,
) -> LevelAssignment {
    let walk_span = span!(Level::DEBUG, "assign_levels", ingress = %ingress, direction = %direction);
    let _enter = walk_span.enter();

    let by_id: HashMap<&NodeId, &Node> = nodes.into_iter().map(|n| (&n.id, n)).collect();
    if !by_id.contains_key(ingress) {
        debug!("Ingress not among supplied nodes, returning empty assignment");
        return LevelAssignment::default();
    }

    let mut levels: HashMap<NodeId, i32> = HashMap::new();
    let mut anchors: HashMap<NodeId, NodeId> = HashMap::new();
    let mut discovery: Vec<NodeId> = Vec::new();
    let mut visited: HashSet<&NodeId> = HashSet::new();

    // Stack entries are (node, level, discovering node); children are pushed
    // in reverse so pops follow the recursive pre-order.
    let mut stack: Vec<(&NodeId, i32, Option<&NodeId>)> = vec![(ingress, 0, None)];
    while let Some((id, level, anchor)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = by_id.get(id) else { continue };

        trace!(node_id = %id, level, "Assigned level");
        levels.insert(id.clone(), level);
        discovery.push(id.clone());
        if let Some(anchor) = anchor {
            anchors.insert(id.clone(), anchor.clone());
        }

        for next in node.relations(direction).iter().rev() {
            if visited.contains(next) {
                continue;
            }
            if !by_id.contains_key(next) {
                trace!(node_id = %id, missing = %next, "Skipping relation to unknown node");
                continue;
            }
            stack.push((next, level + direction.step(), Some(id)));
        }
    }

    // Distance from the ingress indexes the groups; ancestors read
    // farthest-first, so their order is reversed.
    let mut by_distance: BTreeMap<u32, LevelGroup> = BTreeMap::new();
    for id in discovery {
        let level = levels[&id];
        by_distance
            .entry(level.unsigned_abs())
            .or_insert_with(|| LevelGroup {
                level,
                nodes: Vec::new(),
            })
            .nodes
            .push(id);
    }
    let mut groups: Vec<LevelGroup> = by_distance.into_values().collect();
    if direction.is_reversed() {
        groups.reverse();
    }

    debug!(
        node_count = levels.len(),
        group_count = groups.len(),
        "Level assignment completed"
    );
    LevelAssignment {
        levels,
        groups,
        anchors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<Node> {
        vec![
            Node::new("a").with_child("b"),
            Node::new("b").with_parent("a").with_child("c"),
            Node::new("c").with_parent("b"),
        ]
    }

    #[test]
    fn test_descendant_levels() {
        let nodes = chain();
        let result = assign_levels(&nodes, &NodeId::from("a"), Direction::Descendants);
        assert_eq!(result.level_of(&"a".into()), Some(0));
        assert_eq!(result.level_of(&"b".into()), Some(1));
        assert_eq!(result.level_of(&"c".into()), Some(2));
        assert_eq!(result.groups[0].nodes, vec![NodeId::from("a")]);
        assert_eq!(result.groups[2].nodes, vec![NodeId::from("c")]);
    }

    #[test]
    fn test_ancestor_levels_read_farthest_first() {
        let nodes = chain();
        let result = assign_levels(&nodes, &NodeId::from("c"), Direction::Ancestors);
        assert_eq!(result.level_of(&"a".into()), Some(-2));
        assert_eq!(result.groups.len(), 3);
        assert_eq!(result.groups[0].level, -2);
        assert_eq!(result.groups[0].nodes, vec![NodeId::from("a")]);
        assert_eq!(result.groups[2].nodes, vec![NodeId::from("c")]);
    }

    #[test]
    fn test_missing_ingress_is_empty() {
        let nodes = chain();
        let result = assign_levels(&nodes, &NodeId::from("zzz"), Direction::Descendants);
        assert!(result.is_empty());
        assert!(result.groups.is_empty());
    }

    #[test]
    fn test_isolated_ingress_gets_singleton_group() {
        let nodes = vec![Node::new("solo")];
        let result = assign_levels(&nodes, &NodeId::from("solo"), Direction::Ancestors);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].level, 0);
        assert_eq!(result.groups[0].nodes, vec![NodeId::from("solo")]);
    }

    #[test]
    fn test_first_path_wins_on_diamond() {
        // a -> b -> d and a -> d: the depth-first walk reaches d via b first.
        let nodes = vec![
            Node::new("a").with_child("b").with_child("d"),
            Node::new("b").with_child("d"),
            Node::new("d"),
        ];
        let result = assign_levels(&nodes, &NodeId::from("a"), Direction::Descendants);
        assert_eq!(result.level_of(&"d".into()), Some(2));
        assert_eq!(result.anchor_of(&"d".into()), Some(&NodeId::from("b")));
    }

    #[test]
    fn test_cycle_terminates() {
        let nodes = vec![
            Node::new("a").with_child("b"),
            Node::new("b").with_child("a"),
        ];
        let result = assign_levels(&nodes, &NodeId::from("a"), Direction::Descendants);
        assert_eq!(result.levels.len(), 2);
        assert_eq!(result.level_of(&"a".into()), Some(0));
    }

    #[test]
    fn test_dangling_relation_skipped() {
        let nodes = vec![Node::new("a").with_child("ghost")];
        let result = assign_levels(&nodes, &NodeId::from("a"), Direction::Descendants);
        assert_eq!(result.levels.len(), 1);
        assert!(result.anchors.is_empty());
    }

    #[test]
    fn test_anchor_is_discovering_node() {
        let nodes = vec![
            Node::new("a").with_child("b").with_child("c"),
            Node::new("b"),
            Node::new("c"),
        ];
        let result = assign_levels(&nodes, &NodeId::from("a"), Direction::Descendants);
        assert_eq!(result.anchor_of(&"b".into()), Some(&NodeId::from("a")));
        assert_eq!(result.anchor_of(&"c".into()), Some(&NodeId::from("a")));
        assert_eq!(result.groups[1].nodes, vec![NodeId::from("b"), NodeId::from("c")]);
    }
}
