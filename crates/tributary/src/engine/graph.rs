//! Interactive lineage view
//!
//! [`GraphEngine`] owns the node store and the port and edge registries of
//! one view and exposes the user commands: expand, collapse, page, select.
//! Every command finishes its registry mutations before recomputing
//! geometry, and re-applies the current selection before returning.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, span, trace, warn, Level};

use super::edges::{EdgeId, EdgeRegistry};
use super::events::GraphEvent;
use super::layout::LayoutEngine;
use super::levels::assign_levels;
use super::loader::{LoadRequest, LoadTicket, NodeLoader, NoopLoader};
use super::ports::PortRegistry;
use super::relations::{RefreshReport, RelationResolver};
use super::removed::{RemovedNode, RemovedNodeCache};
use super::render_model::RenderModel;
use super::store::{NodeStore, Placement};
use crate::core::{
    Direction, FieldId, FieldRef, GraphDocument, LayoutConfig, LineageError, LoadError, Node,
    NodeId, Result,
};

/// Result of an expand command
#[derive(Debug, Clone, PartialEq)]
pub enum ExpandOutcome {
    /// Relations already in the store were shown
    Wired { shown: Vec<NodeId> },
    /// The loader was asked for missing relations
    Pending(LoadTicket),
    /// A load for this node is in flight; nothing changed
    Busy,
    /// Already expanded with every relation visible
    Unchanged,
}

/// Result of a collapse command
#[derive(Debug, Clone, PartialEq)]
pub enum CollapseOutcome {
    Collapsed { removed: Vec<NodeId> },
    Busy,
    Unchanged,
}

/// Result of a page command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Paged { offset: usize },
    /// Already on the first or last page
    Unchanged,
}

/// Result of delivering a load answer
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Merged {
        node_id: NodeId,
        added: Vec<NodeId>,
        shown: Vec<NodeId>,
    },
    /// The expand was reverted
    Failed { node_id: NodeId, reason: LoadError },
    /// The ticket is stale or was cancelled
    Discarded,
}

#[derive(Debug, Clone)]
struct PendingLoad {
    ticket: LoadTicket,
    /// The expand flipped `expanded`; a failure flips it back
    toggled: bool,
}

/// One interactive lineage view
pub struct GraphEngine {
    layout: LayoutEngine,
    direction: Direction,
    ingress: Option<NodeId>,
    store: NodeStore,
    ports: PortRegistry,
    edges: EdgeRegistry,
    removed: RemovedNodeCache,
    loader: Box<dyn NodeLoader>,
    pending: HashMap<NodeId, PendingLoad>,
    epoch: u64,
    next_serial: u64,
    selection: Option<FieldRef>,
    events: Vec<GraphEvent>,
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("direction", &self.direction)
            .field("ingress", &self.ingress)
            .field("nodes", &self.store.node_count())
            .field("visible", &self.store.visible_count())
            .field("ports", &self.ports.len())
            .field("edges", &self.edges.len())
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl GraphEngine {
    pub fn new() -> Self {
        Self {
            layout: LayoutEngine::new(),
            direction: Direction::default(),
            ingress: None,
            store: NodeStore::new(),
            ports: PortRegistry::new(),
            edges: EdgeRegistry::new(),
            removed: RemovedNodeCache::new(),
            loader: Box::new(NoopLoader),
            pending: HashMap::new(),
            epoch: 0,
            next_serial: 0,
            selection: None,
            events: Vec::new(),
        }
    }

    /// Create an engine with a validated layout configuration
    pub fn with_config(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            layout: LayoutEngine::with_config(config),
            ..Self::new()
        })
    }

    /// Use `loader` for lazy expansion
    pub fn with_loader(mut self, loader: impl NodeLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        self.layout.config()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn ingress(&self) -> Option<&NodeId> {
        self.ingress.as_ref()
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    pub fn edges(&self) -> &EdgeRegistry {
        &self.edges
    }

    pub fn removed_cache(&self) -> &RemovedNodeCache {
        &self.removed
    }

    pub fn selection(&self) -> Option<&FieldRef> {
        self.selection.as_ref()
    }

    /// True while a lazy load for the node is in flight
    pub fn is_busy(&self, id: &NodeId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.store.get(id)
    }

    /// Load a fresh view, discarding any previous state
    ///
    /// Every node reachable from `ingress` is shown. Supplied nodes that are
    /// not reachable stay loaded but hidden. An ingress missing from `nodes`
    /// yields an empty view.
    pub fn load_initial_graph(
        &mut self,
        nodes: Vec<Node>,
        ingress: impl Into<NodeId>,
        direction: Direction,
    ) -> Result<()> {
        let ingress = ingress.into();
        let load_span = span!(Level::INFO, "load_initial_graph", ingress = %ingress, %direction);
        let _enter = load_span.enter();

        self.reset();
        self.direction = direction;
        self.ingress = Some(ingress.clone());

        let supplied = nodes.len();
        for mut node in nodes {
            node.level = 0;
            node.page_offset = 0;
            self.store.insert(node);
        }

        let assignment = assign_levels(self.store.nodes(), &ingress, direction);
        if assignment.is_empty() {
            warn!(supplied, "Ingress not found, view is empty");
            return Ok(());
        }

        let anchors: HashSet<&NodeId> = assignment.anchors.values().collect();
        for (id, level) in &assignment.levels {
            if let Some(node) = self.store.get_mut(id) {
                node.level = *level;
                if id == &ingress || anchors.contains(id) {
                    node.expanded = true;
                }
            }
        }

        let mut placements: Vec<(NodeId, Placement)> = self
            .layout
            .layout_initial(&assignment, &self.store)
            .into_iter()
            .collect();
        placements.sort_by_key(|(id, _)| self.store.get(id).map(|n| n.index));
        for (id, placement) in placements {
            self.events.push(GraphEvent::NodeAdded {
                node_id: id.clone(),
                rect: placement.rect,
            });
            self.store.place(&id, placement);
        }

        let visible: Vec<NodeId> = self.store.visible_nodes().map(|n| n.id.clone()).collect();
        for id in &visible {
            self.refresh(id);
        }

        info!(
            supplied,
            visible = self.store.visible_count(),
            edges = self.edges.len(),
            "Initial graph loaded"
        );
        Ok(())
    }

    /// Load a view from a parsed graph document
    pub fn load_document(&mut self, document: GraphDocument) -> Result<()> {
        self.load_initial_graph(document.nodes, document.ingress, document.direction)
    }

    /// Show the relations of a node along the view direction
    ///
    /// Relations already in the store are shown at once, restored from the
    /// removed-node cache where possible. Relations the store does not know
    /// are requested from the loader and the node stays busy until
    /// [`GraphEngine::complete_load`] delivers them.
    pub fn expand_node(&mut self, id: &NodeId) -> Result<ExpandOutcome> {
        let expand_span = span!(Level::INFO, "expand_node", node_id = %id);
        let _enter = expand_span.enter();

        let node = self.visible_node(id)?;
        if self.pending.contains_key(id) {
            debug!("Node is busy, ignoring expand");
            return Ok(ExpandOutcome::Busy);
        }

        let was_expanded = node.expanded;
        let missing = self.store.missing_relations(id, self.direction);
        let all_shown = self
            .store
            .known_relations(id, self.direction)
            .iter()
            .all(|r| self.store.is_visible(r));
        if was_expanded && missing.is_empty() && all_shown {
            return Ok(ExpandOutcome::Unchanged);
        }

        if !was_expanded {
            if let Some(node) = self.store.get_mut(id) {
                node.expanded = true;
            }
            self.apply_height_change(id);
        }

        let shown = self.wire_relations(id);

        if !missing.is_empty() {
            let ticket = LoadTicket {
                epoch: self.epoch,
                serial: self.next_serial,
                node_id: id.clone(),
            };
            self.next_serial += 1;
            debug!(ticket = %ticket, missing = missing.len(), "Requesting relations from loader");
            self.pending.insert(
                id.clone(),
                PendingLoad {
                    ticket: ticket.clone(),
                    toggled: !was_expanded,
                },
            );
            self.loader.load_more(&LoadRequest {
                ticket: ticket.clone(),
                node_id: id.clone(),
                direction: self.direction,
            });
            self.restyle();
            return Ok(ExpandOutcome::Pending(ticket));
        }

        self.restyle();
        info!(shown = shown.len(), "Node expanded");
        Ok(ExpandOutcome::Wired { shown })
    }

    /// Deliver the answer to a load request
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: std::result::Result<Vec<Node>, LoadError>,
    ) -> Result<LoadOutcome> {
        let load_span = span!(Level::INFO, "complete_load", ticket = %ticket);
        let _enter = load_span.enter();

        if ticket.epoch != self.epoch {
            debug!(current_epoch = self.epoch, "Discarding answer from an earlier view");
            return Ok(LoadOutcome::Discarded);
        }
        let pending = match self.pending.get(&ticket.node_id) {
            Some(pending) if &pending.ticket == ticket => pending.clone(),
            _ => {
                debug!("Discarding answer to a cancelled request");
                return Ok(LoadOutcome::Discarded);
            }
        };
        self.pending.remove(&ticket.node_id);
        let node_id = ticket.node_id.clone();

        match result {
            Err(reason) => {
                warn!(node_id = %node_id, error = %reason, "Load failed, reverting expand");
                if pending.toggled {
                    // Relations already shown by the expand go back with it.
                    let removed = self.fold(&node_id);
                    debug!(removed = removed.len(), "Expand reverted");
                    self.restyle();
                }
                Ok(LoadOutcome::Failed { node_id, reason })
            }
            Ok(nodes) => {
                let mut added = Vec::new();
                for node in nodes {
                    let id = node.id.clone();
                    if self.store.insert(node) {
                        added.push(id);
                    }
                }
                let shown = if self.store.is_visible(&node_id) {
                    self.wire_relations(&node_id)
                } else {
                    Vec::new()
                };
                self.restyle();
                info!(added = added.len(), shown = shown.len(), "Load merged");
                Ok(LoadOutcome::Merged {
                    node_id,
                    added,
                    shown,
                })
            }
        }
    }

    /// Hide everything shown only through this node
    ///
    /// The set of nodes to hide is decided before anything is mutated: a
    /// node reachable from `id` is hidden when every visible node pointing
    /// at it is `id` or is hidden too. The ingress is never hidden.
    pub fn collapse_node(&mut self, id: &NodeId) -> Result<CollapseOutcome> {
        let collapse_span = span!(Level::INFO, "collapse_node", node_id = %id);
        let _enter = collapse_span.enter();

        let node = self.visible_node(id)?;
        if self.pending.contains_key(id) {
            debug!("Node is busy, ignoring collapse");
            return Ok(CollapseOutcome::Busy);
        }
        if !node.expanded {
            return Ok(CollapseOutcome::Unchanged);
        }

        let removal = self.fold(id);
        self.restyle();

        info!(removed = removal.len(), "Node collapsed");
        Ok(CollapseOutcome::Collapsed { removed: removal })
    }

    /// Move a node's field window one page forward (`+1`) or back (`-1`)
    pub fn page_node(&mut self, id: &NodeId, delta: i32) -> Result<PageOutcome> {
        let page_span = span!(Level::INFO, "page_node", node_id = %id, delta);
        let _enter = page_span.enter();

        if delta != 1 && delta != -1 {
            return Err(LineageError::InvalidPageDelta { delta });
        }
        let node = self.visible_node(id)?;
        let last = node.page_count(self.layout.config().page_size) - 1;
        let target = if delta > 0 {
            (node.page_offset + 1).min(last)
        } else {
            node.page_offset.saturating_sub(1)
        };
        if target == node.page_offset {
            return Ok(PageOutcome::Unchanged);
        }

        if let Some(node) = self.store.get_mut(id) {
            node.page_offset = target;
        }
        self.apply_height_change(id);
        self.refresh(id);
        self.restyle();

        debug!(offset = target, "Node paged");
        Ok(PageOutcome::Paged { offset: target })
    }

    /// Highlight the lineage of one field; returns the number of highlighted edges
    pub fn select_field(&mut self, node_id: &NodeId, field_id: &FieldId) -> Result<usize> {
        let select_span = span!(Level::INFO, "select_field", node_id = %node_id, field_id = %field_id);
        let _enter = select_span.enter();

        let node = self
            .store
            .get(node_id)
            .ok_or_else(|| LineageError::unknown_node(node_id))?;
        if node.field(field_id).is_none() {
            return Err(LineageError::unknown_field(node_id, field_id));
        }
        self.selection = Some(FieldRef::new(node_id.clone(), field_id.clone()));
        Ok(self.restyle())
    }

    pub fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            debug!("Selection cleared");
            self.edges.clear_highlight();
            self.events.push(GraphEvent::EdgesRestyled { highlighted: 0 });
        }
    }

    /// Drop the whole view; answers to outstanding loads will be discarded
    pub fn teardown(&mut self) {
        info!(epoch = self.epoch, "Tearing down view");
        self.reset();
        self.ingress = None;
    }

    pub fn render_model(&self) -> RenderModel {
        let busy: HashSet<NodeId> = self.pending.keys().cloned().collect();
        RenderModel::build(&self.store, &self.ports, &self.edges, &self.layout, &busy)
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.store.clear();
        self.ports.clear();
        self.edges.clear();
        self.removed.clear();
        self.pending.clear();
        self.selection = None;
        self.events.clear();
    }

    fn visible_node(&self, id: &NodeId) -> Result<&Node> {
        let node = self
            .store
            .get(id)
            .ok_or_else(|| LineageError::unknown_node(id))?;
        if !self.store.is_visible(id) {
            return Err(LineageError::not_visible(id));
        }
        Ok(node)
    }

    /// Re-wire the edges around a node and record the changes
    fn refresh(&mut self, id: &NodeId) -> RefreshReport {
        let report = RelationResolver::new(&self.store, &self.layout).refresh(
            id,
            &mut self.ports,
            &mut self.edges,
        );
        self.record_edges(&report);
        report
    }

    fn record_edges(&mut self, report: &RefreshReport) {
        let events = report
            .added
            .iter()
            .map(|&edge_id| GraphEvent::EdgeAdded { edge_id })
            .chain(report.updated.iter().map(|&edge_id| GraphEvent::EdgeUpdated { edge_id }))
            .chain(report.removed.iter().map(|&edge_id| GraphEvent::EdgeRemoved { edge_id }));
        self.events.extend(events);
    }

    /// Re-apply the current selection to every edge
    fn restyle(&mut self) -> usize {
        let Some(selected) = &self.selection else {
            return 0;
        };
        let closure = super::trace::trace_field_lineage(&self.store, selected);
        let highlighted = self.edges.set_highlighted(&closure);
        self.events.push(GraphEvent::EdgesRestyled { highlighted });
        highlighted
    }

    /// Resize a node in place and shift the nodes below it in its column
    fn apply_height_change(&mut self, id: &NodeId) {
        let (Some(node), Some(rect)) = (self.store.get(id), self.store.rect(id)) else {
            return;
        };
        let level = node.level;
        let height = self.layout.height_of(node);
        let delta = height - rect.height;
        if delta == 0.0 {
            return;
        }
        trace!(node_id = %id, from = rect.height, to = height, "Resizing node");

        let mut resized = rect;
        resized.height = height;
        self.store.set_rect(id, resized);
        self.events.push(GraphEvent::NodeResized {
            node_id: id.clone(),
            rect: resized,
        });

        for (other, mut other_rect) in self.store.column(level) {
            if &other == id || other_rect.y <= rect.y {
                continue;
            }
            other_rect.y += delta;
            self.store.set_rect(&other, other_rect);
            self.events.push(GraphEvent::NodeMoved {
                node_id: other,
                rect: other_rect,
            });
        }
    }

    /// Show the hidden known relations of `id`, then those of every shown
    /// node that is itself expanded
    fn wire_relations(&mut self, id: &NodeId) -> Vec<NodeId> {
        let mut shown = Vec::new();
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(current) = queue.pop_front() {
            for placed in self.show_relations(&current) {
                if self.store.get(&placed).is_some_and(|n| n.expanded) {
                    queue.push_back(placed.clone());
                }
                shown.push(placed);
            }
        }

        for placed in &shown {
            self.refresh(placed);
        }
        self.refresh(id);
        shown
    }

    /// Place the hidden relations of one visible node next to it
    fn show_relations(&mut self, id: &NodeId) -> Vec<NodeId> {
        let (Some(anchor), Some(node)) = (self.store.rect(id), self.store.get(id)) else {
            return Vec::new();
        };
        let level = node.level + self.direction.step();
        let hidden: Vec<NodeId> = self
            .store
            .known_relations(id, self.direction)
            .into_iter()
            .filter(|r| !self.store.is_visible(r))
            .collect();
        if hidden.is_empty() {
            return hidden;
        }

        let mut pinned = HashMap::new();
        for related in &hidden {
            let cached = self.removed.take(related);
            let Some(node) = self.store.get_mut(related) else {
                continue;
            };
            match cached {
                Some(snapshot) => {
                    trace!(node_id = %related, "Restoring node from cache");
                    node.level = snapshot.level;
                    node.expanded = snapshot.node.expanded;
                    node.page_offset = snapshot.node.page_offset;
                    pinned.insert(related.clone(), snapshot.rect);
                }
                None => node.level = level,
            }
        }

        let members: Vec<&Node> = hidden.iter().filter_map(|r| self.store.get(r)).collect();
        let placed = self.layout.place_group(&members, &anchor, level, &pinned);
        for (node_id, rect) in placed {
            self.events.push(GraphEvent::NodeAdded {
                node_id: node_id.clone(),
                rect,
            });
            self.store.place(
                &node_id,
                Placement {
                    rect,
                    anchor: Some(id.clone()),
                },
            );
        }

        let column = self.store.column(level);
        for (node_id, rect) in self.layout.restack(&column) {
            self.store.set_rect(&node_id, rect);
            self.events.push(GraphEvent::NodeMoved { node_id, rect });
        }
        debug!(node_id = %id, shown = hidden.len(), level, "Relations shown");
        hidden
    }

    /// Hide the removal set of `id` and mark it collapsed
    fn fold(&mut self, id: &NodeId) -> Vec<NodeId> {
        let removal = self.removal_set(id);
        debug!(removed = removal.len(), "Decided removal set");

        for removed_id in &removal {
            self.hide_node(removed_id);
        }
        if let Some(node) = self.store.get_mut(id) {
            node.expanded = false;
        }
        self.apply_height_change(id);
        self.refresh(id);
        removal
    }

    /// Visible nodes that hide when `id` collapses, in discovery order
    fn removal_set(&self, id: &NodeId) -> Vec<NodeId> {
        let ingress = self.ingress.as_ref();

        let mut reachable: Vec<NodeId> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::from([id.clone()]);
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(current) = queue.pop_front() {
            for next in self.store.known_relations(&current, self.direction) {
                if self.store.is_visible(&next) && seen.insert(next.clone()) {
                    queue.push_back(next.clone());
                    if Some(&next) != ingress {
                        reachable.push(next);
                    }
                }
            }
        }

        // Shrink to the greatest set whose members are only referenced from
        // inside it, so cycles below the collapsed node hide as a whole.
        let mut removal: HashSet<NodeId> = reachable.iter().cloned().collect();
        loop {
            let retained: Vec<NodeId> = removal
                .iter()
                .filter(|candidate| {
                    self.store
                        .visible_referrers(candidate, self.direction)
                        .iter()
                        .any(|r| r != id && !removal.contains(r))
                })
                .cloned()
                .collect();
            if retained.is_empty() {
                break;
            }
            for keep in retained {
                trace!(node_id = %keep, "Kept visible by another referrer");
                removal.remove(&keep);
            }
        }

        reachable.retain(|n| removal.contains(n));
        reachable
    }

    /// Hide one node: cache its state, drop its edges and ports
    fn hide_node(&mut self, id: &NodeId) {
        let mut dropped: Vec<EdgeId> = Vec::new();
        for port in self.ports.ports_of(id) {
            dropped.extend(self.edges.remove_edges_for_port(port, &mut self.ports));
        }
        for port in self.ports.ports_of(id) {
            self.edges.release_unreferenced_port(port, &mut self.ports);
        }
        self.events
            .extend(dropped.into_iter().map(|edge_id| GraphEvent::EdgeRemoved { edge_id }));

        if let Some(cancelled) = self.pending.remove(id) {
            debug!(ticket = %cancelled.ticket, "Cancelling load of hidden node");
            if cancelled.toggled {
                if let Some(node) = self.store.get_mut(id) {
                    node.expanded = false;
                }
            }
        }

        let Some(placement) = self.store.hide(id) else {
            return;
        };
        if let Some(node) = self.store.get(id) {
            let mut rect = placement.rect;
            rect.height = self.layout.height_of(node);
            self.removed.remember(RemovedNode {
                node: node.clone(),
                rect,
                level: node.level,
                anchor: placement.anchor,
            });
        }
        self.events.push(GraphEvent::NodeRemoved {
            node_id: id.clone(),
        });
    }
}
