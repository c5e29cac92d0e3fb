//! Lazy loading of relations
//!
//! Expanding a node whose relations are not loaded yet hands a
//! [`LoadRequest`] to the host's [`NodeLoader`]. The host answers later by
//! calling `GraphEngine::complete_load` with the request's ticket. A ticket
//! carries the engine epoch it was issued in, so answers arriving after a
//! teardown are recognised and dropped.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::core::{Direction, NodeId};

/// Handle identifying one outstanding load
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTicket {
    pub epoch: u64,
    pub serial: u64,
    pub node_id: NodeId,
}

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load-{}-{}({})", self.epoch, self.serial, self.node_id)
    }
}

/// Request for the relations of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub node_id: NodeId,
    pub direction: Direction,
}

/// Host collaborator that fetches more nodes
pub trait NodeLoader {
    /// Start fetching; the result must come back through `complete_load`
    fn load_more(&mut self, request: &LoadRequest);
}

/// Loader that never answers; every lazy expansion stays pending
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLoader;

impl NodeLoader for NoopLoader {
    fn load_more(&mut self, _request: &LoadRequest) {}
}

/// Loader that queues requests for the host to serve
///
/// Clones share the queue, so the host keeps one handle while the engine
/// owns another.
#[derive(Debug, Default, Clone)]
pub struct LoadQueue {
    requests: Rc<RefCell<VecDeque<LoadRequest>>>,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every queued request, oldest first
    pub fn take(&self) -> Vec<LoadRequest> {
        self.requests.borrow_mut().drain(..).collect()
    }

    /// Number of requests waiting to be served
    pub fn pending(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl NodeLoader for LoadQueue {
    fn load_more(&mut self, request: &LoadRequest) {
        self.requests.borrow_mut().push_back(request.clone());
    }
}
