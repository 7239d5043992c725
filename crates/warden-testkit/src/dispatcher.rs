//! Event dispatchers for asserting on mutation events.

use parking_lot::Mutex;
use warden_core::Node;
use warden_model::{
    DispatchError, EventDispatcher, HolderIdentifier, NodeMapType, NodeMutation,
};

/// One event as seen by a [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    /// `node_added` was called.
    Added {
        /// Holder that changed.
        target: HolderIdentifier,
        /// Map that changed.
        map_type: NodeMapType,
        /// The added node.
        node: Node,
        /// Snapshot before the edit.
        before: Vec<Node>,
        /// Snapshot after the edit.
        after: Vec<Node>,
    },
    /// `node_removed` was called.
    Removed {
        /// Holder that changed.
        target: HolderIdentifier,
        /// Map that changed.
        map_type: NodeMapType,
        /// The removed node.
        node: Node,
        /// Snapshot before the edit.
        before: Vec<Node>,
        /// Snapshot after the edit.
        after: Vec<Node>,
    },
    /// `nodes_cleared` was called.
    Cleared {
        /// Holder that changed.
        target: HolderIdentifier,
        /// Map that changed.
        map_type: NodeMapType,
        /// Snapshot before the edit.
        before: Vec<Node>,
        /// Snapshot after the edit.
        after: Vec<Node>,
    },
}

impl RecordedEvent {
    /// `"added"`, `"removed"` or `"cleared"`.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordedEvent::Added { .. } => "added",
            RecordedEvent::Removed { .. } => "removed",
            RecordedEvent::Cleared { .. } => "cleared",
        }
    }

    /// The added or removed node.
    pub fn node(&self) -> Option<&Node> {
        match self {
            RecordedEvent::Added { node, .. } | RecordedEvent::Removed { node, .. } => Some(node),
            RecordedEvent::Cleared { .. } => None,
        }
    }

    /// Snapshot before the edit.
    pub fn before(&self) -> &[Node] {
        match self {
            RecordedEvent::Added { before, .. }
            | RecordedEvent::Removed { before, .. }
            | RecordedEvent::Cleared { before, .. } => before,
        }
    }

    /// Snapshot after the edit.
    pub fn after(&self) -> &[Node] {
        match self {
            RecordedEvent::Added { after, .. }
            | RecordedEvent::Removed { after, .. }
            | RecordedEvent::Cleared { after, .. } => after,
        }
    }
}

/// Dispatcher keeping every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingDispatcher {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in arrival order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Event kinds in arrival order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(RecordedEvent::kind).collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forget every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn node_added(&self, change: &NodeMutation<'_>, node: &Node) -> Result<(), DispatchError> {
        self.events.lock().push(RecordedEvent::Added {
            target: change.target.clone(),
            map_type: change.map_type,
            node: node.clone(),
            before: change.before.to_vec(),
            after: change.after.to_vec(),
        });
        Ok(())
    }

    fn node_removed(&self, change: &NodeMutation<'_>, node: &Node) -> Result<(), DispatchError> {
        self.events.lock().push(RecordedEvent::Removed {
            target: change.target.clone(),
            map_type: change.map_type,
            node: node.clone(),
            before: change.before.to_vec(),
            after: change.after.to_vec(),
        });
        Ok(())
    }

    fn nodes_cleared(&self, change: &NodeMutation<'_>) -> Result<(), DispatchError> {
        self.events.lock().push(RecordedEvent::Cleared {
            target: change.target.clone(),
            map_type: change.map_type,
            before: change.before.to_vec(),
            after: change.after.to_vec(),
        });
        Ok(())
    }
}

/// Dispatcher rejecting every event.
#[derive(Debug, Default)]
pub struct FailingDispatcher;

impl EventDispatcher for FailingDispatcher {
    fn node_added(&self, _change: &NodeMutation<'_>, _node: &Node) -> Result<(), DispatchError> {
        Err(DispatchError::rejected("node_added refused"))
    }

    fn node_removed(&self, _change: &NodeMutation<'_>, _node: &Node) -> Result<(), DispatchError> {
        Err(DispatchError::unavailable("receiver offline"))
    }

    fn nodes_cleared(&self, _change: &NodeMutation<'_>) -> Result<(), DispatchError> {
        Err(DispatchError::rejected("nodes_cleared refused"))
    }
}

/// Dispatcher panicking on every event.
#[derive(Debug, Default)]
pub struct PanickingDispatcher;

impl EventDispatcher for PanickingDispatcher {
    fn node_added(&self, _change: &NodeMutation<'_>, _node: &Node) -> Result<(), DispatchError> {
        panic!("node_added receiver bug")
    }

    fn node_removed(&self, _change: &NodeMutation<'_>, _node: &Node) -> Result<(), DispatchError> {
        panic!("node_removed receiver bug")
    }

    fn nodes_cleared(&self, _change: &NodeMutation<'_>) -> Result<(), DispatchError> {
        panic!("nodes_cleared receiver bug")
    }
}
