//! Mutation notifications.
//!
//! Holders call the [`EventDispatcher`] synchronously after every committed
//! node mutation and [`StateListener`]s after every cache invalidation.
//! Failures and panics raised by either are caught and logged; they never
//! undo or abort the mutation that triggered them.

use crate::identifier::HolderIdentifier;
use crate::nodemap::NodeMapType;
use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;
use warden_core::Node;

/// Error returned by an event dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The receiver refused the event.
    #[error("event rejected: {message}")]
    Rejected {
        /// Why the event was refused
        message: String,
    },

    /// The receiver could not be reached.
    #[error("event receiver unavailable: {message}")]
    Unavailable {
        /// What was unavailable
        message: String,
    },
}

impl DispatchError {
    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create an unavailability error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// The state of one node map on either side of a mutation.
#[derive(Debug, Clone, Copy)]
pub struct NodeMutation<'a> {
    /// Holder whose nodes changed.
    pub target: &'a HolderIdentifier,
    /// Which of the holder's maps changed.
    pub map_type: NodeMapType,
    /// Nodes of the map before the mutation.
    pub before: &'a [Node],
    /// Nodes of the map after the mutation.
    pub after: &'a [Node],
}

/// Receiver of node mutation events.
pub trait EventDispatcher: Send + Sync + Debug {
    /// A node was added.
    fn node_added(&self, change: &NodeMutation<'_>, node: &Node) -> Result<(), DispatchError>;

    /// A node was removed.
    fn node_removed(&self, change: &NodeMutation<'_>, node: &Node) -> Result<(), DispatchError>;

    /// Several nodes were removed in one bulk operation.
    fn nodes_cleared(&self, change: &NodeMutation<'_>) -> Result<(), DispatchError>;
}

/// Dispatcher that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl EventDispatcher for NoopDispatcher {
    fn node_added(&self, _change: &NodeMutation<'_>, _node: &Node) -> Result<(), DispatchError> {
        Ok(())
    }

    fn node_removed(&self, _change: &NodeMutation<'_>, _node: &Node) -> Result<(), DispatchError> {
        Ok(())
    }

    fn nodes_cleared(&self, _change: &NodeMutation<'_>) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Observer of holder state changes.
pub trait StateListener: Send + Sync {
    /// Called after the holder's nodes or derived caches changed.
    fn on_state_change(&self, holder: &HolderIdentifier);
}

/// Run a dispatcher call, logging its failure or panic.
pub(crate) fn dispatch_isolated<F>(target: &HolderIdentifier, event: &'static str, call: F)
where
    F: FnOnce() -> Result<(), DispatchError>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(holder = %target, event, error = %e, "event dispatcher failed");
        }
        Err(payload) => {
            warn!(
                holder = %target,
                event,
                panic = panic_message(payload.as_ref()),
                "event dispatcher panicked"
            );
        }
    }
}

/// Run a state listener, logging a panic.
pub(crate) fn notify_isolated(target: &HolderIdentifier, listener: &dyn StateListener) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.on_state_change(target))) {
        warn!(
            holder = %target,
            panic = panic_message(payload.as_ref()),
            "state listener panicked"
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::HolderType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_isolated_swallows_errors_and_panics() {
        let target = HolderIdentifier::new(HolderType::Group, "admin");
        let calls = AtomicUsize::new(0);

        dispatch_isolated(&target, "node_added", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DispatchError::rejected("nope"))
        });
        dispatch_isolated(&target, "node_added", || {
            calls.fetch_add(1, Ordering::SeqCst);
            panic!("dispatcher bug")
        });

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_message_extracts_text() {
        let payload = catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }
}
