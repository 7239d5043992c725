//! Outcomes of holder mutations and lookups.
//!
//! These are expected, recoverable outcomes that callers branch on; none of
//! them is an error.

use serde::{Deserialize, Serialize};
use warden_core::{Node, Tristate};

/// Outcome of a single-node mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMutateResult {
    /// The node set changed.
    Success,
    /// An almost-equal node is already present.
    AlreadyHas,
    /// No almost-equal node is present.
    Lacks,
}

impl DataMutateResult {
    /// Whether the node set changed.
    pub fn was_successful(self) -> bool {
        matches!(self, DataMutateResult::Success)
    }
}

/// Outcome of setting a temporary node with a merge policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryMergeResult {
    result: DataMutateResult,
    merged_node: Node,
}

impl TemporaryMergeResult {
    pub(crate) fn new(result: DataMutateResult, merged_node: Node) -> Self {
        Self {
            result,
            merged_node,
        }
    }

    /// Outcome of the merge.
    pub fn result(&self) -> DataMutateResult {
        self.result
    }

    /// The node that was applied. When nothing changed this is the node the
    /// caller passed in.
    pub fn merged_node(&self) -> &Node {
        &self.merged_node
    }
}

/// Where an inherited value came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InheritanceInfo {
    result: Tristate,
    location: Option<String>,
}

impl InheritanceInfo {
    pub(crate) fn new(result: Tristate, location: Option<String>) -> Self {
        Self { result, location }
    }

    /// Inherited value, or [`Tristate::Undefined`].
    pub fn result(&self) -> Tristate {
        self.result
    }

    /// Object name of the holder that defined the value.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}
