//! Group specific state.

use crate::nodemap::NodeMapSnapshot;
use std::sync::Arc;
use warden_core::{ImmutableContextSet, Memo, PermissionsConfig};

/// State only groups carry: the name and the caches derived from the
/// group's own global nodes.
#[derive(Debug)]
pub struct GroupState {
    name: String,
    weight: Memo<Option<i32>>,
    display_name: Memo<Option<String>>,
}

impl GroupState {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            weight: Memo::new(),
            display_name: Memo::new(),
        }
    }

    /// Lowercase group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Largest `weight.N` among the global enduring nodes, else the
    /// configured weight for this group.
    ///
    /// `enduring` is only called on a cache miss, after the memo generation
    /// has been read, so a snapshot published concurrently is never cached
    /// under a newer generation.
    pub(crate) fn weight<F>(&self, enduring: F, config: &PermissionsConfig) -> Option<i32>
    where
        F: FnOnce() -> Arc<NodeMapSnapshot>,
    {
        self.weight.get_or_compute(|| {
            enduring()
                .bucket(&ImmutableContextSet::empty())
                .iter()
                .filter_map(|n| n.weight())
                .max()
                .or_else(|| config.group_weight(&self.name))
        })
    }

    /// First global `displayname.X` node, else the configured rewrite unless
    /// it just repeats the name.
    pub(crate) fn display_name<F>(&self, enduring: F, config: &PermissionsConfig) -> Option<String>
    where
        F: FnOnce() -> Arc<NodeMapSnapshot>,
    {
        self.display_name.get_or_compute(|| {
            enduring()
                .bucket(&ImmutableContextSet::empty())
                .iter()
                .find_map(|n| n.display_name())
                .or_else(|| {
                    config
                        .group_name_rewrite(&self.name)
                        .filter(|rewrite| *rewrite != self.name)
                })
                .map(str::to_string)
        })
    }

    pub(crate) fn invalidate(&self) {
        self.weight.invalidate();
        self.display_name.invalidate();
    }
}
