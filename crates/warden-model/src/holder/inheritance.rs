//! Inheritance traversal and the queries built on it.
//!
//! Traversal is depth first, pre-order. Starting from the queried holder,
//! each visited holder contributes the own nodes that apply to the query,
//! then its inheritance edges are resolved through the [`GroupLookup`] and
//! pushed onto an explicit work stack, highest ranked group on top. A group
//! is entered at most once per traversal (the root included), which is what
//! keeps cyclic graphs finite. Groups that are not loaded are skipped.
//!
//! No lock is held across holders: each holder's nodes are read from its
//! own published snapshot.

use super::comparator::sort_parents;
use super::PermissionHolder;
use crate::lookup::GroupLookup;
use crate::meta::{ChatMetaType, MetaAccumulator, MetaData};
use crate::results::InheritanceInfo;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;
use warden_core::node::group_node;
use warden_core::node::tools::{dedupe_by, remove_same_permission};
use warden_core::{
    sort_highest_first, ImmutableContextSet, LocalizedNode, Node, NodeEquality, QueryFlags,
    QueryOptions, Tristate,
};

/// Which duplicates [`PermissionHolder::resolve_inheritances`] drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupeStrategy {
    /// Nodes almost equal to a nearer one.
    #[default]
    AlmostEqual,
    /// Nodes equal to a nearer one ignoring value and expiry.
    IgnoreValueOrTemporary,
}

impl DedupeStrategy {
    fn equality(self) -> NodeEquality {
        match self {
            DedupeStrategy::AlmostEqual => NodeEquality::IgnoreExpiryTimeAndValue,
            DedupeStrategy::IgnoreValueOrTemporary => NodeEquality::IgnoreValueOrIfTemporary,
        }
    }
}

/// Whether an inheritance edge may be followed under `flags`.
fn edge_applies(node: &Node, flags: &QueryFlags) -> bool {
    (flags.apply_global_groups || node.is_server_specific())
        && (flags.apply_global_world_groups || node.is_world_specific())
}

/// Whether a node is included under `flags`. Inheritance nodes always are.
fn node_included(node: &Node, flags: &QueryFlags) -> bool {
    node.is_group_node()
        || ((flags.include_global || node.is_server_specific())
            && (flags.include_global_world || node.is_world_specific()))
}

impl PermissionHolder {
    /// Visit this holder and every group it inherits under `query`.
    ///
    /// `visit` receives each holder with its own nodes that apply to the
    /// query, nearest holder first.
    pub(crate) fn traverse<G>(
        &self,
        groups: &G,
        query: &QueryOptions,
        mut visit: impl FnMut(&PermissionHolder, &[Node]),
    ) where
        G: GroupLookup + ?Sized,
    {
        let flags = query.flags();
        let mut visited: HashSet<String> = HashSet::new();
        if let Some(group) = self.as_group() {
            visited.insert(group.name().to_string());
        }

        let nodes = self.own_nodes_in(query);
        trace!(holder = %self.identifier, nodes = nodes.len(), "visiting holder");
        visit(self, &nodes);
        if !flags.apply_groups {
            return;
        }

        let mut stack = self.select_parents(groups, &flags, &nodes, &visited);
        stack.reverse();
        while let Some(holder) = stack.pop() {
            let Some(group) = holder.as_group() else {
                continue;
            };
            if !visited.insert(group.name().to_string()) {
                trace!(holder = %holder.identifier, "already visited");
                continue;
            }
            let nodes = holder.own_nodes_in(query);
            trace!(holder = %holder.identifier, nodes = nodes.len(), "visiting holder");
            visit(holder.as_ref(), &nodes);

            let parents = holder.select_parents(groups, &flags, &nodes, &visited);
            stack.extend(parents.into_iter().rev());
        }
    }

    /// Loaded groups reachable over this holder's followable edges, ranked.
    fn select_parents<G>(
        &self,
        groups: &G,
        flags: &QueryFlags,
        nodes: &[Node],
        visited: &HashSet<String>,
    ) -> Vec<Arc<PermissionHolder>>
    where
        G: GroupLookup + ?Sized,
    {
        let mut selected = HashSet::new();
        let mut parents = Vec::new();
        for node in nodes {
            let Some(name) = node.group_name() else {
                continue;
            };
            if !node.value() || !edge_applies(node, flags) {
                continue;
            }
            if visited.contains(name) || !selected.insert(name) {
                continue;
            }
            match groups.get_if_loaded(name) {
                Some(group) => parents.push(group),
                None => trace!(holder = %self.identifier, group = name, "group not loaded"),
            }
        }
        sort_parents(self, &mut parents);
        parents
    }

    /// Own and inherited nodes applying to `query`, nearest holder first, in
    /// raw traversal order.
    pub fn resolve_inheritance<G>(&self, groups: &G, query: &QueryOptions) -> Vec<LocalizedNode>
    where
        G: GroupLookup + ?Sized,
    {
        let mut out = Vec::new();
        self.traverse(groups, query, |holder, nodes| {
            out.extend(
                nodes
                    .iter()
                    .map(|n| LocalizedNode::new(n.clone(), holder.object_name())),
            );
        });
        out
    }

    /// [`PermissionHolder::resolve_inheritance`] with duplicates of nearer
    /// nodes dropped, then sorted highest priority first.
    pub fn resolve_inheritances<G>(
        &self,
        groups: &G,
        query: &QueryOptions,
        strategy: DedupeStrategy,
    ) -> Vec<LocalizedNode>
    where
        G: GroupLookup + ?Sized,
    {
        let mut nodes = self.resolve_inheritance(groups, query);
        dedupe_by(&mut nodes, strategy.equality());
        sort_highest_first(&mut nodes);
        nodes
    }

    /// The effective node for every key: resolved, filtered by the query's
    /// include flags and reduced to one node per key, highest priority first.
    pub fn all_nodes<G>(&self, groups: &G, query: &QueryOptions) -> Vec<LocalizedNode>
    where
        G: GroupLookup + ?Sized,
    {
        let flags = query.flags();
        let mut nodes = self.resolve_inheritances(groups, query, DedupeStrategy::AlmostEqual);
        nodes.retain(|n| node_included(n.node(), &flags));
        remove_same_permission(&mut nodes);
        nodes
    }

    /// Effective value of every permission key.
    ///
    /// The first node for a key wins. With shorthand enabled, the expansions
    /// of each node are added too unless already present.
    pub fn export_permissions<G>(
        &self,
        groups: &G,
        query: &QueryOptions,
        lower_case: bool,
    ) -> HashMap<String, bool>
    where
        G: GroupLookup + ?Sized,
    {
        let shorthand = self.services.config().apply_shorthand;
        let normalize = |key: &str| {
            if lower_case {
                key.to_lowercase()
            } else {
                key.to_string()
            }
        };

        let mut out = HashMap::new();
        for node in self.all_nodes(groups, query) {
            let node = node.node();
            out.entry(normalize(node.key())).or_insert(node.value());
            if shorthand {
                for expanded in node.shorthand() {
                    out.entry(normalize(expanded)).or_insert(node.value());
                }
            }
        }
        out
    }

    /// Effective value of one permission key, compared case-insensitively.
    ///
    /// Agrees with a lowercase [`PermissionHolder::export_permissions`].
    pub fn check_permission<G>(&self, groups: &G, query: &QueryOptions, key: &str) -> Tristate
    where
        G: GroupLookup + ?Sized,
    {
        let shorthand = self.services.config().apply_shorthand;
        let key = key.to_lowercase();
        self.all_nodes(groups, query)
            .iter()
            .map(LocalizedNode::node)
            .find(|n| {
                n.collation_key() == key
                    || (shorthand && n.shorthand().iter().any(|s| s.to_lowercase() == key))
            })
            .map_or(Tristate::Undefined, |n| Tristate::from(n.value()))
    }

    /// Value of the inherited node almost equal to `node`, in any scope.
    pub fn inherits_permission<G>(&self, groups: &G, node: &Node) -> Tristate
    where
        G: GroupLookup + ?Sized,
    {
        self.inherits_permission_info(groups, node).result()
    }

    /// [`PermissionHolder::inherits_permission`] plus the holder it came from.
    pub fn inherits_permission_info<G>(&self, groups: &G, node: &Node) -> InheritanceInfo
    where
        G: GroupLookup + ?Sized,
    {
        self.resolve_inheritances(groups, &QueryOptions::non_contextual(), DedupeStrategy::AlmostEqual)
            .into_iter()
            .find(|n| n.node().almost_equals(node))
            .map(|n| {
                InheritanceInfo::new(Tristate::from(n.node().value()), Some(n.location().to_string()))
            })
            .unwrap_or_default()
    }

    /// Whether this holder directly inherits `group` in exactly `contexts`.
    /// Every group inherits itself.
    pub fn inherits_group(&self, group: &str, contexts: &ImmutableContextSet) -> bool {
        let group = group.trim().to_lowercase();
        if self.as_group().is_some_and(|g| g.name() == group) {
            return true;
        }
        let edge = group_node(&group).with_contexts(contexts).build();
        self.enduring
            .immutable()
            .bucket(edge.full_contexts())
            .iter()
            .any(|n| n.value() && NodeEquality::IgnoreValueOrIfTemporary.equals(n, &edge))
    }

    /// Meta of this holder and everything it inherits under `query`.
    ///
    /// Only `true` meta, prefix and suffix nodes passing the include flags
    /// count. Every visited group's weight is folded in, and for users the
    /// primary group is recorded.
    pub fn accumulate_meta<G>(&self, groups: &G, query: &QueryOptions) -> MetaData
    where
        G: GroupLookup + ?Sized,
    {
        let flags = query.flags();
        let mut acc = MetaAccumulator::new();
        self.traverse(groups, query, |holder, nodes| {
            for node in nodes {
                if node.value() && node.kind().is_any_meta() && node_included(node, &flags) {
                    acc.accumulate_node(node);
                }
            }
            if let Some(weight) = holder.weight() {
                acc.accumulate_weight(weight);
            }
        });
        if let Some(primary) = self.primary_group(groups, query) {
            acc.set_primary_group(primary);
        }
        acc.complete()
    }

    /// Priority for a new prefix or suffix: one above the highest existing
    /// priority of that type, raised to the group's weight if that is
    /// higher.
    pub fn suggest_chat_meta_priority<G>(
        &self,
        groups: &G,
        query: &QueryOptions,
        chat: ChatMetaType,
    ) -> i32
    where
        G: GroupLookup + ?Sized,
    {
        let meta = self.accumulate_meta(groups, query);
        let priority = meta.max_priority(chat).unwrap_or(0).saturating_add(1);
        match self.as_group().and(self.weight()) {
            Some(weight) if weight > priority => weight,
            _ => priority,
        }
    }
}
