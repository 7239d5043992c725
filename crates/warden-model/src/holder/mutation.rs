//! Node mutations.
//!
//! Every check-and-edit runs inside one [`NodeMap::mutate`] call, so the
//! decision and the edit see the same state. Events go out after the edit
//! is published, carrying the snapshots from either side of it.

use super::{Change, PermissionHolder};
use crate::meta::MetaType;
use crate::nodemap::{non_empty, NodeMap, NodeMapType};
use crate::results::{DataMutateResult, TemporaryMergeResult};
use crate::user::DEFAULT_GROUP;
use tracing::debug;
use warden_core::node::group_node;
use warden_core::{ImmutableContextSet, Node, PrimaryGroupStrategy, TemporaryModifier, Tristate};

impl PermissionHolder {
    /// Value of the node almost equal to `node` in one map.
    ///
    /// A group always has its own inheritance node.
    pub fn has_permission(&self, node: &Node, map_type: NodeMapType) -> Tristate {
        if let (Some(group), Some(name)) = (self.as_group(), node.group_name()) {
            if group.name() == name {
                return Tristate::True;
            }
        }
        self.node_map(map_type)
            .immutable()
            .find_almost_equal(node)
            .map_or(Tristate::Undefined, |n| Tristate::from(n.value()))
    }

    /// Add an enduring node unless an almost-equal one exists.
    pub fn set_permission(&self, node: Node) -> DataMutateResult {
        self.set_in(NodeMapType::Enduring, node)
    }

    /// Add an enduring node, merging a temporary node with an existing
    /// almost-equal one according to `modifier`.
    pub fn set_permission_with(&self, node: Node, modifier: TemporaryModifier) -> TemporaryMergeResult {
        if !node.is_temporary() {
            let result = self.set_permission(node.clone());
            return TemporaryMergeResult::new(result, node);
        }
        match modifier {
            TemporaryModifier::Accumulate => self.merge_accumulate(node),
            TemporaryModifier::Replace => self.merge_replace(node),
            TemporaryModifier::Deny => {
                let result = self.set_permission(node.clone());
                TemporaryMergeResult::new(result, node)
            }
        }
    }

    /// [`PermissionHolder::set_permission_with`] using the configured
    /// temporary add behaviour.
    pub fn set_permission_default(&self, node: Node) -> TemporaryMergeResult {
        let modifier = self.services.config().temporary_add_behaviour;
        self.set_permission_with(node, modifier)
    }

    /// Remove the enduring node almost equal to `node`.
    pub fn unset_permission(&self, node: &Node) -> DataMutateResult {
        self.unset_in(NodeMapType::Enduring, node)
    }

    /// [`PermissionHolder::set_permission`] on the transient map.
    pub fn set_transient_permission(&self, node: Node) -> DataMutateResult {
        self.set_in(NodeMapType::Transient, node)
    }

    /// [`PermissionHolder::unset_permission`] on the transient map.
    pub fn unset_transient_permission(&self, node: &Node) -> DataMutateResult {
        self.unset_in(NodeMapType::Transient, node)
    }

    /// Remove every transient node.
    pub fn clear_transient_nodes(&self) -> bool {
        self.clear_where(NodeMapType::Transient, None, |_| true)
    }

    /// Remove every enduring node.
    pub fn clear_nodes(&self) -> bool {
        self.clear_where(NodeMapType::Enduring, None, |_| true)
    }

    /// Remove every enduring node scoped exactly to `contexts`.
    pub fn clear_nodes_in(&self, contexts: &ImmutableContextSet) -> bool {
        self.clear_where(NodeMapType::Enduring, Some(contexts), |_| true)
    }

    /// Remove every enduring node of a meta type.
    pub fn clear_meta(&self, meta_type: MetaType) -> bool {
        self.clear_where(NodeMapType::Enduring, None, |n| meta_type.matches(n))
    }

    /// [`PermissionHolder::clear_meta`] limited to nodes scoped exactly to `contexts`.
    pub fn clear_meta_in(&self, meta_type: MetaType, contexts: &ImmutableContextSet) -> bool {
        self.clear_where(NodeMapType::Enduring, Some(contexts), |n| meta_type.matches(n))
    }

    /// Remove `meta.<key>.*` nodes that are temporary (or permanent).
    pub fn clear_meta_keys(&self, key: &str, temporary: bool) -> bool {
        self.clear_where(NodeMapType::Enduring, None, |n| {
            is_meta_key(n, key, temporary)
        })
    }

    /// [`PermissionHolder::clear_meta_keys`] limited to nodes scoped exactly to `contexts`.
    pub fn clear_meta_keys_in(
        &self,
        key: &str,
        contexts: &ImmutableContextSet,
        temporary: bool,
    ) -> bool {
        self.clear_where(NodeMapType::Enduring, Some(contexts), |n| {
            is_meta_key(n, key, temporary)
        })
    }

    /// Remove every enduring inheritance node. With `give_default`, a user
    /// left without a global group is put back into the default group.
    pub fn clear_parents(&self, give_default: bool) -> bool {
        let changed = self.clear_where(NodeMapType::Enduring, None, Node::is_group_node);
        if changed && give_default {
            self.give_default_if_needed();
        }
        changed
    }

    /// [`PermissionHolder::clear_parents`] limited to nodes scoped exactly to `contexts`.
    pub fn clear_parents_in(&self, contexts: &ImmutableContextSet, give_default: bool) -> bool {
        let changed = self.clear_where(NodeMapType::Enduring, Some(contexts), Node::is_group_node);
        if changed && give_default {
            self.give_default_if_needed();
        }
        changed
    }

    /// Remove every enduring node matching `predicate`.
    pub fn remove_if(&self, predicate: impl FnMut(&Node) -> bool) -> bool {
        self.clear_where(NodeMapType::Enduring, None, predicate)
    }

    /// [`PermissionHolder::remove_if`] on the transient map.
    pub fn remove_if_transient(&self, predicate: impl FnMut(&Node) -> bool) -> bool {
        self.clear_where(NodeMapType::Transient, None, predicate)
    }

    /// Drop expired nodes from both maps, emitting one removal per node.
    pub fn audit_temporary_permissions(&self) -> bool {
        let transient = self.audit(&self.transient);
        let enduring = self.audit(&self.enduring);
        transient || enduring
    }

    /// Make sure a user belongs to at least one global group.
    ///
    /// With the stored primary group strategy, a stored primary group the
    /// user no longer inherits globally is first moved to the first global
    /// group the user has. If the user then has no global inheritance node,
    /// the primary group is set to `default` and `group.default` is added.
    /// Returns whether anything changed. Groups are never touched.
    pub fn give_default_if_needed(&self) -> bool {
        let Some(user) = self.as_user() else {
            return false;
        };
        let mut work = false;
        let global = ImmutableContextSet::empty();

        if self.services.config().primary_group_calculation == PrimaryGroupStrategy::Stored {
            let primary = user.stored_primary_group_or_default();
            let enduring = self.enduring.immutable();
            let global_groups: Vec<&str> = enduring
                .inheritance()
                .filter(|n| n.full_contexts() == &global)
                .filter_map(Node::group_name)
                .collect();
            if !global_groups.iter().any(|g| *g == primary) {
                if let Some(group) = global_groups.first().copied() {
                    user.set_stored_primary_group(Some(group));
                    work = true;
                }
            }
        }

        let has_group = user.stored_primary_group().is_some()
            && self
                .enduring
                .immutable()
                .bucket(&global)
                .iter()
                .any(Node::is_group_node);
        if !has_group {
            user.set_stored_primary_group(Some(DEFAULT_GROUP));
            self.set_permission(group_node(DEFAULT_GROUP).build());
            debug!(holder = %self.identifier, "assigned default group");
            work = true;
        }
        work
    }

    fn set_in(&self, map_type: NodeMapType, node: Node) -> DataMutateResult {
        let map = self.node_map(map_type);
        let Some(mutation) = map.mutate(|store| {
            if store.find_almost_equal(&node).is_some() {
                return None;
            }
            store.insert(node.clone());
            Some(())
        }) else {
            return DataMutateResult::AlreadyHas;
        };
        debug!(holder = %self.identifier, map = %map_type, node = %node, "set node");
        self.committed(map_type, &mutation, &[Change::Added(&node)]);
        DataMutateResult::Success
    }

    fn unset_in(&self, map_type: NodeMapType, node: &Node) -> DataMutateResult {
        let map = self.node_map(map_type);
        let Some(mutation) = map.mutate(|store| store.remove_almost_equal(node)) else {
            return DataMutateResult::Lacks;
        };
        debug!(holder = %self.identifier, map = %map_type, node = %mutation.value, "unset node");
        self.committed(map_type, &mutation, &[Change::Removed(&mutation.value)]);
        DataMutateResult::Success
    }

    /// Extend an existing almost-equal temporary node by the new node's
    /// remaining time.
    fn merge_accumulate(&self, node: Node) -> TemporaryMergeResult {
        let now = self.services.now();
        let mutation = self.enduring.mutate(|store| {
            let Some(existing) = store.find_almost_equal(&node).cloned() else {
                store.insert(node.clone());
                return Some((node.clone(), None));
            };
            // 0 would make the node permanent
            let expiry = existing
                .expire_at()
                .saturating_add_signed(node.seconds_until_expiry(now))
                .max(1);
            let merged = node.to_builder().expiry(expiry).build();
            store.replace(merged.clone(), &existing);
            Some((merged, Some(existing)))
        });
        match mutation {
            Some(mutation) => self.commit_merge(mutation),
            None => TemporaryMergeResult::new(DataMutateResult::AlreadyHas, node),
        }
    }

    /// Keep whichever of the new node and an existing almost-equal one
    /// expires later.
    fn merge_replace(&self, node: Node) -> TemporaryMergeResult {
        let mutation = self.enduring.mutate(|store| match store.find_almost_equal(&node).cloned() {
            None => {
                store.insert(node.clone());
                Some((node.clone(), None))
            }
            Some(existing) if node.expire_at() > existing.expire_at() => {
                store.replace(node.clone(), &existing);
                Some((node.clone(), Some(existing)))
            }
            Some(_) => None,
        });
        match mutation {
            Some(mutation) => self.commit_merge(mutation),
            None => TemporaryMergeResult::new(DataMutateResult::AlreadyHas, node),
        }
    }

    fn commit_merge(&self, mutation: crate::nodemap::Mutation<(Node, Option<Node>)>) -> TemporaryMergeResult {
        let (applied, replaced) = &mutation.value;
        debug!(
            holder = %self.identifier,
            node = %applied,
            replaced = replaced.is_some(),
            "merged temporary node"
        );
        match replaced {
            Some(old) => self.committed(
                NodeMapType::Enduring,
                &mutation,
                &[Change::Removed(old), Change::Added(applied)],
            ),
            None => self.committed(NodeMapType::Enduring, &mutation, &[Change::Added(applied)]),
        }
        TemporaryMergeResult::new(DataMutateResult::Success, applied.clone())
    }

    fn clear_where(
        &self,
        map_type: NodeMapType,
        contexts: Option<&ImmutableContextSet>,
        mut predicate: impl FnMut(&Node) -> bool,
    ) -> bool {
        let map = self.node_map(map_type);
        let mutation = map.mutate(|store| {
            let removed = match contexts {
                Some(contexts) => store.retain_in(contexts, |n| !predicate(n)),
                None => store.retain(|n| !predicate(n)),
            };
            non_empty(removed)
        });
        let Some(mutation) = mutation else {
            return false;
        };
        debug!(
            holder = %self.identifier,
            map = %map_type,
            removed = mutation.value.len(),
            "cleared nodes"
        );
        self.committed(map_type, &mutation, &[Change::Cleared]);
        true
    }

    fn audit(&self, map: &NodeMap) -> bool {
        let now = self.services.now();
        let Some(mutation) = map.mutate(|store| non_empty(store.audit_expired(now))) else {
            return false;
        };
        debug!(
            holder = %self.identifier,
            map = %map.map_type(),
            expired = mutation.value.len(),
            "removed expired nodes"
        );
        let changes: Vec<Change<'_>> = mutation.value.iter().map(Change::Removed).collect();
        self.committed(map.map_type(), &mutation, &changes);
        true
    }
}

fn is_meta_key(node: &Node, key: &str, temporary: bool) -> bool {
    node.meta()
        .is_some_and(|(k, _)| k.to_lowercase() == key.to_lowercase())
        && node.is_temporary() == temporary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::HolderServices;
    use warden_core::node::{meta_node, prefix_node};
    use warden_core::{NodeEquality, PermissionsConfig};

    fn group() -> PermissionHolder {
        PermissionHolder::group("g", HolderServices::default())
    }

    #[test]
    fn test_set_and_unset() {
        let holder = group();
        let node = Node::builder("a.b").build();

        assert_eq!(holder.set_permission(node.clone()), DataMutateResult::Success);
        assert_eq!(holder.set_permission(node.clone()), DataMutateResult::AlreadyHas);
        assert_eq!(
            holder.set_permission(Node::builder("a.b").value(false).build()),
            DataMutateResult::AlreadyHas
        );
        assert_eq!(holder.has_permission(&node, NodeMapType::Enduring), Tristate::True);
        assert_eq!(holder.has_permission(&node, NodeMapType::Transient), Tristate::Undefined);

        let negated = Node::builder("a.b").value(false).build();
        assert_eq!(holder.unset_permission(&negated), DataMutateResult::Success);
        assert_eq!(holder.unset_permission(&node), DataMutateResult::Lacks);
    }

    #[test]
    fn test_group_has_itself() {
        let holder = group();
        let own = group_node("g").build();
        assert_eq!(holder.has_permission(&own, NodeMapType::Enduring), Tristate::True);
    }

    #[test]
    fn test_transient_is_separate() {
        let holder = group();
        let node = Node::builder("fly").build();
        assert!(holder.set_transient_permission(node.clone()).was_successful());
        assert!(holder.enduring_nodes().is_empty());
        assert_eq!(holder.unset_permission(&node), DataMutateResult::Lacks);
        assert!(holder.clear_transient_nodes());
        assert!(!holder.clear_transient_nodes());
    }

    #[test]
    fn test_clear_meta_keys_respects_temporariness() {
        let holder = group();
        holder.set_permission(meta_node("colour", "red").build());
        holder.set_permission(meta_node("Colour", "blue").expiry(u64::MAX).build());
        holder.set_permission(prefix_node(5, "[x]").build());

        assert!(holder.clear_meta_keys("colour", true));
        assert_eq!(holder.enduring_nodes().len(), 2);
        assert!(holder.clear_meta_keys("COLOUR", false));
        assert!(!holder.clear_meta_keys("colour", false));
        assert_eq!(holder.enduring_nodes().len(), 1);
    }

    #[test]
    fn test_clear_in_only_touches_scope() {
        let holder = group();
        let hub = ImmutableContextSet::of("server", "hub");
        holder.set_permission(Node::builder("a").server("hub").build());
        holder.set_permission(Node::builder("a").build());

        assert!(holder.clear_nodes_in(&hub));
        assert_eq!(holder.enduring_nodes().len(), 1);
        assert!(holder.clear_nodes());
        assert!(!holder.clear_nodes());
    }

    #[test]
    fn test_set_permission_default_uses_config() {
        let config = PermissionsConfig {
            temporary_add_behaviour: TemporaryModifier::Replace,
            ..Default::default()
        };
        let holder = PermissionHolder::group("g", HolderServices::with_config(config));
        holder.set_permission(Node::builder("t").expiry(u64::MAX - 10).build());

        let result = holder.set_permission_default(Node::builder("t").expiry(u64::MAX).build());
        assert_eq!(result.result(), DataMutateResult::Success);
        assert_eq!(holder.enduring_nodes().nodes()[0].expire_at(), u64::MAX);
    }

    #[test]
    fn test_permanent_node_ignores_modifier() {
        let holder = group();
        let node = Node::builder("p").build();
        let result = holder.set_permission_with(node.clone(), TemporaryModifier::Accumulate);
        assert_eq!(result.result(), DataMutateResult::Success);
        assert_eq!(result.merged_node(), &node);
        let again = holder.set_permission_with(node, TemporaryModifier::Accumulate);
        assert_eq!(again.result(), DataMutateResult::AlreadyHas);
    }

    #[test]
    fn test_give_default_only_for_users() {
        let holder = group();
        assert!(!holder.give_default_if_needed());
        assert!(holder.enduring_nodes().is_empty());
    }

    #[test]
    fn test_equality_used_for_lookup_is_almost_equal() {
        let holder = group();
        holder.set_permission(Node::builder("x").expiry(50).build());
        let permanent = Node::builder("x").build();
        assert_eq!(holder.has_permission(&permanent, NodeMapType::Enduring), Tristate::Undefined);
        assert!(NodeEquality::IgnoreValueOrIfTemporary
            .equals(&permanent, &holder.enduring_nodes().nodes()[0]));
    }

    #[test]
    fn test_clear_meta_keys_folds_unicode_case() {
        let holder = group();
        holder.set_permission(meta_node("Öl", "raffiniert").build());
        holder.set_permission(meta_node("farbe", "rot").build());

        assert!(holder.clear_meta_keys("öL", false));
        assert_eq!(holder.enduring_nodes().len(), 1);
        assert_eq!(holder.enduring_nodes().nodes()[0].meta(), Some(("farbe", "rot")));
    }
}
