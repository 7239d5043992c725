//! Primary group of a user.

use super::comparator::sort_parents;
use super::PermissionHolder;
use crate::lookup::GroupLookup;
use std::sync::Arc;
use warden_core::{PrimaryGroupStrategy, QueryOptions};

impl PermissionHolder {
    /// The user's primary group under the configured strategy.
    ///
    /// Computed strategies fall back to the stored value, then to the
    /// default group. Groups have no primary group.
    pub fn primary_group<G>(&self, groups: &G, query: &QueryOptions) -> Option<String>
    where
        G: GroupLookup + ?Sized,
    {
        let user = self.as_user()?;
        let computed = match self.services.config().primary_group_calculation {
            PrimaryGroupStrategy::Stored => None,
            PrimaryGroupStrategy::ParentsByWeight => self.heaviest_parent(groups, query),
            PrimaryGroupStrategy::AllParentsByWeight => self.heaviest_ancestor(groups, query),
        };
        Some(computed.unwrap_or_else(|| user.stored_primary_group_or_default()))
    }

    /// Highest ranked loaded group among the direct inheritance nodes
    /// applying to `query`, ranked like traversal order.
    fn heaviest_parent<G>(&self, groups: &G, query: &QueryOptions) -> Option<String>
    where
        G: GroupLookup + ?Sized,
    {
        let mut parents: Vec<Arc<PermissionHolder>> = self
            .own_nodes_in(query)
            .iter()
            .filter(|n| n.value())
            .filter_map(|n| n.group_name().and_then(|name| groups.get_if_loaded(name)))
            .collect();
        sort_parents(self, &mut parents);
        parents.first().map(|g| g.object_name().to_string())
    }

    /// Heaviest group anywhere in the traversal. The first one visited wins
    /// a tie.
    fn heaviest_ancestor<G>(&self, groups: &G, query: &QueryOptions) -> Option<String>
    where
        G: GroupLookup + ?Sized,
    {
        let mut best: Option<(i32, String)> = None;
        self.traverse(groups, query, |holder, _| {
            if !holder.is_group() {
                return;
            }
            let weight = holder.weight().unwrap_or(0);
            if best.as_ref().map_or(true, |(w, _)| weight > *w) {
                best = Some((weight, holder.object_name().to_string()));
            }
        });
        best.map(|(_, name)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::HolderServices;
    use std::collections::HashMap;
    use uuid::Uuid;
    use warden_core::node::{group_node, weight_node};
    use warden_core::PermissionsConfig;

    fn services(strategy: PrimaryGroupStrategy) -> HolderServices {
        HolderServices::with_config(PermissionsConfig {
            primary_group_calculation: strategy,
            ..Default::default()
        })
    }

    fn world(strategy: PrimaryGroupStrategy) -> (PermissionHolder, HashMap<String, Arc<PermissionHolder>>) {
        let mut groups = HashMap::new();
        for (name, weight, parent) in [("member", 1, Some("elite")), ("staff", 5, None), ("elite", 9, None)] {
            let group = PermissionHolder::group(name, services(strategy));
            let mut nodes = vec![weight_node(weight).build()];
            if let Some(parent) = parent {
                nodes.push(group_node(parent).build());
            }
            group.set_enduring_nodes(nodes);
            groups.insert(name.to_string(), Arc::new(group));
        }
        let user = PermissionHolder::user(Uuid::nil(), None, services(strategy));
        user.set_enduring_nodes(vec![group_node("member").build(), group_node("staff").build()]);
        (user, groups)
    }

    #[test]
    fn test_strategies() {
        let query = QueryOptions::non_contextual();

        let (user, groups) = world(PrimaryGroupStrategy::Stored);
        assert_eq!(user.primary_group(&groups, &query).as_deref(), Some("default"));
        if let Some(state) = user.as_user() {
            state.set_stored_primary_group(Some("member"));
        }
        assert_eq!(user.primary_group(&groups, &query).as_deref(), Some("member"));

        let (user, groups) = world(PrimaryGroupStrategy::ParentsByWeight);
        assert_eq!(user.primary_group(&groups, &query).as_deref(), Some("staff"));

        let (user, groups) = world(PrimaryGroupStrategy::AllParentsByWeight);
        assert_eq!(user.primary_group(&groups, &query).as_deref(), Some("elite"));
    }

    #[test]
    fn test_computed_strategy_falls_back_to_stored() {
        let user = PermissionHolder::user(Uuid::nil(), None, services(PrimaryGroupStrategy::ParentsByWeight));
        let groups: HashMap<String, Arc<PermissionHolder>> = HashMap::new();
        let query = QueryOptions::non_contextual();
        assert_eq!(user.primary_group(&groups, &query).as_deref(), Some("default"));

        let group = PermissionHolder::group("g", HolderServices::default());
        assert_eq!(group.primary_group(&groups, &query), None);
    }

    #[test]
    fn test_parents_by_weight_ties_break_by_name() {
        let query = QueryOptions::non_contextual();
        let strategy = PrimaryGroupStrategy::ParentsByWeight;
        let mut groups = HashMap::new();
        for name in ["zeta", "alpha", "mid"] {
            let group = PermissionHolder::group(name, services(strategy));
            group.set_enduring_nodes(vec![weight_node(4).build()]);
            groups.insert(name.to_string(), Arc::new(group));
        }

        for order in [["zeta", "alpha", "mid"], ["mid", "zeta", "alpha"]] {
            let user = PermissionHolder::user(Uuid::new_v4(), None, services(strategy));
            user.set_enduring_nodes(order.iter().map(|name| group_node(name).build()));
            assert_eq!(user.primary_group(&groups, &query).as_deref(), Some("alpha"));
        }
    }
}
