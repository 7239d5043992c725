//! Ordering of groups selected during traversal.

use super::PermissionHolder;
use std::cmp::Ordering;
use std::sync::Arc;

/// Priority of two groups inherited by `origin`, `Greater` when `a` wins.
///
/// Higher weight wins, an absent weight counting as 0. On a tie, a user's
/// stored primary group wins, then the alphabetically earlier name.
pub(crate) fn compare_inheritance(
    origin: &PermissionHolder,
    a: &PermissionHolder,
    b: &PermissionHolder,
) -> Ordering {
    let by_weight = a.weight().unwrap_or(0).cmp(&b.weight().unwrap_or(0));
    if by_weight != Ordering::Equal {
        return by_weight;
    }
    if let Some(user) = origin.as_user() {
        let primary = user.stored_primary_group_or_default();
        let by_primary = (a.object_name() == primary).cmp(&(b.object_name() == primary));
        if by_primary != Ordering::Equal {
            return by_primary;
        }
    }
    b.object_name().cmp(a.object_name())
}

/// Sort `groups` highest priority first.
pub(crate) fn sort_parents(origin: &PermissionHolder, groups: &mut [Arc<PermissionHolder>]) {
    groups.sort_by(|a, b| compare_inheritance(origin, b, a));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::HolderServices;
    use uuid::Uuid;
    use warden_core::node::weight_node;

    fn group(name: &str, weight: Option<i32>) -> Arc<PermissionHolder> {
        let group = PermissionHolder::group(name, HolderServices::default());
        if let Some(weight) = weight {
            group.set_enduring_nodes(vec![weight_node(weight).build()]);
        }
        Arc::new(group)
    }

    fn names(groups: &[Arc<PermissionHolder>]) -> Vec<&str> {
        groups.iter().map(|g| g.object_name()).collect()
    }

    #[test]
    fn test_weight_then_name() {
        let origin = PermissionHolder::group("origin", HolderServices::default());
        let mut groups = vec![
            group("b", None),
            group("heavy", Some(10)),
            group("a", Some(0)),
            group("negative", Some(-5)),
        ];
        sort_parents(&origin, &mut groups);
        assert_eq!(names(&groups), vec!["heavy", "a", "b", "negative"]);
    }

    #[test]
    fn test_user_primary_group_breaks_ties() {
        let user = PermissionHolder::user(Uuid::nil(), None, HolderServices::default());
        let mut groups = vec![group("alpha", Some(1)), group("default", Some(1))];
        sort_parents(&user, &mut groups);
        assert_eq!(names(&groups), vec!["default", "alpha"]);

        if let Some(state) = user.as_user() {
            state.set_stored_primary_group(Some("alpha"));
        }
        sort_parents(&user, &mut groups);
        assert_eq!(names(&groups), vec!["alpha", "default"]);
    }
}
