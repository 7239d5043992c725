//! Priority orderings over nodes and context sets.
//!
//! Every comparator returns [`Ordering::Greater`] when the left argument has
//! the higher priority. Containers that iterate highest-first wrap them with
//! [`Ordering::reverse`]. Each ordering is total and agrees with exact
//! equality, so it can key ordered collections directly.

use crate::context::ImmutableContextSet;
use crate::node::Node;
use std::cmp::Ordering;

/// Priority of two nodes that share a scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeComparator;

impl NodeComparator {
    /// Permanent beats temporary, a later expiry beats a sooner one, a
    /// concrete key beats a wildcard, a deeper wildcard beats a shallower
    /// one, then alphabetically earlier keys rank higher.
    pub fn compare(a: &Node, b: &Node) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }

        match (a.is_permanent(), b.is_permanent()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {
                let by_expiry = a.expire_at().cmp(&b.expire_at());
                if by_expiry != Ordering::Equal {
                    return by_expiry;
                }
            }
            (true, true) => {}
        }

        match (a.wildcard_level(), b.wildcard_level()) {
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(x), Some(y)) if x != y => return x.cmp(&y),
            _ => {}
        }

        b.collation_key()
            .cmp(a.collation_key())
            .then_with(|| b.key().cmp(a.key()))
            .then_with(|| a.value().cmp(&b.value()))
            .then_with(|| a.is_override().cmp(&b.is_override()))
            .then_with(|| ContextSetComparator::compare(a.full_contexts(), b.full_contexts()))
    }
}

/// Specificity of context sets: more specific sets rank higher.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSetComparator;

impl ContextSetComparator {
    /// A `server` entry beats none, then a `world` entry, then the larger
    /// set. Remaining ties compare entries.
    pub fn compare(a: &ImmutableContextSet, b: &ImmutableContextSet) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        a.has_server()
            .cmp(&b.has_server())
            .then_with(|| a.has_world().cmp(&b.has_world()))
            .then_with(|| a.len().cmp(&b.len()))
            .then_with(|| b.as_slice().cmp(a.as_slice()))
    }
}

/// Priority of nodes gathered from different holders.
///
/// An inherited node with a narrower scope outranks a nearer one with a
/// broader scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeWithContextComparator;

impl NodeWithContextComparator {
    /// Override flag, then server, then world, then scope size, then
    /// [`NodeComparator`].
    pub fn compare(a: &Node, b: &Node) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        a.is_override()
            .cmp(&b.is_override())
            .then_with(|| a.is_server_specific().cmp(&b.is_server_specific()))
            .then_with(|| a.is_world_specific().cmp(&b.is_world_specific()))
            .then_with(|| a.full_contexts().len().cmp(&b.full_contexts().len()))
            .then_with(|| NodeComparator::compare(a, b))
    }
}

/// Stable sort, highest [`NodeWithContextComparator`] priority first.
pub fn sort_highest_first<T: AsRef<Node>>(items: &mut [T]) {
    items.sort_by(|a, b| NodeWithContextComparator::compare(a.as_ref(), b.as_ref()).reverse());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use proptest::prelude::*;

    fn n(key: &str) -> Node {
        Node::builder(key).build()
    }

    #[test]
    fn test_specific_beats_wildcard() {
        assert_eq!(NodeComparator::compare(&n("foo.bar"), &n("foo.*")), Ordering::Greater);
        assert_eq!(NodeComparator::compare(&n("foo.*"), &n("foo.bar")), Ordering::Less);
    }

    #[test]
    fn test_deeper_wildcard_wins() {
        assert_eq!(NodeComparator::compare(&n("foo.bar.*"), &n("foo.*")), Ordering::Greater);
        assert_eq!(NodeComparator::compare(&n("foo.*"), &n("*")), Ordering::Greater);
    }

    #[test]
    fn test_permanent_beats_temporary_and_later_expiry_wins() {
        let permanent = n("a");
        let soon = Node::builder("a").expiry(100).build();
        let late = Node::builder("a").expiry(200).build();
        assert_eq!(NodeComparator::compare(&permanent, &soon), Ordering::Greater);
        assert_eq!(NodeComparator::compare(&late, &soon), Ordering::Greater);
    }

    #[test]
    fn test_alphabetical_earlier_ranks_higher() {
        assert_eq!(NodeComparator::compare(&n("alpha"), &n("Beta")), Ordering::Greater);
    }

    #[test]
    fn test_context_set_specificity() {
        let server = ImmutableContextSet::of("server", "a");
        let world = ImmutableContextSet::of("world", "w");
        let big = ImmutableContextSet::builder()
            .with("region", "eu")
            .with("mode", "pvp")
            .to_immutable();
        let empty = ImmutableContextSet::empty();

        assert_eq!(ContextSetComparator::compare(&server, &world), Ordering::Greater);
        assert_eq!(ContextSetComparator::compare(&world, &big), Ordering::Greater);
        assert_eq!(ContextSetComparator::compare(&big, &empty), Ordering::Greater);
    }

    #[test]
    fn test_with_context_prefers_scope_over_key() {
        let scoped_wildcard = Node::builder("foo.*").server("s").build();
        let global = n("foo.bar");
        let overriding = Node::builder("zzz").override_flag(true).build();

        assert_eq!(
            NodeWithContextComparator::compare(&scoped_wildcard, &global),
            Ordering::Greater
        );
        assert_eq!(
            NodeWithContextComparator::compare(&overriding, &scoped_wildcard),
            Ordering::Greater
        );
    }

    #[test]
    fn test_sort_highest_first_is_stable_for_equal_nodes() {
        let mut nodes = vec![n("b"), n("a.*"), n("a"), n("b")];
        sort_highest_first(&mut nodes);
        let keys: Vec<&str> = nodes.iter().map(Node::key).collect();
        assert_eq!(keys, vec!["a", "b", "b", "a.*"]);
    }

    fn arb_node() -> impl Strategy<Value = Node> {
        (
            prop::sample::select(vec!["a", "a.b", "a.*", "*", "B", "b.c.*"]),
            any::<bool>(),
            any::<bool>(),
            prop::option::of(0u64..3),
            prop::option::of(prop::sample::select(vec!["s1", "s2"])),
        )
            .prop_map(|(key, value, over, expiry, server)| {
                let mut b = Node::builder(key)
                    .value(value)
                    .override_flag(over)
                    .expiry(expiry.unwrap_or(0));
                if let Some(server) = server {
                    b = b.server(server);
                }
                b.build()
            })
    }

    proptest! {
        #[test]
        fn prop_node_comparator_total_and_antisymmetric(a in arb_node(), b in arb_node()) {
            let ab = NodeComparator::compare(&a, &b);
            prop_assert_eq!(ab, NodeComparator::compare(&b, &a).reverse());
            prop_assert_eq!(ab == Ordering::Equal, a == b);
        }

        #[test]
        fn prop_with_context_comparator_agrees_with_equality(a in arb_node(), b in arb_node()) {
            let ab = NodeWithContextComparator::compare(&a, &b);
            prop_assert_eq!(ab, NodeWithContextComparator::compare(&b, &a).reverse());
            prop_assert_eq!(ab == Ordering::Equal, a == b);
        }
    }
}
