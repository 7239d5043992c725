//! Property test strategies for warden types.

use proptest::prelude::*;

pub use proptest;

use warden_core::{ImmutableContextSet, Node};

/// Dotted permission key of one to four segments, optionally ending in a
/// wildcard.
pub fn arb_permission_key() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z][a-z0-9]{0,6}", 1..4),
        any::<bool>(),
    )
        .prop_map(|(segments, wildcard)| {
            let mut key = segments.join(".");
            if wildcard {
                key.push_str(".*");
            }
            key
        })
}

/// Context set drawn from a small pool of keys and values so that
/// generated sets overlap.
pub fn arb_context_set() -> impl Strategy<Value = ImmutableContextSet> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["server", "world", "region", "mode"]),
            prop::sample::select(vec!["survival", "creative", "nether", "hub"]),
        ),
        0..4,
    )
    .prop_map(|entries| {
        let mut set = ImmutableContextSet::builder();
        for (key, value) in entries {
            set.add(key, value);
        }
        set.to_immutable()
    })
}

/// Expiry: permanent half of the time, otherwise an instant in 2024.
pub fn arb_expiry() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), 1_704_067_200u64..1_735_689_600u64]
}

/// Permission node with arbitrary value, override flag, scope and expiry.
pub fn arb_node() -> impl Strategy<Value = Node> {
    (
        arb_permission_key(),
        any::<bool>(),
        any::<bool>(),
        arb_context_set(),
        arb_expiry(),
    )
        .prop_map(|(key, value, override_flag, contexts, expiry)| {
            Node::builder(key)
                .value(value)
                .override_flag(override_flag)
                .contexts(&contexts)
                .expiry(expiry)
                .build()
        })
}

/// Between zero and `max` nodes.
pub fn arb_nodes(max: usize) -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec(arb_node(), 0..=max)
}
