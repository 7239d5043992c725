//! De-duplication passes over node sequences.
//!
//! Each pass keeps the first occurrence of a node and drops later ones that
//! are equal under the pass's predicate, preserving order. Traversal output
//! is nearest-first, so the nearest assertion always survives.

use super::{Node, NodeEquality};
use std::collections::HashSet;

/// Keep the first node of every run that is equal under `equality`.
pub fn dedupe_by<T: AsRef<Node>>(nodes: &mut Vec<T>, equality: NodeEquality) {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes.retain(|n| seen.insert(n.as_ref().equality_key(equality)));
}

/// Drop nodes almost equal to an earlier one.
pub fn remove_almost_equal<T: AsRef<Node>>(nodes: &mut Vec<T>) {
    dedupe_by(nodes, NodeEquality::IgnoreExpiryTimeAndValue);
}

/// Drop nodes equal to an earlier one ignoring value and expiry.
pub fn remove_ignore_value_or_temporary<T: AsRef<Node>>(nodes: &mut Vec<T>) {
    dedupe_by(nodes, NodeEquality::IgnoreValueOrIfTemporary);
}

/// Drop nodes whose key already appeared.
pub fn remove_same_permission<T: AsRef<Node>>(nodes: &mut Vec<T>) {
    dedupe_by(nodes, NodeEquality::KeyOnly);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LocalizedNode;

    #[test]
    fn test_first_occurrence_wins() {
        let mut nodes = vec![
            LocalizedNode::new(Node::builder("a").value(true).build(), "user"),
            LocalizedNode::new(Node::builder("a").value(false).build(), "group"),
            LocalizedNode::new(Node::builder("b").build(), "group"),
        ];
        remove_almost_equal(&mut nodes);
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].node().value());
        assert_eq!(nodes[0].location(), "user");
    }

    #[test]
    fn test_temporary_and_permanent_differ_only_for_almost_equal() {
        let base = vec![
            Node::builder("a").expiry(50).build(),
            Node::builder("a").build(),
        ];

        let mut almost = base.clone();
        remove_almost_equal(&mut almost);
        assert_eq!(almost.len(), 2);

        let mut loose = base;
        remove_ignore_value_or_temporary(&mut loose);
        assert_eq!(loose.len(), 1);
        assert!(loose[0].is_temporary());
    }

    #[test]
    fn test_same_permission_ignores_scope() {
        let mut nodes = vec![
            Node::builder("a").server("s").build(),
            Node::builder("a").build(),
            Node::builder("A").build(),
        ];
        remove_same_permission(&mut nodes);
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_server_specific());
    }
}
