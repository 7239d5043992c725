//! Equality predicates over nodes.
//!
//! Different operations ask different questions: "is this the exact same
//! assertion" versus "is this the same assertion regardless of its current
//! value". Each predicate is also available as a hashable [`EqualityKey`] so
//! de-duplication is a single pass over a hash set.

use super::Node;
use std::hash::{Hash, Hasher};

/// Which node attributes take part in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeEquality {
    /// Every attribute.
    Exact,
    /// Everything except the value.
    IgnoreValue,
    /// Compares whether both nodes are temporary, not the expiry instant.
    IgnoreExpiryTime,
    /// The "almost equal" relation: key, override flag, temporariness and
    /// scope.
    IgnoreExpiryTimeAndValue,
    /// Key, override flag and scope.
    IgnoreValueOrIfTemporary,
    /// Everything except the scope.
    IgnoreContext,
    /// Only the key.
    KeyOnly,
}

impl NodeEquality {
    /// Compare two nodes.
    pub fn equals(self, a: &Node, b: &Node) -> bool {
        if a.ptr_eq(b) {
            return true;
        }
        if a.key() != b.key() {
            return false;
        }
        match self {
            NodeEquality::KeyOnly => true,
            NodeEquality::Exact => {
                a.value() == b.value()
                    && a.is_override() == b.is_override()
                    && a.expire_at() == b.expire_at()
                    && a.full_contexts() == b.full_contexts()
            }
            NodeEquality::IgnoreValue => {
                a.is_override() == b.is_override()
                    && a.expire_at() == b.expire_at()
                    && a.full_contexts() == b.full_contexts()
            }
            NodeEquality::IgnoreExpiryTime => {
                a.value() == b.value()
                    && a.is_override() == b.is_override()
                    && a.is_temporary() == b.is_temporary()
                    && a.full_contexts() == b.full_contexts()
            }
            NodeEquality::IgnoreExpiryTimeAndValue => {
                a.is_override() == b.is_override()
                    && a.is_temporary() == b.is_temporary()
                    && a.full_contexts() == b.full_contexts()
            }
            NodeEquality::IgnoreValueOrIfTemporary => {
                a.is_override() == b.is_override() && a.full_contexts() == b.full_contexts()
            }
            NodeEquality::IgnoreContext => {
                a.value() == b.value()
                    && a.is_override() == b.is_override()
                    && a.expire_at() == b.expire_at()
            }
        }
    }

    pub(super) fn hash_node<H: Hasher>(self, node: &Node, state: &mut H) {
        node.key().hash(state);
        match self {
            NodeEquality::KeyOnly => {}
            NodeEquality::Exact => {
                node.value().hash(state);
                node.is_override().hash(state);
                node.expire_at().hash(state);
                node.full_contexts().hash(state);
            }
            NodeEquality::IgnoreValue => {
                node.is_override().hash(state);
                node.expire_at().hash(state);
                node.full_contexts().hash(state);
            }
            NodeEquality::IgnoreExpiryTime => {
                node.value().hash(state);
                node.is_override().hash(state);
                node.is_temporary().hash(state);
                node.full_contexts().hash(state);
            }
            NodeEquality::IgnoreExpiryTimeAndValue => {
                node.is_override().hash(state);
                node.is_temporary().hash(state);
                node.full_contexts().hash(state);
            }
            NodeEquality::IgnoreValueOrIfTemporary => {
                node.is_override().hash(state);
                node.full_contexts().hash(state);
            }
            NodeEquality::IgnoreContext => {
                node.value().hash(state);
                node.is_override().hash(state);
                node.expire_at().hash(state);
            }
        }
    }
}

/// A node viewed through one [`NodeEquality`], usable as a hash key.
#[derive(Debug, Clone)]
pub struct EqualityKey {
    node: Node,
    equality: NodeEquality,
}

impl EqualityKey {
    pub(crate) fn new(node: Node, equality: NodeEquality) -> Self {
        Self { node, equality }
    }

    /// The wrapped node.
    pub fn node(&self) -> &Node {
        &self.node
    }
}

impl PartialEq for EqualityKey {
    fn eq(&self, other: &Self) -> bool {
        self.equality == other.equality && self.equality.equals(&self.node, &other.node)
    }
}

impl Eq for EqualityKey {}

impl Hash for EqualityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.equality.hash_node(&self.node, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_almost_equal_ignores_value_and_instant() {
        let a = Node::builder("a.b").value(true).expiry(100).build();
        let b = Node::builder("a.b").value(false).expiry(200).build();
        let permanent = Node::builder("a.b").build();

        assert!(a.almost_equals(&b));
        assert!(!a.almost_equals(&permanent));
        assert!(!NodeEquality::Exact.equals(&a, &b));
    }

    #[test]
    fn test_scope_includes_server_and_world() {
        let a = Node::builder("a").server("survival").build();
        let b = Node::builder("a").context("server", "survival").build();
        let c = Node::builder("a").build();

        assert!(NodeEquality::Exact.equals(&a, &b));
        assert!(!NodeEquality::Exact.equals(&a, &c));
        assert!(NodeEquality::IgnoreContext.equals(&a, &c));
    }

    #[test]
    fn test_ignore_value_or_if_temporary() {
        let a = Node::builder("x").value(false).expiry(10).build();
        let b = Node::builder("x").build();
        assert!(NodeEquality::IgnoreValueOrIfTemporary.equals(&a, &b));
        assert!(!NodeEquality::IgnoreExpiryTimeAndValue.equals(&a, &b));
    }

    #[test]
    fn test_equality_keys_dedupe() {
        let nodes = [
            Node::builder("k").value(true).build(),
            Node::builder("k").value(false).build(),
            Node::builder("k").server("s").build(),
        ];
        let keys: HashSet<EqualityKey> = nodes
            .iter()
            .map(|n| n.equality_key(NodeEquality::IgnoreExpiryTimeAndValue))
            .collect();
        assert_eq!(keys.len(), 2);
    }
}
