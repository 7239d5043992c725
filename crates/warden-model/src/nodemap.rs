//! Per-holder node storage.
//!
//! A [`NodeMap`] keeps nodes bucketed by scope. Buckets iterate most specific
//! first and the nodes inside a bucket iterate highest priority first, so any
//! linear scan meets specific assertions before general ones.
//!
//! Edits happen under one structural mutex. Each successful edit publishes a
//! fresh [`NodeMapSnapshot`] while still holding that mutex, and readers only
//! ever clone the published `Arc`, so iteration never holds a lock.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use warden_core::node::EqualityKey;
use warden_core::{
    sort_highest_first, ContextSetComparator, ImmutableContextSet, Node, NodeComparator,
    NodeEquality, QueryOptions,
};

/// Which of a holder's two maps a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMapType {
    /// Persisted nodes.
    Enduring,
    /// Nodes that live as long as the process.
    Transient,
}

impl fmt::Display for NodeMapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMapType::Enduring => write!(f, "enduring"),
            NodeMapType::Transient => write!(f, "transient"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BucketKey(ImmutableContextSet);

impl Ord for BucketKey {
    fn cmp(&self, other: &Self) -> Ordering {
        ContextSetComparator::compare(&self.0, &other.0).reverse()
    }
}

impl PartialOrd for BucketKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PriorityKey(Node);

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        NodeComparator::compare(&self.0, &other.0).reverse()
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Nodes sharing one scope.
#[derive(Debug, Default)]
struct Bucket {
    sorted: BTreeSet<PriorityKey>,
    by_assertion: HashMap<EqualityKey, Node>,
}

impl Bucket {
    fn insert(&mut self, node: Node) -> Option<Node> {
        let key = node.equality_key(NodeEquality::IgnoreExpiryTimeAndValue);
        let replaced = self.by_assertion.insert(key, node.clone());
        if let Some(old) = &replaced {
            self.sorted.remove(&PriorityKey(old.clone()));
        }
        self.sorted.insert(PriorityKey(node));
        replaced
    }

    fn find(&self, node: &Node) -> Option<&Node> {
        self.by_assertion
            .get(&node.equality_key(NodeEquality::IgnoreExpiryTimeAndValue))
    }

    fn remove_almost_equal(&mut self, node: &Node) -> Option<Node> {
        let removed = self
            .by_assertion
            .remove(&node.equality_key(NodeEquality::IgnoreExpiryTimeAndValue))?;
        self.sorted.remove(&PriorityKey(removed.clone()));
        Some(removed)
    }

    fn remove_exact(&mut self, node: &Node) -> bool {
        match self.find(node) {
            Some(existing) if existing == node => {
                self.remove_almost_equal(node);
                true
            }
            _ => false,
        }
    }

    fn retain(&mut self, mut keep: impl FnMut(&Node) -> bool) -> Vec<Node> {
        let removed: Vec<Node> = self
            .sorted
            .iter()
            .filter(|k| !keep(&k.0))
            .map(|k| k.0.clone())
            .collect();
        for node in &removed {
            self.remove_almost_equal(node);
        }
        removed
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.sorted.iter().map(|k| &k.0)
    }

    fn len(&self) -> usize {
        self.sorted.len()
    }

    fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

/// The live structure behind a [`NodeMap`], only reachable under its lock.
///
/// At most one almost-equal node exists per scope; inserting an almost-equal
/// node replaces the existing one.
#[derive(Debug, Default)]
pub struct NodeStore {
    buckets: BTreeMap<BucketKey, Bucket>,
    len: usize,
}

impl NodeStore {
    /// Insert `node`, returning the almost-equal node it replaced.
    pub fn insert(&mut self, node: Node) -> Option<Node> {
        let bucket = self
            .buckets
            .entry(BucketKey(node.full_contexts().clone()))
            .or_default();
        let replaced = bucket.insert(node);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    /// The stored node almost equal to `node`.
    pub fn find_almost_equal(&self, node: &Node) -> Option<&Node> {
        self.buckets
            .get(&BucketKey(node.full_contexts().clone()))?
            .find(node)
    }

    /// Remove the node almost equal to `node`.
    pub fn remove_almost_equal(&mut self, node: &Node) -> Option<Node> {
        let key = BucketKey(node.full_contexts().clone());
        let bucket = self.buckets.get_mut(&key)?;
        let removed = bucket.remove_almost_equal(node)?;
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        self.len -= 1;
        Some(removed)
    }

    /// Remove `node` only if an exactly equal node is stored.
    pub fn remove_exact(&mut self, node: &Node) -> bool {
        let key = BucketKey(node.full_contexts().clone());
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return false;
        };
        if !bucket.remove_exact(node) {
            return false;
        }
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        self.len -= 1;
        true
    }

    /// Replace `old` with `new`. Does nothing unless `old` is stored exactly.
    pub fn replace(&mut self, new: Node, old: &Node) -> bool {
        if !self.remove_exact(old) {
            return false;
        }
        self.insert(new);
        true
    }

    /// Remove every node failing `keep`, returning the removed nodes.
    pub fn retain(&mut self, mut keep: impl FnMut(&Node) -> bool) -> Vec<Node> {
        let mut removed = Vec::new();
        for bucket in self.buckets.values_mut() {
            removed.extend(bucket.retain(&mut keep));
        }
        self.buckets.retain(|_, b| !b.is_empty());
        self.len -= removed.len();
        removed
    }

    /// [`NodeStore::retain`] restricted to the bucket scoped exactly to `contexts`.
    pub fn retain_in(
        &mut self,
        contexts: &ImmutableContextSet,
        keep: impl FnMut(&Node) -> bool,
    ) -> Vec<Node> {
        let key = BucketKey(contexts.clone());
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return Vec::new();
        };
        let removed = bucket.retain(keep);
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        self.len -= removed.len();
        removed
    }

    /// Remove everything, returning what was removed.
    pub fn clear(&mut self) -> Vec<Node> {
        let removed: Vec<Node> = self.nodes().cloned().collect();
        self.buckets.clear();
        self.len = 0;
        removed
    }

    /// Replace the whole content.
    pub fn set_content(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.buckets.clear();
        self.len = 0;
        for node in nodes {
            self.insert(node);
        }
    }

    /// Remove and return every node expired at `now`.
    pub fn audit_expired(&mut self, now: u64) -> Vec<Node> {
        self.retain(|n| !n.has_expired(now))
    }

    /// Every node in bucket then priority order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.buckets.values().flat_map(Bucket::nodes)
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn snapshot(&self) -> NodeMapSnapshot {
        let mut nodes = Vec::with_capacity(self.len);
        let mut buckets = Vec::with_capacity(self.buckets.len());
        let mut inheritance = Vec::new();
        for (key, bucket) in &self.buckets {
            let start = nodes.len();
            for node in bucket.nodes() {
                if node.is_group_node() && node.value() {
                    inheritance.push(nodes.len());
                }
                nodes.push(node.clone());
            }
            debug_assert_eq!(nodes.len() - start, bucket.len());
            buckets.push((key.0.clone(), start..nodes.len()));
        }
        NodeMapSnapshot {
            nodes,
            buckets,
            inheritance,
        }
    }
}

/// Immutable view of a node map at one point in time.
#[derive(Debug, Clone, Default)]
pub struct NodeMapSnapshot {
    nodes: Vec<Node>,
    buckets: Vec<(ImmutableContextSet, Range<usize>)>,
    inheritance: Vec<usize>,
}

impl NodeMapSnapshot {
    /// All nodes, most specific bucket first, highest priority first.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes scoped exactly to `contexts`.
    pub fn bucket(&self, contexts: &ImmutableContextSet) -> &[Node] {
        self.buckets
            .iter()
            .find(|(scope, _)| scope == contexts)
            .map(|(_, range)| &self.nodes[range.clone()])
            .unwrap_or_default()
    }

    /// Scopes present, most specific first.
    pub fn scopes(&self) -> impl Iterator<Item = &ImmutableContextSet> {
        self.buckets.iter().map(|(scope, _)| scope)
    }

    /// Nodes whose scope applies to `query`.
    pub fn filtered<'a>(&'a self, query: &'a QueryOptions) -> impl Iterator<Item = &'a Node> + 'a {
        self.buckets
            .iter()
            .filter(move |(scope, _)| query.satisfies(scope))
            .flat_map(move |(_, range)| self.nodes[range.clone()].iter())
    }

    /// Inheritance edges with value `true`.
    pub fn inheritance(&self) -> impl Iterator<Item = &Node> {
        self.inheritance.iter().map(move |&i| &self.nodes[i])
    }

    /// Inheritance edges with value `true` whose scope applies to `query`.
    pub fn inheritance_filtered<'a>(
        &'a self,
        query: &'a QueryOptions,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.inheritance()
            .filter(move |n| query.satisfies(n.full_contexts()))
    }

    /// Whether an exactly equal node is present.
    pub fn contains(&self, node: &Node) -> bool {
        self.find_almost_equal(node).is_some_and(|n| n == node)
    }

    /// The node almost equal to `node`.
    pub fn find_almost_equal(&self, node: &Node) -> Option<&Node> {
        self.bucket(node.full_contexts())
            .iter()
            .find(|n| n.almost_equals(node))
    }
}

/// The result of one committed edit.
#[derive(Debug)]
pub struct Mutation<R> {
    /// What the edit produced.
    pub value: R,
    /// Snapshot published before the edit.
    pub before: Arc<NodeMapSnapshot>,
    /// Snapshot published by the edit.
    pub after: Arc<NodeMapSnapshot>,
}

/// Thread-safe, scope-bucketed, priority-sorted node collection.
pub struct NodeMap {
    map_type: NodeMapType,
    store: Mutex<NodeStore>,
    published: RwLock<Arc<NodeMapSnapshot>>,
}

impl NodeMap {
    /// Empty map.
    pub fn new(map_type: NodeMapType) -> Self {
        Self {
            map_type,
            store: Mutex::new(NodeStore::default()),
            published: RwLock::new(Arc::new(NodeMapSnapshot::default())),
        }
    }

    /// Enduring or transient.
    pub fn map_type(&self) -> NodeMapType {
        self.map_type
    }

    /// Run a check-and-edit atomically.
    ///
    /// `edit` returns `None` when it left the store untouched; nothing is
    /// published in that case. Otherwise a new snapshot is published before
    /// the lock is released and both snapshots are returned.
    pub fn mutate<R>(&self, edit: impl FnOnce(&mut NodeStore) -> Option<R>) -> Option<Mutation<R>> {
        let mut store = self.store.lock();
        let value = edit(&mut store)?;
        let after = Arc::new(store.snapshot());
        let before = std::mem::replace(&mut *self.published.write(), Arc::clone(&after));
        Some(Mutation {
            value,
            before,
            after,
        })
    }

    /// The current snapshot.
    pub fn immutable(&self) -> Arc<NodeMapSnapshot> {
        Arc::clone(&self.published.read())
    }

    /// Insert `node`, replacing an almost-equal node. Returns the replaced
    /// node, or `None` if the node was new or already stored exactly.
    pub fn add(&self, node: Node) -> Option<Node> {
        let mut replaced = None;
        self.mutate(|store| {
            if store.find_almost_equal(&node).is_some_and(|n| *n == node) {
                return None;
            }
            replaced = store.insert(node);
            Some(())
        });
        replaced
    }

    /// Replace `old` with `new`; `false` if `old` is not stored exactly.
    pub fn replace(&self, new: Node, old: &Node) -> bool {
        self.mutate(|store| store.replace(new, old).then_some(()))
            .is_some()
    }

    /// Remove the node almost equal to `node`.
    pub fn remove(&self, node: &Node) -> Option<Node> {
        self.mutate(|store| store.remove_almost_equal(node))
            .map(|m| m.value)
    }

    /// Remove `node` only if stored exactly.
    pub fn remove_exact(&self, node: &Node) -> bool {
        self.mutate(|store| store.remove_exact(node).then_some(()))
            .is_some()
    }

    /// Remove every node matching `predicate`.
    pub fn remove_if(&self, mut predicate: impl FnMut(&Node) -> bool) -> Vec<Node> {
        self.mutate(|store| non_empty(store.retain(|n| !predicate(n))))
            .map(|m| m.value)
            .unwrap_or_default()
    }

    /// Remove every node scoped exactly to `contexts` matching `predicate`.
    pub fn remove_if_in(
        &self,
        contexts: &ImmutableContextSet,
        mut predicate: impl FnMut(&Node) -> bool,
    ) -> Vec<Node> {
        self.mutate(|store| non_empty(store.retain_in(contexts, |n| !predicate(n))))
            .map(|m| m.value)
            .unwrap_or_default()
    }

    /// Remove everything; `true` if anything was removed.
    pub fn clear(&self) -> bool {
        self.mutate(|store| non_empty(store.clear())).is_some()
    }

    /// Remove every node scoped exactly to `contexts`.
    pub fn clear_in(&self, contexts: &ImmutableContextSet) -> bool {
        self.mutate(|store| non_empty(store.retain_in(contexts, |_| false)))
            .is_some()
    }

    /// Replace the whole content.
    pub fn set_content(&self, nodes: impl IntoIterator<Item = Node>) {
        self.mutate(|store| {
            store.set_content(nodes);
            Some(())
        });
    }

    /// Remove and return every node expired at `now`.
    pub fn audit_expired(&self, now: u64) -> Vec<Node> {
        self.mutate(|store| non_empty(store.audit_expired(now)))
            .map(|m| m.value)
            .unwrap_or_default()
    }

    /// Append the nodes applying to `query`.
    pub fn copy_to(&self, out: &mut Vec<Node>, query: &QueryOptions) {
        out.extend(self.immutable().filtered(query).cloned());
    }

    /// Append the inheritance edges applying to `query`.
    pub fn copy_inheritance_to(&self, out: &mut Vec<Node>, query: &QueryOptions) {
        out.extend(self.immutable().inheritance_filtered(query).cloned());
    }

    /// All nodes in storage order.
    pub fn as_list(&self) -> Vec<Node> {
        self.immutable().nodes().to_vec()
    }

    /// All nodes, highest cross-scope priority first.
    pub fn as_sorted(&self) -> Vec<Node> {
        let mut nodes = self.as_list();
        sort_highest_first(&mut nodes);
        nodes
    }

    /// Number of nodes in the current snapshot.
    pub fn size(&self) -> usize {
        self.immutable().len()
    }
}

impl fmt::Debug for NodeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeMap")
            .field("map_type", &self.map_type)
            .field("size", &self.size())
            .finish()
    }
}

pub(crate) fn non_empty(nodes: Vec<Node>) -> Option<Vec<Node>> {
    (!nodes.is_empty()).then_some(nodes)
}
