//! Nodes: immutable permission assertions.
//!
//! A [`Node`] is a key with a boolean value, scoped by a context set and
//! optionally limited in time. Everything that can be derived from the key
//! (classification, wildcard depth, collation key, shorthand expansions) and
//! the node's full scope is computed once in [`NodeBuilder::build`].
//!
//! Nodes are cheap to clone and are shared freely between node maps,
//! snapshots and traversal results.

mod equality;
mod kind;
mod localized;
mod metadata;
mod shorthand;
/// De-duplication passes over node sequences.
pub mod tools;

pub use equality::{EqualityKey, NodeEquality};
pub use kind::{
    display_name_node, escape_characters, group_node, meta_node, prefix_node, suffix_node,
    unescape_characters, weight_node, NodeKind, DEFAULT_CHAT_META_PRIORITY,
};
pub use localized::LocalizedNode;
pub use metadata::{MetadataKey, NodeMetadata};
pub use shorthand::expand_shorthand;

use crate::context::{
    ContextSatisfyMode, ImmutableContextSet, MutableContextSet, GLOBAL_VALUE, SERVER_KEY,
    WORLD_KEY,
};
use crate::errors::{Result, WardenError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

struct NodeInner {
    key: String,
    value: bool,
    override_flag: bool,
    server: Option<String>,
    world: Option<String>,
    contexts: ImmutableContextSet,
    expire_at: u64,
    metadata: NodeMetadata,

    full_contexts: ImmutableContextSet,
    kind: NodeKind,
    wildcard_level: Option<usize>,
    collation_key: String,
    shorthand: Vec<String>,
}

/// An immutable permission assertion.
///
/// `PartialEq` and `Hash` follow [`NodeEquality::Exact`]; metadata never takes
/// part in equality.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Start building a node with `key`.
    pub fn builder(key: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(key)
    }

    /// A builder pre-populated with this node's attributes.
    pub fn to_builder(&self) -> NodeBuilder {
        let inner = &self.inner;
        NodeBuilder {
            key: inner.key.clone(),
            value: inner.value,
            override_flag: inner.override_flag,
            server: inner.server.clone(),
            world: inner.world.clone(),
            contexts: inner.contexts.to_mutable(),
            expire_at: inner.expire_at,
            metadata: inner.metadata.clone(),
        }
    }

    /// The permission key, as given.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The truth value.
    pub fn value(&self) -> bool {
        self.inner.value
    }

    /// Whether the node carries the override flag.
    pub fn is_override(&self) -> bool {
        self.inner.override_flag
    }

    /// The server this node applies on, if restricted.
    pub fn server(&self) -> Option<&str> {
        self.inner.server.as_deref()
    }

    /// The world this node applies in, if restricted.
    pub fn world(&self) -> Option<&str> {
        self.inner.world.as_deref()
    }

    /// The extra contexts, without server and world.
    pub fn contexts(&self) -> &ImmutableContextSet {
        &self.inner.contexts
    }

    /// The node's scope: contexts plus server and world.
    pub fn full_contexts(&self) -> &ImmutableContextSet {
        &self.inner.full_contexts
    }

    /// Unix seconds at which the node expires; 0 for permanent nodes.
    pub fn expire_at(&self) -> u64 {
        self.inner.expire_at
    }

    /// Whether the node has an expiry.
    pub fn is_temporary(&self) -> bool {
        self.inner.expire_at != 0
    }

    /// Whether the node never expires.
    pub fn is_permanent(&self) -> bool {
        self.inner.expire_at == 0
    }

    /// Whether a temporary node is past its expiry at `now`.
    pub fn has_expired(&self, now: u64) -> bool {
        self.is_temporary() && self.inner.expire_at < now
    }

    /// Seconds until expiry at `now`; negative once expired, 0 for
    /// permanent nodes.
    pub fn seconds_until_expiry(&self, now: u64) -> i64 {
        if self.is_permanent() {
            return 0;
        }
        to_i64(self.inner.expire_at) - to_i64(now)
    }

    /// Auxiliary metadata.
    pub fn metadata(&self) -> &NodeMetadata {
        &self.inner.metadata
    }

    /// Classification of the key.
    pub fn kind(&self) -> &NodeKind {
        &self.inner.kind
    }

    /// Whether this is an inheritance edge.
    pub fn is_group_node(&self) -> bool {
        self.inner.kind.is_inheritance()
    }

    /// Target group name of an inheritance edge.
    pub fn group_name(&self) -> Option<&str> {
        match &self.inner.kind {
            NodeKind::Inheritance { group } => Some(group),
            _ => None,
        }
    }

    /// Key and value of a meta node.
    pub fn meta(&self) -> Option<(&str, &str)> {
        match &self.inner.kind {
            NodeKind::Meta { key, value } => Some((key, value)),
            _ => None,
        }
    }

    /// Priority and value of a prefix node.
    pub fn prefix(&self) -> Option<(i32, &str)> {
        match &self.inner.kind {
            NodeKind::Prefix { priority, value } => Some((*priority, value)),
            _ => None,
        }
    }

    /// Priority and value of a suffix node.
    pub fn suffix(&self) -> Option<(i32, &str)> {
        match &self.inner.kind {
            NodeKind::Suffix { priority, value } => Some((*priority, value)),
            _ => None,
        }
    }

    /// Weight of a weight node.
    pub fn weight(&self) -> Option<i32> {
        match &self.inner.kind {
            NodeKind::Weight { weight } => Some(*weight),
            _ => None,
        }
    }

    /// Name carried by a display name node.
    pub fn display_name(&self) -> Option<&str> {
        match &self.inner.kind {
            NodeKind::DisplayName { name } => Some(name),
            _ => None,
        }
    }

    /// Whether the key is `*` or ends with `.*`.
    pub fn is_wildcard(&self) -> bool {
        self.inner.wildcard_level.is_some()
    }

    /// Number of `.` separators of a wildcard key.
    pub fn wildcard_level(&self) -> Option<usize> {
        self.inner.wildcard_level
    }

    /// Case-folded key used for alphabetical ordering.
    pub fn collation_key(&self) -> &str {
        &self.inner.collation_key
    }

    /// Shorthand expansions of the key, excluding the key itself.
    pub fn shorthand(&self) -> &[String] {
        &self.inner.shorthand
    }

    /// Whether the scope names a server.
    pub fn is_server_specific(&self) -> bool {
        self.inner.full_contexts.has_server()
    }

    /// Whether the scope names a world.
    pub fn is_world_specific(&self) -> bool {
        self.inner.full_contexts.has_world()
    }

    /// Whether the node applies in the global scope.
    pub fn is_global(&self) -> bool {
        self.inner.full_contexts.is_empty()
    }

    /// Whether the node applies for a query carrying `contexts`.
    pub fn applies_in(&self, contexts: &ImmutableContextSet, mode: ContextSatisfyMode) -> bool {
        self.inner.full_contexts.is_satisfied_by(contexts, mode)
    }

    /// Compare with `other` under an equality predicate.
    pub fn equals(&self, other: &Node, equality: NodeEquality) -> bool {
        equality.equals(self, other)
    }

    /// The "almost equal" relation used to locate an existing assertion.
    pub fn almost_equals(&self, other: &Node) -> bool {
        NodeEquality::IgnoreExpiryTimeAndValue.equals(self, other)
    }

    /// A hash key for this node under `equality`.
    pub fn equality_key(&self, equality: NodeEquality) -> EqualityKey {
        EqualityKey::new(self.clone(), equality)
    }

    pub(crate) fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Serializable form of this node.
    pub fn to_data(&self) -> NodeData {
        let inner = &self.inner;
        NodeData {
            key: inner.key.clone(),
            value: inner.value,
            override_flag: inner.override_flag,
            server: inner.server.clone(),
            world: inner.world.clone(),
            expiry: inner.expire_at,
            contexts: inner.contexts.clone(),
        }
    }

    /// Rebuild a node from its serialized form.
    pub fn from_data(data: NodeData) -> Result<Node> {
        let mut builder = Node::builder(data.key)
            .value(data.value)
            .override_flag(data.override_flag)
            .expiry(data.expiry)
            .with_contexts(&data.contexts);
        if let Some(server) = data.server {
            builder = builder.server(server);
        }
        if let Some(world) = data.world {
            builder = builder.world(world);
        }
        builder.try_build()
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        NodeEquality::Exact.equals(self, other)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        NodeEquality::Exact.hash_node(self, state);
    }
}

impl AsRef<Node> for Node {
    fn as_ref(&self) -> &Node {
        self
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        let mut s = f.debug_struct("Node");
        s.field("key", &inner.key).field("value", &inner.value);
        if inner.override_flag {
            s.field("override", &true);
        }
        if inner.expire_at != 0 {
            s.field("expire_at", &inner.expire_at);
        }
        if !inner.full_contexts.is_empty() {
            s.field("contexts", &inner.full_contexts);
        }
        s.finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.inner.key, self.inner.value)?;
        if !self.inner.full_contexts.is_empty() {
            write!(f, " {}", self.inner.full_contexts)?;
        }
        Ok(())
    }
}

/// Builder for [`Node`].
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    key: String,
    value: bool,
    override_flag: bool,
    server: Option<String>,
    world: Option<String>,
    contexts: MutableContextSet,
    expire_at: u64,
    metadata: NodeMetadata,
}

impl NodeBuilder {
    /// Start a builder for `key` with value `true`, global and permanent.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: true,
            override_flag: false,
            server: None,
            world: None,
            contexts: MutableContextSet::new(),
            expire_at: 0,
            metadata: NodeMetadata::default(),
        }
    }

    /// Set the truth value.
    pub fn value(mut self, value: bool) -> Self {
        self.value = value;
        self
    }

    /// Shorthand for `value(false)`.
    pub fn negated(self) -> Self {
        self.value(false)
    }

    /// Set the override flag.
    pub fn override_flag(mut self, override_flag: bool) -> Self {
        self.override_flag = override_flag;
        self
    }

    /// Restrict to a server. `global` or an empty name clears the restriction.
    pub fn server(mut self, server: impl AsRef<str>) -> Self {
        self.server = normalize_scope(server.as_ref());
        self
    }

    /// Restrict to a world. `global` or an empty name clears the restriction.
    pub fn world(mut self, world: impl AsRef<str>) -> Self {
        self.world = normalize_scope(world.as_ref());
        self
    }

    /// Add a context entry.
    ///
    /// # Panics
    ///
    /// Panics if the key or value is empty after trimming.
    pub fn context(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.contexts.add(key, value);
        self
    }

    /// Add every entry of `contexts`.
    pub fn with_contexts(mut self, contexts: &ImmutableContextSet) -> Self {
        self.contexts.add_all(contexts);
        self
    }

    /// Replace the context set.
    pub fn contexts(mut self, contexts: &ImmutableContextSet) -> Self {
        self.contexts = contexts.to_mutable();
        self
    }

    /// Absolute expiry in unix seconds; 0 makes the node permanent.
    pub fn expiry(mut self, expire_at: u64) -> Self {
        self.expire_at = expire_at;
        self
    }

    /// Expire `seconds` after `now`.
    pub fn expiry_in(self, seconds: u64, now: u64) -> Self {
        self.expiry(now.saturating_add(seconds))
    }

    /// Make the node permanent.
    pub fn clear_expiry(self) -> Self {
        self.expiry(0)
    }

    /// Attach a metadata value.
    pub fn metadata<T: std::any::Any + Send + Sync>(mut self, key: &MetadataKey<T>, value: T) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Build the node.
    ///
    /// # Panics
    ///
    /// Panics if the key is empty. Use [`NodeBuilder::try_build`] for keys
    /// that come from untrusted input.
    pub fn build(self) -> Node {
        match self.try_build() {
            Ok(node) => node,
            Err(err) => panic!("{err}"),
        }
    }

    /// Build the node, rejecting an empty key.
    pub fn try_build(self) -> Result<Node> {
        if self.key.trim().is_empty() {
            return Err(WardenError::invalid("node key is empty"));
        }

        let contexts = self.contexts.to_immutable();
        let mut full = self.contexts;
        if let Some(server) = &self.server {
            full.try_add(SERVER_KEY, server)?;
        }
        if let Some(world) = &self.world {
            full.try_add(WORLD_KEY, world)?;
        }

        let kind = NodeKind::classify(&self.key);
        let wildcard_level = wildcard_level(&self.key);
        let collation_key = self.key.to_lowercase();
        let shorthand = if self.key.contains(['{', '(']) {
            expand_shorthand(&self.key)
        } else {
            Vec::new()
        };

        Ok(Node {
            inner: Arc::new(NodeInner {
                key: self.key,
                value: self.value,
                override_flag: self.override_flag,
                server: self.server,
                world: self.world,
                contexts,
                expire_at: self.expire_at,
                metadata: self.metadata,
                full_contexts: full.into(),
                kind,
                wildcard_level,
                collation_key,
                shorthand,
            }),
        })
    }
}

fn normalize_scope(s: &str) -> Option<String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() || s == GLOBAL_VALUE {
        None
    } else {
        Some(s)
    }
}

fn wildcard_level(key: &str) -> Option<usize> {
    if key == "*" || key.ends_with(".*") {
        Some(key.matches('.').count())
    } else {
        None
    }
}

fn default_true() -> bool {
    true
}

/// Serializable node, handed to storage collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    /// Permission key.
    pub key: String,
    /// Granted (`true`) or negated (`false`).
    #[serde(default = "default_true")]
    pub value: bool,
    /// Override flag.
    #[serde(default, rename = "override")]
    pub override_flag: bool,
    /// Server scope, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// World scope, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<String>,
    /// Expiry in unix seconds, `0` for permanent.
    #[serde(default)]
    pub expiry: u64,
    /// Remaining contexts.
    #[serde(default)]
    pub contexts: ImmutableContextSet,
}
