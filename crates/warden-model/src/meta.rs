//! Meta accumulation.
//!
//! A [`MetaAccumulator`] is folded over the holders of an inheritance
//! traversal, nearest holder first, and then frozen into [`MetaData`].
//!
//! - generic meta keeps every value per key in encounter order; reads take the
//!   first (nearest) one
//! - prefixes and suffixes are keyed by priority; the first value seen at a
//!   priority wins, reads take the highest priority
//! - the weight is the maximum weight of any traversed holder

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use warden_core::{Node, NodeKind};

/// Meta key under which the accumulated weight is exposed.
pub const WEIGHT_KEY: &str = "weight";

/// Meta key under which the primary group is exposed.
pub const PRIMARY_GROUP_KEY: &str = "primarygroup";

/// Prefix or suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMetaType {
    /// A `prefix.<priority>.<value>` node.
    Prefix,
    /// A `suffix.<priority>.<value>` node.
    Suffix,
}

/// Selector for bulk meta removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaType {
    /// Meta, prefix and suffix nodes.
    Any,
    /// Prefix and suffix nodes.
    Chat,
    /// Generic meta nodes.
    Meta,
    /// Prefix nodes.
    Prefix,
    /// Suffix nodes.
    Suffix,
}

impl MetaType {
    /// Whether `node` is selected.
    pub fn matches(self, node: &Node) -> bool {
        match (self, node.kind()) {
            (MetaType::Any, kind) => kind.is_any_meta(),
            (MetaType::Chat, NodeKind::Prefix { .. } | NodeKind::Suffix { .. }) => true,
            (MetaType::Meta, NodeKind::Meta { .. }) => true,
            (MetaType::Prefix, NodeKind::Prefix { .. }) => true,
            (MetaType::Suffix, NodeKind::Suffix { .. }) => true,
            _ => false,
        }
    }
}

impl From<ChatMetaType> for MetaType {
    fn from(value: ChatMetaType) -> Self {
        match value {
            ChatMetaType::Prefix => MetaType::Prefix,
            ChatMetaType::Suffix => MetaType::Suffix,
        }
    }
}

/// Fold state while a traversal is running.
#[derive(Debug, Clone, Default)]
pub struct MetaAccumulator {
    meta: IndexMap<String, Vec<String>>,
    prefixes: BTreeMap<i32, String>,
    suffixes: BTreeMap<i32, String>,
    weight: i32,
    primary_group: Option<String>,
}

impl MetaAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a meta, prefix or suffix node. Other nodes are ignored.
    pub fn accumulate_node(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::Meta { key, value } => self.accumulate_meta(key, value),
            NodeKind::Prefix { priority, value } => {
                self.accumulate_chat(ChatMetaType::Prefix, *priority, value);
            }
            NodeKind::Suffix { priority, value } => {
                self.accumulate_chat(ChatMetaType::Suffix, *priority, value);
            }
            _ => {}
        }
    }

    /// Append a meta value. Keys are case-insensitive.
    pub fn accumulate_meta(&mut self, key: &str, value: &str) {
        self.meta
            .entry(key.to_lowercase())
            .or_default()
            .push(value.to_string());
    }

    /// Record chat meta unless a nearer holder already set this priority.
    pub fn accumulate_chat(&mut self, chat: ChatMetaType, priority: i32, value: &str) {
        let target = match chat {
            ChatMetaType::Prefix => &mut self.prefixes,
            ChatMetaType::Suffix => &mut self.suffixes,
        };
        target.entry(priority).or_insert_with(|| value.to_string());
    }

    /// Fold a holder weight in, keeping the maximum.
    pub fn accumulate_weight(&mut self, weight: i32) {
        self.weight = self.weight.max(weight);
    }

    /// Record the primary group.
    pub fn set_primary_group(&mut self, group: impl Into<String>) {
        self.primary_group = Some(group.into());
    }

    /// Freeze the fold.
    ///
    /// Adds a `weight` meta entry for a non-zero weight and a `primarygroup`
    /// entry for a recorded primary group, unless either key was set
    /// explicitly.
    pub fn complete(mut self) -> MetaData {
        if self.weight != 0 && !self.meta.contains_key(WEIGHT_KEY) {
            self.meta
                .insert(WEIGHT_KEY.to_string(), vec![self.weight.to_string()]);
        }
        if let Some(group) = &self.primary_group {
            if !self.meta.contains_key(PRIMARY_GROUP_KEY) {
                self.meta
                    .insert(PRIMARY_GROUP_KEY.to_string(), vec![group.clone()]);
            }
        }
        MetaData {
            meta: self.meta,
            prefixes: self.prefixes,
            suffixes: self.suffixes,
            weight: self.weight,
            primary_group: self.primary_group,
        }
    }
}

/// Completed, read-only meta of a holder in one query context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    meta: IndexMap<String, Vec<String>>,
    prefixes: BTreeMap<i32, String>,
    suffixes: BTreeMap<i32, String>,
    weight: i32,
    primary_group: Option<String>,
}

impl MetaData {
    /// The nearest value for `key`.
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta_values(key).first().map(String::as_str)
    }

    /// Every value for `key`, nearest first.
    pub fn meta_values(&self, key: &str) -> &[String] {
        self.meta
            .get(&key.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All meta keys with their values, in first-seen order.
    pub fn meta(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.meta.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The highest priority prefix.
    pub fn prefix(&self) -> Option<&str> {
        self.top(ChatMetaType::Prefix)
    }

    /// The highest priority suffix.
    pub fn suffix(&self) -> Option<&str> {
        self.top(ChatMetaType::Suffix)
    }

    fn top(&self, chat: ChatMetaType) -> Option<&str> {
        self.chat(chat).last_key_value().map(|(_, v)| v.as_str())
    }

    /// Chat meta of one type by priority.
    pub fn chat(&self, chat: ChatMetaType) -> &BTreeMap<i32, String> {
        match chat {
            ChatMetaType::Prefix => &self.prefixes,
            ChatMetaType::Suffix => &self.suffixes,
        }
    }

    /// Prefixes, highest priority first.
    pub fn prefixes(&self) -> impl Iterator<Item = (i32, &str)> {
        self.prefixes.iter().rev().map(|(p, v)| (*p, v.as_str()))
    }

    /// Suffixes, highest priority first.
    pub fn suffixes(&self) -> impl Iterator<Item = (i32, &str)> {
        self.suffixes.iter().rev().map(|(p, v)| (*p, v.as_str()))
    }

    /// Highest priority recorded for one chat meta type.
    pub fn max_priority(&self, chat: ChatMetaType) -> Option<i32> {
        self.chat(chat).keys().next_back().copied()
    }

    /// Highest weight seen during accumulation, `0` if none.
    pub fn weight(&self) -> i32 {
        self.weight
    }

    /// Primary group of the user the meta was accumulated for.
    pub fn primary_group(&self) -> Option<&str> {
        self.primary_group.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::node::{meta_node, prefix_node, suffix_node};

    #[test]
    fn test_meta_nearest_value_wins() {
        let mut acc = MetaAccumulator::new();
        acc.accumulate_node(&meta_node("colour", "red").build());
        acc.accumulate_node(&meta_node("Colour", "blue").build());
        let data = acc.complete();

        assert_eq!(data.meta_value("colour"), Some("red"));
        assert_eq!(data.meta_values("COLOUR"), ["red", "blue"]);
    }

    #[test]
    fn test_chat_meta_first_per_priority_highest_read() {
        let mut acc = MetaAccumulator::new();
        acc.accumulate_node(&prefix_node(10, "[Near]").build());
        acc.accumulate_node(&prefix_node(10, "[Far]").build());
        acc.accumulate_node(&prefix_node(50, "[Top]").build());
        acc.accumulate_node(&suffix_node(1, "!").build());
        let data = acc.complete();

        assert_eq!(data.prefix(), Some("[Top]"));
        assert_eq!(data.chat(ChatMetaType::Prefix).get(&10).map(String::as_str), Some("[Near]"));
        assert_eq!(
            data.prefixes().collect::<Vec<_>>(),
            vec![(50, "[Top]"), (10, "[Near]")]
        );
        assert_eq!(data.suffix(), Some("!"));
        assert_eq!(data.max_priority(ChatMetaType::Suffix), Some(1));
    }

    #[test]
    fn test_weight_surfaces_as_meta() {
        let mut acc = MetaAccumulator::new();
        acc.accumulate_weight(5);
        acc.accumulate_weight(12);
        acc.accumulate_weight(-3);
        acc.set_primary_group("vip");
        let data = acc.complete();

        assert_eq!(data.weight(), 12);
        assert_eq!(data.meta_value(WEIGHT_KEY), Some("12"));
        assert_eq!(data.meta_value(PRIMARY_GROUP_KEY), Some("vip"));
    }

    #[test]
    fn test_explicit_weight_meta_is_kept() {
        let mut acc = MetaAccumulator::new();
        acc.accumulate_meta("weight", "99");
        acc.accumulate_weight(4);
        assert_eq!(acc.complete().meta_value("weight"), Some("99"));

        let empty = MetaAccumulator::new().complete();
        assert_eq!(empty.meta_value(WEIGHT_KEY), None);
        assert_eq!(empty.prefix(), None);
    }

    #[test]
    fn test_meta_type_matches() {
        let meta = meta_node("k", "v").build();
        let prefix = prefix_node(1, "p").build();
        let plain = Node::builder("perm").build();

        assert!(MetaType::Any.matches(&meta));
        assert!(MetaType::Chat.matches(&prefix));
        assert!(!MetaType::Chat.matches(&meta));
        assert!(MetaType::Meta.matches(&meta));
        assert!(!MetaType::Suffix.matches(&prefix));
        assert!(!MetaType::Any.matches(&plain));
    }
}
