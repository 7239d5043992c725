//! Node classification and the key grammar for special nodes.
//!
//! A node key is classified once, case-insensitively, by prefix:
//!
//! | key                   | kind                          |
//! |-----------------------|-------------------------------|
//! | `group.<name>`        | [`NodeKind::Inheritance`]     |
//! | `meta.<k>.<v>`        | [`NodeKind::Meta`]            |
//! | `prefix.<n>.<v>`      | [`NodeKind::Prefix`]          |
//! | `suffix.<n>.<v>`      | [`NodeKind::Suffix`]          |
//! | `weight.<n>`          | [`NodeKind::Weight`]          |
//! | `displayname.<name>`  | [`NodeKind::DisplayName`]     |
//!
//! Everything else is a plain [`NodeKind::Permission`].

use super::NodeBuilder;
use serde::{Deserialize, Serialize};

pub(crate) const GROUP_MARKER: &str = "group.";
pub(crate) const META_MARKER: &str = "meta.";
pub(crate) const PREFIX_MARKER: &str = "prefix.";
pub(crate) const SUFFIX_MARKER: &str = "suffix.";
pub(crate) const WEIGHT_MARKER: &str = "weight.";
pub(crate) const DISPLAY_NAME_MARKER: &str = "displayname.";

/// Priority given to chat meta created through [`meta_node`] with a
/// `prefix`/`suffix` key.
pub const DEFAULT_CHAT_META_PRIORITY: i32 = 100;

const DELIMITERS: [char; 4] = ['.', '/', '-', '$'];

/// What a node key denotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A plain permission.
    Permission,
    /// An inheritance edge to a group.
    Inheritance { group: String },
    /// A generic meta key/value pair.
    Meta { key: String, value: String },
    /// A chat prefix at a priority.
    Prefix { priority: i32, value: String },
    /// A chat suffix at a priority.
    Suffix { priority: i32, value: String },
    /// A group weight.
    Weight { weight: i32 },
    /// A display name for the owning group.
    DisplayName { name: String },
}

impl NodeKind {
    /// Classify a node key.
    pub fn classify(key: &str) -> NodeKind {
        let lower = key.to_lowercase();

        if let Some(group) = lower.strip_prefix(GROUP_MARKER) {
            if !group.is_empty() {
                return NodeKind::Inheritance {
                    group: group.to_string(),
                };
            }
        }

        if let Some(rest) = strip_prefix_ignore_case(key, META_MARKER) {
            if let Some((k, v)) = split_unescaped(rest) {
                return NodeKind::Meta {
                    key: unescape_characters(k),
                    value: unescape_characters(v),
                };
            }
        }

        if let Some(rest) = strip_prefix_ignore_case(key, PREFIX_MARKER) {
            if let Some((priority, value)) = parse_chat(rest) {
                return NodeKind::Prefix { priority, value };
            }
        }

        if let Some(rest) = strip_prefix_ignore_case(key, SUFFIX_MARKER) {
            if let Some((priority, value)) = parse_chat(rest) {
                return NodeKind::Suffix { priority, value };
            }
        }

        if let Some(weight) = lower.strip_prefix(WEIGHT_MARKER) {
            if let Ok(weight) = weight.parse::<i32>() {
                return NodeKind::Weight { weight };
            }
        }

        if let Some(name) = strip_prefix_ignore_case(key, DISPLAY_NAME_MARKER) {
            return NodeKind::DisplayName {
                name: name.to_string(),
            };
        }

        NodeKind::Permission
    }

    /// Whether this is an inheritance edge.
    pub fn is_inheritance(&self) -> bool {
        matches!(self, NodeKind::Inheritance { .. })
    }

    /// Whether this is a meta, prefix or suffix node.
    pub fn is_any_meta(&self) -> bool {
        matches!(
            self,
            NodeKind::Meta { .. } | NodeKind::Prefix { .. } | NodeKind::Suffix { .. }
        )
    }
}

fn strip_prefix_ignore_case<'a>(key: &'a str, marker: &str) -> Option<&'a str> {
    let head = key.get(..marker.len())?;
    if head.eq_ignore_ascii_case(marker) {
        key.get(marker.len()..)
    } else {
        None
    }
}

fn parse_chat(rest: &str) -> Option<(i32, String)> {
    let (priority, value) = split_unescaped(rest)?;
    let priority = priority.parse::<i32>().ok()?;
    Some((priority, unescape_characters(value)))
}

/// Split on the first `.` that is not preceded by a backslash.
fn split_unescaped(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    let idx = bytes
        .iter()
        .enumerate()
        .position(|(i, b)| *b == b'.' && (i == 0 || bytes[i - 1] != b'\\'))?;
    Some((&s[..idx], &s[idx + 1..]))
}

/// Escape the characters with a special meaning in node keys.
pub fn escape_characters(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if DELIMITERS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// The inverse of [`escape_characters`]. Also understands the legacy
/// `{SEP}`, `{FSEP}` and `{DSEP}` tokens.
pub fn unescape_characters(s: &str) -> String {
    let mut s = s
        .replace("{SEP}", ".")
        .replace("{FSEP}", "/")
        .replace("{DSEP}", "$");
    for delim in DELIMITERS {
        s = s.replace(&format!("\\{delim}"), &delim.to_string());
    }
    s
}

/// Builder for an inheritance node on `group`.
pub fn group_node(group: &str) -> NodeBuilder {
    NodeBuilder::new(format!("{GROUP_MARKER}{}", group.to_lowercase()))
}

/// Builder for a meta node. `prefix` and `suffix` keys produce chat meta at
/// [`DEFAULT_CHAT_META_PRIORITY`].
pub fn meta_node(key: &str, value: &str) -> NodeBuilder {
    if key.eq_ignore_ascii_case("prefix") {
        return prefix_node(DEFAULT_CHAT_META_PRIORITY, value);
    }
    if key.eq_ignore_ascii_case("suffix") {
        return suffix_node(DEFAULT_CHAT_META_PRIORITY, value);
    }
    NodeBuilder::new(format!(
        "{META_MARKER}{}.{}",
        escape_characters(key),
        escape_characters(value)
    ))
}

/// Builder for a prefix node.
pub fn prefix_node(priority: i32, value: &str) -> NodeBuilder {
    NodeBuilder::new(format!("{PREFIX_MARKER}{priority}.{}", escape_characters(value)))
}

/// Builder for a suffix node.
pub fn suffix_node(priority: i32, value: &str) -> NodeBuilder {
    NodeBuilder::new(format!("{SUFFIX_MARKER}{priority}.{}", escape_characters(value)))
}

/// Builder for a weight node.
pub fn weight_node(weight: i32) -> NodeBuilder {
    NodeBuilder::new(format!("{WEIGHT_MARKER}{weight}"))
}

/// Builder for a display name node.
pub fn display_name_node(name: &str) -> NodeBuilder {
    NodeBuilder::new(format!("{DISPLAY_NAME_MARKER}{name}"))
}
