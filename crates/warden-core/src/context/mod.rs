//! Context sets: the key/value constraints that scope where a node applies.
//!
//! A context set is an unordered multimap of lowercase strings. The empty set
//! is the "global" scope and is satisfied by every query.

mod set;

pub use set::{ImmutableContextSet, MutableContextSet};

use crate::errors::{Result, WardenError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Context key naming the server a node applies on.
pub const SERVER_KEY: &str = "server";

/// Context key naming the world a node applies in.
pub const WORLD_KEY: &str = "world";

/// Value of `server`/`world` entries that means "everywhere".
pub const GLOBAL_VALUE: &str = "global";

/// How a node's context set is matched against the context of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ContextSatisfyMode {
    /// Every entry of the node's set must be present in the query.
    AllValuesPerKey,
    /// For every key of the node's set, at least one of its values must be
    /// present in the query.
    #[default]
    AtLeastOneValuePerKey,
}

/// A single `key=value` context entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawContext")]
pub struct Context {
    key: String,
    value: String,
}

#[derive(Deserialize)]
struct RawContext {
    key: String,
    value: String,
}

impl TryFrom<RawContext> for Context {
    type Error = WardenError;

    fn try_from(raw: RawContext) -> Result<Self> {
        Context::new(raw.key, raw.value)
    }
}

impl Context {
    /// Create a sanitized entry. Keys and values are trimmed and lowercased.
    pub fn new(key: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let key = sanitize(key.as_ref());
        let value = sanitize(value.as_ref());
        if key.is_empty() {
            return Err(WardenError::invalid("context key is empty"));
        }
        if value.is_empty() {
            return Err(WardenError::invalid(format!(
                "context value for key '{key}' is empty"
            )));
        }
        Ok(Self { key, value })
    }

    /// The entry key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The entry value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// `server=global` and `world=global` carry no constraint.
    pub fn is_global_marker(&self) -> bool {
        (self.key == SERVER_KEY || self.key == WORLD_KEY) && self.value == GLOBAL_VALUE
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

fn sanitize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_sanitizes() {
        let ctx = Context::new("  Server ", "Survival").unwrap();
        assert_eq!(ctx.key(), "server");
        assert_eq!(ctx.value(), "survival");
        assert_eq!(ctx.to_string(), "server=survival");
    }

    #[test]
    fn test_context_rejects_empty() {
        assert!(Context::new("", "x").is_err());
        assert!(Context::new("k", "   ").is_err());
    }

    #[test]
    fn test_global_marker() {
        assert!(Context::new("server", "global").unwrap().is_global_marker());
        assert!(Context::new("world", "GLOBAL").unwrap().is_global_marker());
        assert!(!Context::new("region", "global").unwrap().is_global_marker());
    }
}
