use super::{Context, ContextSatisfyMode, SERVER_KEY, WORLD_KEY};
use crate::errors::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

static EMPTY: Lazy<ImmutableContextSet> = Lazy::new(|| ImmutableContextSet {
    entries: Arc::from(Vec::new()),
});

/// An immutable, sorted and de-duplicated context set.
///
/// Cloning is cheap; the entries are shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<Context>", into = "Vec<Context>")]
pub struct ImmutableContextSet {
    entries: Arc<[Context]>,
}

impl ImmutableContextSet {
    /// The global (empty) context set.
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    /// A set holding one entry.
    ///
    /// # Panics
    ///
    /// Panics if the key or value is empty after trimming.
    pub fn of(key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        MutableContextSet::new().with(key, value).to_immutable()
    }

    /// Start building a set.
    pub fn builder() -> MutableContextSet {
        MutableContextSet::new()
    }

    fn from_sorted(entries: Vec<Context>) -> Self {
        if entries.is_empty() {
            return Self::empty();
        }
        Self {
            entries: Arc::from(entries),
        }
    }

    /// Whether this is the global set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in key/value order.
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.entries.iter()
    }

    /// Entries as a slice, in key/value order.
    pub fn as_slice(&self) -> &[Context] {
        &self.entries
    }

    /// Whether any entry has this key.
    pub fn contains_key(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.entries
            .binary_search_by(|c| c.key.as_str().cmp(key.as_str()))
            .is_ok()
    }

    /// Whether the exact entry is present.
    pub fn contains(&self, key: &str, value: &str) -> bool {
        let key = key.to_lowercase();
        let value = value.to_lowercase();
        self.entries
            .binary_search_by(|c| (c.key.as_str(), c.value.as_str()).cmp(&(key.as_str(), value.as_str())))
            .is_ok()
    }

    /// All values recorded for a key.
    pub fn values(&self, key: &str) -> Vec<&str> {
        let key = key.to_lowercase();
        self.entries
            .iter()
            .filter(|c| c.key == key)
            .map(|c| c.value.as_str())
            .collect()
    }

    /// Whether this set has a `server` entry.
    pub fn has_server(&self) -> bool {
        self.contains_key(SERVER_KEY)
    }

    /// Whether this set has a `world` entry.
    pub fn has_world(&self) -> bool {
        self.contains_key(WORLD_KEY)
    }

    /// Whether a query carrying `other` satisfies the constraints of this set.
    pub fn is_satisfied_by(&self, other: &ImmutableContextSet, mode: ContextSatisfyMode) -> bool {
        if self.is_empty() {
            return true;
        }
        match mode {
            ContextSatisfyMode::AllValuesPerKey => self
                .entries
                .iter()
                .all(|c| other.contains(&c.key, &c.value)),
            ContextSatisfyMode::AtLeastOneValuePerKey => {
                let entries = &self.entries;
                let mut i = 0;
                while i < entries.len() {
                    let key = &entries[i].key;
                    let mut satisfied = false;
                    while i < entries.len() && &entries[i].key == key {
                        satisfied |= other.contains(key, &entries[i].value);
                        i += 1;
                    }
                    if !satisfied {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// A mutable copy of this set.
    pub fn to_mutable(&self) -> MutableContextSet {
        MutableContextSet {
            entries: self.entries.iter().cloned().collect(),
        }
    }

    /// The union of two sets.
    pub fn union(&self, other: &ImmutableContextSet) -> ImmutableContextSet {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut set = self.to_mutable();
        set.add_all(other);
        set.to_immutable()
    }
}

impl Default for ImmutableContextSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Context>> for ImmutableContextSet {
    fn from(entries: Vec<Context>) -> Self {
        let set: BTreeSet<Context> = entries
            .into_iter()
            .filter(|c| !c.is_global_marker())
            .collect();
        Self::from_sorted(set.into_iter().collect())
    }
}

impl From<ImmutableContextSet> for Vec<Context> {
    fn from(set: ImmutableContextSet) -> Self {
        set.entries.to_vec()
    }
}

impl fmt::Debug for ImmutableContextSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImmutableContextSet({self})")
    }
}

impl fmt::Display for ImmutableContextSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "global");
        }
        let parts: Vec<String> = self.entries.iter().map(ToString::to_string).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// A mutable context set, used to build [`ImmutableContextSet`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutableContextSet {
    entries: BTreeSet<Context>,
}

impl MutableContextSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, validating it.
    ///
    /// `server=global` and `world=global` are accepted and ignored.
    pub fn try_add(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Result<&mut Self> {
        let context = Context::new(key, value)?;
        if !context.is_global_marker() {
            self.entries.insert(context);
        }
        Ok(self)
    }

    /// Add an entry.
    ///
    /// # Panics
    ///
    /// Panics if the key or value is empty after trimming.
    pub fn add(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> &mut Self {
        let (key, value) = (key.as_ref(), value.as_ref());
        if let Err(err) = self.try_add(key, value) {
            panic!("invalid context entry '{key}={value}': {err}");
        }
        self
    }

    /// By-value variant of [`MutableContextSet::add`].
    ///
    /// # Panics
    ///
    /// Panics if the key or value is empty after trimming.
    pub fn with(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.add(key, value);
        self
    }

    /// Add every entry of another set.
    pub fn add_all(&mut self, other: &ImmutableContextSet) -> &mut Self {
        self.entries.extend(other.iter().cloned());
        self
    }

    /// Remove every entry with this key.
    pub fn remove_all(&mut self, key: &str) -> &mut Self {
        let key = key.to_lowercase();
        self.entries.retain(|c| c.key != key);
        self
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze into an immutable set.
    pub fn to_immutable(&self) -> ImmutableContextSet {
        ImmutableContextSet::from_sorted(self.entries.iter().cloned().collect())
    }
}

impl From<MutableContextSet> for ImmutableContextSet {
    fn from(set: MutableContextSet) -> Self {
        ImmutableContextSet::from_sorted(set.entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(pairs: &[(&str, &str)]) -> ImmutableContextSet {
        let mut builder = ImmutableContextSet::builder();
        for (k, v) in pairs {
            builder.add(k, v);
        }
        builder.to_immutable()
    }

    #[test]
    fn test_empty_is_satisfied_by_anything() {
        let empty = ImmutableContextSet::empty();
        assert!(empty.is_satisfied_by(&set(&[("server", "a")]), ContextSatisfyMode::AllValuesPerKey));
        assert!(empty.is_satisfied_by(&empty, ContextSatisfyMode::AtLeastOneValuePerKey));
    }

    #[test]
    fn test_global_markers_dropped() {
        let s = set(&[("server", "global"), ("world", "Global"), ("region", "eu")]);
        assert_eq!(s.len(), 1);
        assert!(s.contains("region", "eu"));
        assert!(!s.has_server());
    }

    #[test]
    fn test_entries_sorted_and_deduplicated() {
        let s = set(&[("b", "2"), ("a", "1"), ("b", "2"), ("B", "1")]);
        let entries: Vec<String> = s.iter().map(ToString::to_string).collect();
        assert_eq!(entries, vec!["a=1", "b=1", "b=2"]);
    }

    #[test]
    fn test_satisfy_modes_differ_on_multi_value_keys() {
        let node_scope = set(&[("server", "a"), ("server", "b")]);
        let query = set(&[("server", "a")]);

        assert!(node_scope.is_satisfied_by(&query, ContextSatisfyMode::AtLeastOneValuePerKey));
        assert!(!node_scope.is_satisfied_by(&query, ContextSatisfyMode::AllValuesPerKey));
    }

    #[test]
    fn test_scope_not_satisfied_by_other_value() {
        let survival = set(&[("server", "survival")]);
        let creative = set(&[("server", "creative")]);
        assert!(!survival.is_satisfied_by(&creative, ContextSatisfyMode::AtLeastOneValuePerKey));
        assert!(!survival.is_satisfied_by(&ImmutableContextSet::empty(), ContextSatisfyMode::AllValuesPerKey));
    }

    #[test]
    fn test_union_and_display() {
        let a = set(&[("server", "a")]);
        let b = set(&[("world", "nether")]);
        let u = a.union(&b);
        assert_eq!(u.to_string(), "{server=a, world=nether}");
        assert_eq!(ImmutableContextSet::empty().to_string(), "global");
    }

    #[test]
    fn test_serde_round_trip_sanitizes() {
        let json = r#"[{"key":"World","value":"Nether"},{"key":"server","value":"global"}]"#;
        let parsed: ImmutableContextSet = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, set(&[("world", "nether")]));
    }

    #[test]
    #[should_panic(expected = "invalid context entry")]
    fn test_add_panics_on_empty_key() {
        ImmutableContextSet::builder().add("", "x");
    }

    proptest! {
        #[test]
        fn prop_set_satisfies_itself(pairs in prop::collection::vec(("[a-c]{1,2}", "[x-z]{1,2}"), 0..6)) {
            let mut builder = ImmutableContextSet::builder();
            for (k, v) in &pairs {
                builder.add(k, v);
            }
            let s = builder.to_immutable();
            prop_assert!(s.is_satisfied_by(&s, ContextSatisfyMode::AllValuesPerKey));
            prop_assert!(s.is_satisfied_by(&s, ContextSatisfyMode::AtLeastOneValuePerKey));
        }
    }
}
