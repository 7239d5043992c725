//! Typed auxiliary data attached to nodes.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A typed key into [`NodeMetadata`].
pub struct MetadataKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> MetadataKey<T> {
    /// Create a key. Keys with the same name and value type address the
    /// same slot.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Name of the key.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn slot(&self) -> (&'static str, TypeId) {
        (self.name, TypeId::of::<T>())
    }
}

impl<T> Clone for MetadataKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MetadataKey<T> {}

impl<T> fmt::Debug for MetadataKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MetadataKey").field(&self.name).finish()
    }
}

/// Side map of typed values. Never part of node equality.
#[derive(Clone, Default)]
pub struct NodeMetadata {
    values: HashMap<(&'static str, TypeId), Arc<dyn Any + Send + Sync>>,
}

impl NodeMetadata {
    /// Look up a value.
    pub fn get<T: Any + Send + Sync>(&self, key: &MetadataKey<T>) -> Option<&T> {
        self.values.get(&key.slot())?.downcast_ref::<T>()
    }

    /// Store a value, replacing any previous value for the key.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: &MetadataKey<T>, value: T) {
        self.values.insert(key.slot(), Arc::new(value));
    }

    /// Drop a value.
    pub fn remove<T: Any + Send + Sync>(&mut self, key: &MetadataKey<T>) -> bool {
        self.values.remove(&key.slot()).is_some()
    }

    /// Whether a value is present.
    pub fn contains<T: Any + Send + Sync>(&self, key: &MetadataKey<T>) -> bool {
        self.values.contains_key(&key.slot())
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for NodeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.values.keys().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}
