//! Group resolution seam used by inheritance traversal.

use crate::holder::PermissionHolder;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves group names to loaded groups.
///
/// Absence is a normal outcome: traversal skips groups that are not loaded.
pub trait GroupLookup: Send + Sync {
    /// The loaded group named `name` (lowercase), if any.
    fn get_if_loaded(&self, name: &str) -> Option<Arc<PermissionHolder>>;
}

impl<T: GroupLookup + ?Sized> GroupLookup for &T {
    fn get_if_loaded(&self, name: &str) -> Option<Arc<PermissionHolder>> {
        (**self).get_if_loaded(name)
    }
}

impl<T: GroupLookup + ?Sized> GroupLookup for Arc<T> {
    fn get_if_loaded(&self, name: &str) -> Option<Arc<PermissionHolder>> {
        (**self).get_if_loaded(name)
    }
}

impl GroupLookup for HashMap<String, Arc<PermissionHolder>> {
    fn get_if_loaded(&self, name: &str) -> Option<Arc<PermissionHolder>> {
        self.get(name).cloned()
    }
}

/// Lookup that knows no groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGroups;

impl GroupLookup for NoGroups {
    fn get_if_loaded(&self, _name: &str) -> Option<Arc<PermissionHolder>> {
        None
    }
}
