//! In-memory group registry.

use crate::holder::PermissionHolder;
use crate::lookup::GroupLookup;
use crate::services::HolderServices;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe map of loaded groups keyed by lowercase name.
#[derive(Debug, Default)]
pub struct GroupManager {
    groups: RwLock<HashMap<String, Arc<PermissionHolder>>>,
    services: HolderServices,
}

impl GroupManager {
    /// A manager whose groups are created with `services`.
    pub fn new(services: HolderServices) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            services,
        }
    }

    /// The loaded group named `name`, creating an empty one if needed.
    pub fn get_or_make(&self, name: &str) -> Arc<PermissionHolder> {
        let key = normalize(name);
        if let Some(group) = self.groups.read().get(&key) {
            return Arc::clone(group);
        }
        let mut groups = self.groups.write();
        Arc::clone(groups.entry(key).or_insert_with_key(|key| {
            debug!(group = %key, "created group");
            Arc::new(PermissionHolder::group(key, self.services.clone()))
        }))
    }

    /// The group `name` if loaded.
    pub fn get_if_loaded(&self, name: &str) -> Option<Arc<PermissionHolder>> {
        self.groups.read().get(&normalize(name)).cloned()
    }

    /// Whether the group `name` is loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.groups.read().contains_key(&normalize(name))
    }

    /// Drop a group from memory, returning it if it was loaded.
    pub fn unload(&self, name: &str) -> Option<Arc<PermissionHolder>> {
        let removed = self.groups.write().remove(&normalize(name));
        if removed.is_some() {
            debug!(group = %normalize(name), "unloaded group");
        }
        removed
    }

    /// Every loaded group, in no particular order.
    pub fn all(&self) -> Vec<Arc<PermissionHolder>> {
        self.groups.read().values().cloned().collect()
    }

    /// Number of loaded groups.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Whether no group is loaded.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl GroupLookup for GroupManager {
    fn get_if_loaded(&self, name: &str) -> Option<Arc<PermissionHolder>> {
        GroupManager::get_if_loaded(self, name)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_make_is_case_insensitive() {
        let manager = GroupManager::default();
        let a = manager.get_or_make("Admin");
        let b = manager.get_or_make("admin");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.len(), 1);
        assert!(manager.is_loaded("ADMIN"));
    }

    #[test]
    fn test_unload() {
        let manager = GroupManager::default();
        manager.get_or_make("vip");
        assert!(manager.unload("vip").is_some());
        assert!(manager.unload("vip").is_none());
        assert!(manager.get_if_loaded("vip").is_none());
        assert!(manager.all().is_empty());
    }
}
