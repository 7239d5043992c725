//! A small permission world for integration tests.

use crate::clock::ManualClock;
use crate::dispatcher::RecordingDispatcher;
use std::sync::Arc;
use uuid::Uuid;
use warden_core::node::{group_node, weight_node};
use warden_core::PermissionsConfig;
use warden_model::{GroupManager, HolderServices, PermissionHolder};

/// Config, a manual clock, a recording dispatcher and a group manager whose
/// groups share them.
#[derive(Debug)]
pub struct TestWorld {
    /// Clock shared by every holder.
    pub clock: Arc<ManualClock>,
    /// Every event emitted by every holder.
    pub events: Arc<RecordingDispatcher>,
    /// Loaded groups.
    pub groups: GroupManager,
    services: HolderServices,
}

impl TestWorld {
    /// World with the default config.
    pub fn new() -> Self {
        Self::with_config(PermissionsConfig::default())
    }

    /// World with `config`.
    pub fn with_config(config: PermissionsConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let events = Arc::new(RecordingDispatcher::new());
        let services = HolderServices::new(Arc::new(config), events.clone(), clock.clone());
        Self {
            clock,
            events,
            groups: GroupManager::new(services.clone()),
            services,
        }
    }

    /// Services for holders created outside the world.
    pub fn services(&self) -> HolderServices {
        self.services.clone()
    }

    /// Current instant of the world clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// The loaded group `name`, created empty if needed.
    pub fn group(&self, name: &str) -> Arc<PermissionHolder> {
        self.groups.get_or_make(name)
    }

    /// A group loaded with a `weight.N` node.
    pub fn weighted_group(&self, name: &str, weight: i32) -> Arc<PermissionHolder> {
        let group = self.group(name);
        group.set_enduring_nodes(vec![weight_node(weight).build()]);
        group
    }

    /// Make `child` inherit `parent` globally.
    pub fn inherit(&self, child: &PermissionHolder, parent: &str) {
        child.set_permission(group_node(parent).build());
    }

    /// A user with a random uuid.
    pub fn user(&self, name: &str) -> PermissionHolder {
        PermissionHolder::user(Uuid::new_v4(), Some(name), self.services())
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}
