//! Collaborators shared by every holder.

use crate::events::{EventDispatcher, NoopDispatcher};
use std::sync::Arc;
use warden_core::{Clock, PermissionsConfig, SystemClock};

/// Configuration, event dispatcher and clock handed to each holder.
#[derive(Debug, Clone)]
pub struct HolderServices {
    config: Arc<PermissionsConfig>,
    events: Arc<dyn EventDispatcher>,
    clock: Arc<dyn Clock>,
}

impl HolderServices {
    /// Services from their parts.
    pub fn new(
        config: Arc<PermissionsConfig>,
        events: Arc<dyn EventDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            events,
            clock,
        }
    }

    /// Services with `config`, no event receiver and the system clock.
    pub fn with_config(config: PermissionsConfig) -> Self {
        Self::new(Arc::new(config), Arc::new(NoopDispatcher), Arc::new(SystemClock))
    }

    /// Replace the event dispatcher.
    pub fn with_events(mut self, events: Arc<dyn EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The shared configuration.
    pub fn config(&self) -> &PermissionsConfig {
        &self.config
    }

    /// The event dispatcher.
    pub fn events(&self) -> &dyn EventDispatcher {
        self.events.as_ref()
    }

    /// Current unix time in seconds.
    pub fn now(&self) -> u64 {
        self.clock.unix_seconds()
    }
}

impl Default for HolderServices {
    fn default() -> Self {
        Self::with_config(PermissionsConfig::default())
    }
}
