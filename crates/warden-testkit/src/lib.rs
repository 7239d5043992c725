//! Warden Testing Infrastructure
//!
//! Shared fixtures for the warden crates' integration tests: a clock that
//! only moves when told to, event dispatchers that record or misbehave, a
//! [`TestWorld`] bundling a group manager with its services, and proptest
//! strategies for nodes and context sets.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,no_run
//! use warden_testkit::*;
//!
//! let world = TestWorld::new();
//! let vip = world.weighted_group("vip", 10);
//! let user = world.user("Notch");
//! ```

/// Manually driven clock.
pub mod clock;
/// Recording and misbehaving event dispatchers.
pub mod dispatcher;
/// Proptest strategies.
pub mod strategies;
/// World fixture.
pub mod world;

pub use clock::ManualClock;
pub use dispatcher::{FailingDispatcher, PanickingDispatcher, RecordedEvent, RecordingDispatcher};
pub use world::TestWorld;

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber honouring `RUST_LOG`, once per process.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
