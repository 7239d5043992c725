//! Warden Model - holders and resolution
//!
//! Builds on the value types in `warden-core`:
//!
//! - `nodemap`: scope-bucketed, priority-sorted node storage with lock-free
//!   snapshots
//! - `holder`: users and groups, their mutations and inheritance queries
//! - `meta`: meta accumulation across a traversal
//! - `events`, `lookup`, `services`: the seams to the rest of a deployment
//! - `manager`: an in-memory group registry
//! - `track`: ordered group ladders

#![forbid(unsafe_code)]

/// Event dispatch and state listeners
pub mod events;

/// Group specific state
pub mod group;

/// Permission holders
pub mod holder;

/// Holder identity
pub mod identifier;

/// Group resolution seam
pub mod lookup;

/// In-memory group registry
pub mod manager;

/// Meta accumulation
pub mod meta;

/// Node storage
pub mod nodemap;

/// Mutation and lookup outcomes
pub mod results;

/// Collaborators shared by holders
pub mod services;

/// Group ladders
pub mod track;

/// User specific state
pub mod user;

pub use events::{DispatchError, EventDispatcher, NodeMutation, NoopDispatcher, StateListener};
pub use group::GroupState;
pub use holder::{DedupeStrategy, PermissionHolder, Subject};
pub use identifier::{HolderIdentifier, HolderType};
pub use lookup::{GroupLookup, NoGroups};
pub use manager::GroupManager;
pub use meta::{ChatMetaType, MetaAccumulator, MetaData, MetaType};
pub use nodemap::{NodeMap, NodeMapSnapshot, NodeMapType};
pub use results::{DataMutateResult, InheritanceInfo, TemporaryMergeResult};
pub use services::HolderServices;
pub use track::Track;
pub use user::{UserState, DEFAULT_GROUP};
