//! Warden Core - permission value model
//!
//! Leaf types shared by every warden crate. Nothing here knows about
//! holders or inheritance; those live in `warden-model`.
//!
//! # Modules
//!
//! - `context`: context entries and the sets that scope nodes
//! - `node`: immutable nodes, their builder, classification and equality
//! - `comparator`: priority orderings over nodes and context sets
//! - `config`: read-only policy loaded from TOML/JSON
//! - `query`: the context and flags a lookup runs with
//! - `cache`, `time`, `tristate`, `errors`: supporting types

#![forbid(unsafe_code)]

/// Memo cells for per-holder derived values
pub mod cache;

/// Priority orderings
pub mod comparator;

/// Permission policy
pub mod config;

/// Context entries and sets
pub mod context;

/// Unified error handling
pub mod errors;

/// Node value model
pub mod node;

/// Query options
pub mod query;

/// Time source for expiry checks
pub mod time;

/// Three-valued lookup results
pub mod tristate;

pub use cache::Memo;
pub use comparator::{
    sort_highest_first, ContextSetComparator, NodeComparator, NodeWithContextComparator,
};
pub use config::{ConfigLoad, PermissionsConfig, PrimaryGroupStrategy, TemporaryModifier};
pub use context::{
    Context, ContextSatisfyMode, ImmutableContextSet, MutableContextSet, SERVER_KEY, WORLD_KEY,
};
pub use errors::{Result, WardenError};
pub use node::{LocalizedNode, Node, NodeBuilder, NodeData, NodeEquality, NodeKind};
pub use query::{QueryFlags, QueryMode, QueryOptions, QueryOptionsBuilder};
pub use time::{Clock, SystemClock};
pub use tristate::Tristate;
