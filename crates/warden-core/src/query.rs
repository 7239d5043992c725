//! Query options: the context a lookup runs in and the policy flags that
//! shape the traversal.

use crate::context::{ContextSatisfyMode, ImmutableContextSet};
use serde::{Deserialize, Serialize};

/// Whether a query filters nodes by context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Only nodes whose scope is satisfied by the set apply.
    Contextual(ImmutableContextSet),
    /// Every node applies regardless of scope.
    NonContextual,
}

/// Policy toggles for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFlags {
    /// Follow inheritance edges at all.
    pub apply_groups: bool,
    /// Include nodes that do not name a server.
    pub include_global: bool,
    /// Include nodes that do not name a world.
    pub include_global_world: bool,
    /// Follow inheritance edges that do not name a server.
    pub apply_global_groups: bool,
    /// Follow inheritance edges that do not name a world.
    pub apply_global_world_groups: bool,
}

impl Default for QueryFlags {
    fn default() -> Self {
        Self {
            apply_groups: true,
            include_global: true,
            include_global_world: true,
            apply_global_groups: true,
            apply_global_world_groups: true,
        }
    }
}

/// The context and policy a lookup runs with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryOptions {
    mode: QueryMode,
    satisfy_mode: ContextSatisfyMode,
    flags: QueryFlags,
}

impl QueryOptions {
    /// A contextual query with default flags.
    pub fn contextual(contexts: ImmutableContextSet) -> Self {
        Self {
            mode: QueryMode::Contextual(contexts),
            satisfy_mode: ContextSatisfyMode::default(),
            flags: QueryFlags::default(),
        }
    }

    /// A non-contextual query with default flags.
    pub fn non_contextual() -> Self {
        Self {
            mode: QueryMode::NonContextual,
            satisfy_mode: ContextSatisfyMode::default(),
            flags: QueryFlags::default(),
        }
    }

    /// Builder starting from contextual global defaults.
    pub fn builder() -> QueryOptionsBuilder {
        QueryOptionsBuilder {
            options: Self::non_contextual(),
        }
    }

    /// Builder starting from these options.
    pub fn to_builder(&self) -> QueryOptionsBuilder {
        QueryOptionsBuilder {
            options: self.clone(),
        }
    }

    /// Contextual or non-contextual mode.
    pub fn mode(&self) -> &QueryMode {
        &self.mode
    }

    /// The query contexts of a contextual query.
    pub fn contexts(&self) -> Option<&ImmutableContextSet> {
        match &self.mode {
            QueryMode::Contextual(contexts) => Some(contexts),
            QueryMode::NonContextual => None,
        }
    }

    /// How node scopes must match the query contexts.
    pub fn satisfy_mode(&self) -> ContextSatisfyMode {
        self.satisfy_mode
    }

    /// Policy flags.
    pub fn flags(&self) -> QueryFlags {
        self.flags
    }

    /// Whether a node scoped to `scope` applies to this query.
    pub fn satisfies(&self, scope: &ImmutableContextSet) -> bool {
        match &self.mode {
            QueryMode::Contextual(contexts) => scope.is_satisfied_by(contexts, self.satisfy_mode),
            QueryMode::NonContextual => true,
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::non_contextual()
    }
}

/// Builder for [`QueryOptions`].
#[derive(Debug, Clone)]
pub struct QueryOptionsBuilder {
    options: QueryOptions,
}

impl QueryOptionsBuilder {
    /// Set the mode.
    pub fn mode(mut self, mode: QueryMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Make the query contextual on `contexts`.
    pub fn contexts(self, contexts: ImmutableContextSet) -> Self {
        self.mode(QueryMode::Contextual(contexts))
    }

    /// Set the satisfy mode.
    pub fn satisfy_mode(mut self, satisfy_mode: ContextSatisfyMode) -> Self {
        self.options.satisfy_mode = satisfy_mode;
        self
    }

    /// Replace all flags.
    pub fn flags(mut self, flags: QueryFlags) -> Self {
        self.options.flags = flags;
        self
    }

    /// Follow inheritance edges at all.
    pub fn apply_groups(mut self, value: bool) -> Self {
        self.options.flags.apply_groups = value;
        self
    }

    /// Include nodes that name no server.
    pub fn include_global(mut self, value: bool) -> Self {
        self.options.flags.include_global = value;
        self
    }

    /// Include nodes that name no world.
    pub fn include_global_world(mut self, value: bool) -> Self {
        self.options.flags.include_global_world = value;
        self
    }

    /// Follow inheritance edges that name no server.
    pub fn apply_global_groups(mut self, value: bool) -> Self {
        self.options.flags.apply_global_groups = value;
        self
    }

    /// Follow inheritance edges that name no world.
    pub fn apply_global_world_groups(mut self, value: bool) -> Self {
        self.options.flags.apply_global_world_groups = value;
        self
    }

    /// Finish.
    pub fn build(self) -> QueryOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_contextual_satisfies_every_scope() {
        let q = QueryOptions::non_contextual();
        assert!(q.satisfies(&ImmutableContextSet::of("server", "x")));
        assert!(q.contexts().is_none());
    }

    #[test]
    fn test_contextual_filters_scope() {
        let q = QueryOptions::contextual(ImmutableContextSet::of("server", "creative"));
        assert!(q.satisfies(&ImmutableContextSet::empty()));
        assert!(q.satisfies(&ImmutableContextSet::of("server", "creative")));
        assert!(!q.satisfies(&ImmutableContextSet::of("server", "survival")));
    }

    #[test]
    fn test_builder_sets_flags() {
        let q = QueryOptions::builder()
            .contexts(ImmutableContextSet::empty())
            .apply_groups(false)
            .include_global_world(false)
            .satisfy_mode(ContextSatisfyMode::AllValuesPerKey)
            .build();
        assert!(!q.flags().apply_groups);
        assert!(!q.flags().include_global_world);
        assert!(q.flags().include_global);
        assert_eq!(q.satisfy_mode(), ContextSatisfyMode::AllValuesPerKey);
        assert_eq!(q.contexts(), Some(&ImmutableContextSet::empty()));
    }
}
