//! Read-only permission policy.
//!
//! Loaded once from TOML or JSON, optionally overridden from `WARDEN_*`
//! environment variables, validated, then shared by every holder behind an
//! `Arc`.

use crate::context::{ContextSatisfyMode, ImmutableContextSet};
use crate::errors::{Result, WardenError};
use crate::query::{QueryFlags, QueryOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Prefix of environment variables read by [`ConfigLoad::merge_with_env`].
pub const ENV_PREFIX: &str = "WARDEN_";

/// How a temporary node is merged with an existing almost-equal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemporaryModifier {
    /// Add the new node's remaining time to the existing expiry.
    Accumulate,
    /// Keep whichever node expires later.
    Replace,
    /// The existing node blocks the new one.
    #[default]
    Deny,
}

/// How a user's primary group is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimaryGroupStrategy {
    /// The group stored on the user.
    Stored,
    /// The highest ranked group the user inherits directly.
    #[default]
    ParentsByWeight,
    /// The highest ranked group anywhere in the user's inheritance tree.
    AllParentsByWeight,
}

/// Loading and validation shared by configuration types.
pub trait ConfigLoad: Clone + Default + Send + Sync + 'static {
    /// Load from a `.toml` or `.json` file.
    fn load_from_file(path: &Path) -> Result<Self>;

    /// Apply overrides from `WARDEN_*` environment variables.
    fn merge_with_env(&mut self) -> Result<()>;

    /// Set a single value by name.
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Check invariants and normalize.
    fn validate(&mut self) -> Result<()>;
}

/// Permission policy consumed during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Follow inheritance edges that do not name a server.
    pub apply_global_groups: bool,
    /// Follow inheritance edges that do not name a world.
    pub apply_global_world_groups: bool,
    /// Include nodes that do not name a server.
    pub include_global: bool,
    /// Include nodes that do not name a world.
    pub include_global_world: bool,
    /// Expand shorthand keys when exporting and checking permissions.
    pub apply_shorthand: bool,
    /// Merge policy used by `set_permission_default`.
    pub temporary_add_behaviour: TemporaryModifier,
    /// How `primary_group` picks a user's primary group.
    pub primary_group_calculation: PrimaryGroupStrategy,
    /// How query contexts must match node scopes.
    pub context_satisfy_mode: ContextSatisfyMode,
    /// Weight of groups that carry no `weight.N` node.
    pub group_weights: HashMap<String, i32>,
    /// Display name of groups that carry no `displayname.X` node.
    pub group_name_rewrite: HashMap<String, String>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            apply_global_groups: true,
            apply_global_world_groups: true,
            include_global: true,
            include_global_world: true,
            apply_shorthand: true,
            temporary_add_behaviour: TemporaryModifier::default(),
            primary_group_calculation: PrimaryGroupStrategy::default(),
            context_satisfy_mode: ContextSatisfyMode::default(),
            group_weights: HashMap::new(),
            group_name_rewrite: HashMap::new(),
        }
    }
}

impl PermissionsConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut config: PermissionsConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WARDEN_*` overrides from an explicit variable list.
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key = key.to_lowercase();
            if Self::is_known_key(&key) {
                self.set_from_string(&key, &value)?;
                debug!(key = %key, "applied environment override");
            }
        }
        Ok(())
    }

    fn is_known_key(key: &str) -> bool {
        matches!(
            key,
            "apply_global_groups"
                | "apply_global_world_groups"
                | "include_global"
                | "include_global_world"
                | "apply_shorthand"
                | "temporary_add_behaviour"
                | "primary_group_calculation"
                | "context_satisfy_mode"
        )
    }

    /// The flags a query gets unless the caller overrides them.
    pub fn query_flags(&self) -> QueryFlags {
        QueryFlags {
            apply_groups: true,
            include_global: self.include_global,
            include_global_world: self.include_global_world,
            apply_global_groups: self.apply_global_groups,
            apply_global_world_groups: self.apply_global_world_groups,
        }
    }

    /// Default query options for `contexts`.
    pub fn query_options(&self, contexts: ImmutableContextSet) -> QueryOptions {
        QueryOptions::builder()
            .contexts(contexts)
            .satisfy_mode(self.context_satisfy_mode)
            .flags(self.query_flags())
            .build()
    }

    /// Default query options for the global context.
    pub fn global_query_options(&self) -> QueryOptions {
        self.query_options(ImmutableContextSet::empty())
    }

    /// Static fallback weight for a group.
    pub fn group_weight(&self, group: &str) -> Option<i32> {
        self.group_weights.get(group).copied()
    }

    /// Static display name rewrite for a group.
    pub fn group_name_rewrite(&self, group: &str) -> Option<&str> {
        self.group_name_rewrite.get(group).map(String::as_str)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(WardenError::config(format!(
            "invalid boolean '{other}' for {key}"
        ))),
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    let normalized = value.trim().to_lowercase().replace('_', "-");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|e| WardenError::config(format!("invalid value '{value}' for {key}: {e}")))
}

impl ConfigLoad for PermissionsConfig {
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: PermissionsConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(WardenError::config(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };
        config.validate()?;
        info!(
            path = %path.display(),
            group_weights = config.group_weights.len(),
            rewrites = config.group_name_rewrite.len(),
            "loaded permissions config"
        );
        Ok(config)
    }

    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())?;
        self.validate()
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "apply_global_groups" => self.apply_global_groups = parse_bool(key, value)?,
            "apply_global_world_groups" => self.apply_global_world_groups = parse_bool(key, value)?,
            "include_global" => self.include_global = parse_bool(key, value)?,
            "include_global_world" => self.include_global_world = parse_bool(key, value)?,
            "apply_shorthand" => self.apply_shorthand = parse_bool(key, value)?,
            "temporary_add_behaviour" => self.temporary_add_behaviour = parse_enum(key, value)?,
            "primary_group_calculation" => self.primary_group_calculation = parse_enum(key, value)?,
            "context_satisfy_mode" => self.context_satisfy_mode = parse_enum(key, value)?,
            _ => return Err(WardenError::config(format!("unknown config key: {key}"))),
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.group_weights.keys().any(|k| k.trim().is_empty()) {
            return Err(WardenError::config("group_weights contains an empty group name"));
        }
        if self.group_name_rewrite.keys().any(|k| k.trim().is_empty()) {
            return Err(WardenError::config(
                "group_name_rewrite contains an empty group name",
            ));
        }
        self.group_weights = std::mem::take(&mut self.group_weights)
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .collect();
        self.group_name_rewrite = std::mem::take(&mut self.group_name_rewrite)
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .collect();
        Ok(())
    }
}
