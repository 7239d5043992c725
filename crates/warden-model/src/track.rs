//! Tracks: ordered ladders of groups used for promotion and demotion.
//!
//! A track only stores group names. Whether those groups are loaded is the
//! caller's concern.

use crate::results::DataMutateResult;
use parking_lot::RwLock;
use std::hash::{Hash, Hasher};
use tracing::debug;
use warden_core::{Result, WardenError};

/// An ordered list of distinct group names.
#[derive(Debug)]
pub struct Track {
    name: String,
    groups: RwLock<Vec<String>>,
}

impl Track {
    /// An empty track. The name is stored lowercase.
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize(name),
            groups: RwLock::new(Vec::new()),
        }
    }

    /// The track's lowercase name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of the groups, lowest rung first.
    pub fn groups(&self) -> Vec<String> {
        self.groups.read().clone()
    }

    /// Replace every group at once.
    ///
    /// Names are lowercased and later duplicates dropped.
    pub fn set_groups<I, S>(&self, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for group in groups {
            let group = normalize(group.as_ref());
            if !unique.contains(&group) {
                unique.push(group);
            }
        }
        *self.groups.write() = unique;
    }

    /// Number of groups on the track.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Whether the track has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Whether `group` is on the track.
    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.read().contains(&normalize(group))
    }

    /// The group after `current`, or `None` if `current` is the last one.
    ///
    /// Fails when `current` is not on the track.
    pub fn next(&self, current: &str) -> Result<Option<String>> {
        let groups = self.groups.read();
        let index = self.position(&groups, current)?;
        Ok(groups.get(index + 1).cloned())
    }

    /// The group before `current`, or `None` if `current` is the first one.
    ///
    /// Fails when `current` is not on the track.
    pub fn previous(&self, current: &str) -> Result<Option<String>> {
        let groups = self.groups.read();
        let index = self.position(&groups, current)?;
        Ok(index.checked_sub(1).map(|i| groups[i].clone()))
    }

    /// Add `group` as the new last rung.
    pub fn append_group(&self, group: &str) -> DataMutateResult {
        let group = normalize(group);
        let mut groups = self.groups.write();
        if groups.contains(&group) {
            return DataMutateResult::AlreadyHas;
        }
        debug!(track = %self.name, group = %group, "appended group to track");
        groups.push(group);
        DataMutateResult::Success
    }

    /// Insert `group` at `position`, shifting later groups up.
    ///
    /// `position` may equal the current length. Anything past that is an
    /// error, reported before the membership check.
    pub fn insert_group(&self, group: &str, position: usize) -> Result<DataMutateResult> {
        let group = normalize(group);
        let mut groups = self.groups.write();
        if position > groups.len() {
            return Err(WardenError::invalid(format!(
                "position {position} is out of range for track {} of size {}",
                self.name,
                groups.len()
            )));
        }
        if groups.contains(&group) {
            return Ok(DataMutateResult::AlreadyHas);
        }
        debug!(track = %self.name, group = %group, position, "inserted group into track");
        groups.insert(position, group);
        Ok(DataMutateResult::Success)
    }

    /// Remove `group` from the track.
    pub fn remove_group(&self, group: &str) -> DataMutateResult {
        let group = normalize(group);
        let mut groups = self.groups.write();
        match groups.iter().position(|g| *g == group) {
            Some(index) => {
                groups.remove(index);
                debug!(track = %self.name, group = %group, "removed group from track");
                DataMutateResult::Success
            }
            None => DataMutateResult::Lacks,
        }
    }

    /// Remove every group.
    pub fn clear_groups(&self) {
        self.groups.write().clear();
        debug!(track = %self.name, "cleared track");
    }

    fn position(&self, groups: &[String], current: &str) -> Result<usize> {
        let current = normalize(current);
        groups.iter().position(|g| *g == current).ok_or_else(|| {
            WardenError::not_found(format!("group {current} is not on track {}", self.name))
        })
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
