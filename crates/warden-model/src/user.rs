//! User specific state.

use parking_lot::RwLock;
use uuid::Uuid;

/// Group every user ends up in when nothing else applies.
pub const DEFAULT_GROUP: &str = "default";

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 16;

/// State only users carry.
#[derive(Debug)]
pub struct UserState {
    uuid: Uuid,
    name: RwLock<Option<String>>,
    primary_group: RwLock<Option<String>>,
}

impl UserState {
    pub(crate) fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            name: RwLock::new(None),
            primary_group: RwLock::new(None),
        }
    }

    /// The user's uuid.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Last known username.
    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    /// Update the last known username, returning whether it changed.
    ///
    /// Names longer than [`MAX_USERNAME_LEN`] are rejected. An empty name or
    /// `"null"` clears the name. A weak update only fills an unset name; it
    /// may still fix the casing of the current one, which does not count as a
    /// change.
    pub fn set_name(&self, name: Option<&str>, weak: bool) -> bool {
        if name.is_some_and(|n| n.chars().count() > MAX_USERNAME_LEN) {
            return false;
        }

        let mut current = self.name.write();
        if weak {
            if let Some(existing) = current.as_mut() {
                if let Some(name) = name.filter(|n| n.eq_ignore_ascii_case(existing.as_str())) {
                    *existing = name.to_string();
                }
                return false;
            }
        }

        let name = name.filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case("null"));
        match (current.as_deref(), name) {
            (None, None) => false,
            (Some(previous), Some(name)) => {
                let changed = !previous.eq_ignore_ascii_case(name);
                *current = Some(name.to_string());
                changed
            }
            (_, name) => {
                *current = name.map(str::to_string);
                true
            }
        }
    }

    /// The primary group as stored, without any computation.
    pub fn stored_primary_group(&self) -> Option<String> {
        self.primary_group.read().clone()
    }

    /// Store a primary group, lowercased. `None` clears it.
    pub fn set_stored_primary_group(&self, group: Option<&str>) {
        *self.primary_group.write() = group.map(|g| g.trim().to_lowercase());
    }

    /// Stored primary group, or [`DEFAULT_GROUP`].
    pub fn stored_primary_group_or_default(&self) -> String {
        self.stored_primary_group()
            .unwrap_or_else(|| DEFAULT_GROUP.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserState {
        UserState::new(Uuid::nil())
    }

    #[test]
    fn test_set_name_rules() {
        let user = user();
        assert!(!user.set_name(Some("a_name_that_is_far_too_long"), false));
        assert_eq!(user.name(), None);

        assert!(user.set_name(Some("Notch"), false));
        assert!(!user.set_name(Some("notch"), false));
        assert_eq!(user.name().as_deref(), Some("notch"));
        assert!(user.set_name(Some("jeb_"), false));

        assert!(user.set_name(Some("null"), false));
        assert_eq!(user.name(), None);
        assert!(!user.set_name(Some(""), false));
    }

    #[test]
    fn test_weak_set_name_only_fills_or_recases() {
        let user = user();
        assert!(user.set_name(Some("steve"), true));
        assert!(!user.set_name(Some("alex"), true));
        assert_eq!(user.name().as_deref(), Some("steve"));

        assert!(!user.set_name(Some("Steve"), true));
        assert_eq!(user.name().as_deref(), Some("Steve"));
    }

    #[test]
    fn test_stored_primary_group() {
        let user = user();
        assert_eq!(user.stored_primary_group_or_default(), DEFAULT_GROUP);
        user.set_stored_primary_group(Some("VIP"));
        assert_eq!(user.stored_primary_group().as_deref(), Some("vip"));
    }
}
