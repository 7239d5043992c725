//! Holder identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of permission holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderType {
    /// A user, named by uuid.
    User,
    /// A group, named by its lowercase name.
    Group,
}

impl fmt::Display for HolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolderType::User => write!(f, "user"),
            HolderType::Group => write!(f, "group"),
        }
    }
}

/// Type plus object name. The object name of a group is its lowercase name,
/// that of a user the hyphenated uuid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HolderIdentifier {
    holder_type: HolderType,
    object_name: String,
}

impl HolderIdentifier {
    /// Identifier from its parts.
    pub fn new(holder_type: HolderType, object_name: impl Into<String>) -> Self {
        Self {
            holder_type,
            object_name: object_name.into(),
        }
    }

    /// User or group.
    pub fn holder_type(&self) -> HolderType {
        self.holder_type
    }

    /// Group name or hyphenated user uuid.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }
}

impl fmt::Display for HolderIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.holder_type, self.object_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_display_and_serde() {
        let id = HolderIdentifier::new(HolderType::Group, "admin");
        assert_eq!(id.to_string(), "group/admin");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"holder_type":"group","object_name":"admin"}"#);
        let back: HolderIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
