//! Three-valued permission lookup result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of looking up a permission: explicitly true, explicitly false, or
/// not set at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tristate {
    /// Explicitly granted.
    True,
    /// Explicitly denied.
    False,
    /// No node decides.
    #[default]
    Undefined,
}

impl Tristate {
    /// `true` only for [`Tristate::True`].
    pub fn as_bool(self) -> bool {
        matches!(self, Tristate::True)
    }

    /// Whether a value was found.
    pub fn is_defined(self) -> bool {
        !matches!(self, Tristate::Undefined)
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

impl From<Option<bool>> for Tristate {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Tristate::Undefined, Tristate::from)
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tristate::True => write!(f, "true"),
            Tristate::False => write!(f, "false"),
            Tristate::Undefined => write!(f, "undefined"),
        }
    }
}
