//! Actions that can be granted on a module.
//!
//! The action universe is closed: every module supports exactly these four.

use std::fmt;
use std::str::FromStr;

use super::error::AccessError;

/// Action half of a `module:action` permission token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read access to a module
    View,
    /// Modify existing records in a module
    Edit,
    /// Create new records in a module
    Create,
    /// Remove records from a module
    Delete,
}

impl Action {
    /// Returns the wire name used in permission tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use ops_access::permissions::Action;
    ///
    /// assert_eq!(Action::Edit.as_str(), "edit");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }

    /// Returns all actions in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::View, Self::Edit, Self::Create, Self::Delete]
    }

    /// Returns the label used when composing permission display names.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Edit => "Edit",
            Self::Create => "Create",
            Self::Delete => "Delete",
        }
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::View => "Read access",
            Self::Edit => "Modify existing records",
            Self::Create => "Create new records",
            Self::Delete => "Delete records",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AccessError::InvalidAction(s.to_string()))
    }
}
