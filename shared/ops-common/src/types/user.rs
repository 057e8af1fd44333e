//! User Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User record as supplied by the identity/session provider.
///
/// This is the unvalidated wire shape. Permission tokens are plain strings
/// here; the access core validates them against its catalog before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID.
    pub id: Uuid,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Name of the assigned role.
    pub role: String,
    /// Additional permissions granted on top of the role.
    #[serde(default)]
    pub permission_overrides: Vec<PermissionOverride>,
}

impl UserRecord {
    /// Create a record with no overrides.
    #[must_use]
    pub fn new(id: Uuid, role: impl Into<String>) -> Self {
        Self {
            id,
            email: None,
            role: role.into(),
            permission_overrides: Vec::new(),
        }
    }

    /// Add permission overrides.
    #[must_use]
    pub fn with_overrides<I, S>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PermissionOverride>,
    {
        self.permission_overrides
            .extend(overrides.into_iter().map(Into::into));
        self
    }
}

/// A single permission granted to a user, optionally until a deadline.
///
/// Accepts either a bare token string or
/// `{"permission": "...", "expires_at": "..."}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OverrideRepr")]
pub struct PermissionOverride {
    /// `module:action` token.
    pub permission: String,
    /// Instant after which the override no longer applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PermissionOverride {
    /// Non-expiring override.
    #[must_use]
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            expires_at: None,
        }
    }

    /// Set the expiry instant.
    #[must_use]
    pub const fn until(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the override still applies at `now`.
    ///
    /// An override expiring exactly at `now` has expired.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

impl From<&str> for PermissionOverride {
    fn from(permission: &str) -> Self {
        Self::new(permission)
    }
}

impl From<String> for PermissionOverride {
    fn from(permission: String) -> Self {
        Self::new(permission)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OverrideRepr {
    Token(String),
    Full {
        permission: String,
        #[serde(default)]
        expires_at: Option<DateTime<Utc>>,
    },
}

impl From<OverrideRepr> for PermissionOverride {
    fn from(repr: OverrideRepr) -> Self {
        match repr {
            OverrideRepr::Token(permission) => Self::new(permission),
            OverrideRepr::Full {
                permission,
                expires_at,
            } => Self {
                permission,
                expires_at,
            },
        }
    }
}
