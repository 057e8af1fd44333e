//! Role registry and effective permission resolution.
//!
//! Resolution order:
//! 1. Look up the subject's assigned role (unknown roles are an error)
//! 2. Start with the role's permission bundle
//! 3. Add the subject's explicit overrides
//!
//! Overrides only ever add. Taking a permission away means assigning a
//! different role. An expired override simply stops being added.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ops_common::UserRecord;
use serde::Serialize;
use uuid::Uuid;

use super::catalog::PermissionCatalog;
use super::error::{AccessError, AccessResult};
use super::set::PermissionSet;

/// Named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub permissions: PermissionSet,
    /// System roles (e.g. break-glass) are audited whenever they resolve.
    pub is_system: bool,
    /// Inactive roles are never resolved.
    pub active: bool,
}

impl Role {
    #[must_use]
    pub fn new(name: &str, display_name: &str, permissions: PermissionSet) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: None,
            permissions,
            is_system: false,
            active: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Mark the role as a system role.
    #[must_use]
    pub const fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Mark the role as retired. It keeps its name but never resolves.
    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// A user as seen by the resolver: identity, assigned role and validated
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: Uuid,
    pub role: String,
    pub overrides: PermissionSet,
}

impl Subject {
    #[must_use]
    pub fn new(id: Uuid, role: &str) -> Self {
        Self {
            id,
            role: role.to_string(),
            overrides: PermissionSet::new(),
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: PermissionSet) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Validate a record from the identity provider.
    ///
    /// A single invalid override token rejects the whole record, expired or
    /// not. Overrides that have expired at `now` are then left out.
    pub fn from_record(
        record: &UserRecord,
        catalog: &PermissionCatalog,
        now: DateTime<Utc>,
    ) -> AccessResult<Self> {
        let mut overrides = PermissionSet::new();
        for entry in &record.permission_overrides {
            let permission = catalog.parse_permission(&entry.permission)?;
            if entry.is_active_at(now) {
                overrides.insert(permission);
            } else {
                tracing::debug!(
                    user_id = %record.id,
                    permission = %permission,
                    "Skipping expired permission override"
                );
            }
        }

        Ok(Self {
            id: record.id,
            role: record.role.clone(),
            overrides,
        })
    }
}

/// Maps role names to permission bundles and computes effective sets.
///
/// Roles are registered at startup; once the resolver is shared it is only
/// read.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    catalog: Arc<PermissionCatalog>,
    roles: BTreeMap<String, Role>,
    /// Names of inactive roles, kept so they still count as taken.
    retired: BTreeSet<String>,
}

impl RoleResolver {
    #[must_use]
    pub const fn new(catalog: Arc<PermissionCatalog>) -> Self {
        Self {
            catalog,
            roles: BTreeMap::new(),
            retired: BTreeSet::new(),
        }
    }

    /// The catalog the registered roles were validated against.
    #[must_use]
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// Register a role bundle.
    ///
    /// Fails if the name is taken, by an active or inactive role, or if the
    /// bundle names a module this resolver's catalog does not know. Inactive
    /// roles are validated and then only reserve their name.
    pub fn register_role(&mut self, role: Role) -> AccessResult<()> {
        if self.roles.contains_key(&role.name) || self.retired.contains(&role.name) {
            return Err(AccessError::DuplicateRole(role.name));
        }
        if let Some(foreign) = role
            .permissions
            .iter()
            .find(|p| !self.catalog.is_valid_module(p.module()))
        {
            return Err(AccessError::InvalidModule(foreign.module().to_string()));
        }

        if !role.active {
            tracing::debug!(role = %role.name, "Skipping inactive role");
            self.retired.insert(role.name);
            return Ok(());
        }

        tracing::debug!(
            role = %role.name,
            permissions = role.permissions.len(),
            system = role.is_system,
            "Registered role"
        );
        self.roles.insert(role.name.clone(), role);
        Ok(())
    }

    /// Look up a role by name.
    pub fn role(&self, name: &str) -> AccessResult<&Role> {
        self.roles
            .get(name)
            .ok_or_else(|| AccessError::UnknownRole(name.to_string()))
    }

    /// Registered roles ordered by name.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// The permission bundle configured for a role.
    ///
    /// Unknown roles are an error, never an empty or guest bundle.
    pub fn get_permissions_for_role(&self, name: &str) -> AccessResult<&PermissionSet> {
        self.role(name).map(|role| &role.permissions)
    }

    /// Role bundle plus the subject's overrides.
    #[tracing::instrument(skip(self, subject), fields(user_id = %subject.id, role = %subject.role))]
    pub fn compute_effective_permissions(&self, subject: &Subject) -> AccessResult<PermissionSet> {
        let role = self.role(&subject.role)?;
        Ok(Self::merge(subject, role))
    }

    /// Like [`Self::compute_effective_permissions`], but resolves an unknown
    /// role to `fallback_role` instead of failing.
    ///
    /// The fallback is an explicit caller decision and is logged every time
    /// it is taken. A fallback role that is itself unknown is still an error.
    #[tracing::instrument(skip(self, subject), fields(user_id = %subject.id, role = %subject.role))]
    pub fn compute_effective_permissions_or(
        &self,
        subject: &Subject,
        fallback_role: &str,
    ) -> AccessResult<PermissionSet> {
        let role = match self.role(&subject.role) {
            Ok(role) => role,
            Err(AccessError::UnknownRole(_)) => {
                tracing::warn!(fallback = fallback_role, "Unknown role, using fallback role");
                self.role(fallback_role)?
            }
            Err(e) => return Err(e),
        };
        Ok(Self::merge(subject, role))
    }

    /// Whether the subject is assigned `role_name` and that role exists.
    #[must_use]
    pub fn has_role(&self, subject: &Subject, role_name: &str) -> bool {
        subject.role == role_name && self.roles.contains_key(role_name)
    }

    fn merge(subject: &Subject, role: &Role) -> PermissionSet {
        if role.is_system {
            tracing::warn!(
                target: "audit",
                user_id = %subject.id,
                role = %role.name,
                "System role resolved"
            );
        }

        role.permissions.union(&subject.overrides)
    }
}
