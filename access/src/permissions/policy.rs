//! Declarative access policy.
//!
//! The module universe and default role bundles are configuration. They are
//! read once at startup, validated in full and then frozen into an
//! [`AccessPolicy`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use ops_common::UserRecord;
use serde::{Deserialize, Serialize};

use super::catalog::{default_active, split_token, ModuleDefinition, Permission, PermissionCatalog};
use super::error::AccessResult;
use super::roles::{Role, RoleResolver, Subject};
use super::set::PermissionSet;

/// Role entry suffix granting every action of a module.
const MODULE_WILDCARD: &str = "*";

/// Name of the built-in emergency access role.
pub const BREAK_GLASS_ROLE: &str = "break_glass";

/// A role as written in a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub system: bool,
    /// Inactive roles are validated but never resolve.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Permission tokens, or `module:*` for every action of a module.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleDefinition {
    fn new(name: &str, display_name: &str, description: &str, permissions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: Some(description.to_string()),
            system: false,
            active: true,
            permissions: permissions.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// Serialized form of the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub modules: Vec<ModuleDefinition>,
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,
}

impl PolicyDocument {
    /// Platform defaults.
    #[must_use]
    pub fn builtin() -> Self {
        let modules = vec![
            ModuleDefinition::new("dashboard", "Dashboard", 0)
                .with_description("Overview and key metrics"),
            ModuleDefinition::new("properties", "Properties", 10),
            ModuleDefinition::new("transport", "Transport", 20),
            ModuleDefinition::new("hr", "HR", 30).with_description("Human resources"),
            ModuleDefinition::new("staff", "Staff", 40),
            ModuleDefinition::new("attendance", "Attendance", 50),
            ModuleDefinition::new("payroll", "Payroll", 60),
            ModuleDefinition::new("finance", "Finance", 70),
            ModuleDefinition::new("billing", "Billing", 80),
            ModuleDefinition::new("operations", "Operations", 90),
            ModuleDefinition::new("complaints", "Complaints", 100),
            ModuleDefinition::new("reports", "Reports", 110),
            ModuleDefinition::new("uploads", "Uploads", 120),
            ModuleDefinition::new("users", "Users", 130),
            ModuleDefinition::new("settings", "Settings", 140),
            ModuleDefinition::new("profile", "Profile", 150),
        ];

        let everything: Vec<String> = modules
            .iter()
            .map(|m| format!("{}:{MODULE_WILDCARD}", m.name))
            .collect();

        let roles = vec![
            RoleDefinition {
                permissions: everything.clone(),
                ..RoleDefinition::new("admin", "Administrator", "Full platform access", &[])
            },
            RoleDefinition::new(
                "manager",
                "Manager",
                "Manages day-to-day operations",
                &[
                    "dashboard:*",
                    "properties:*",
                    "transport:*",
                    "hr:*",
                    "staff:*",
                    "attendance:*",
                    "payroll:*",
                    "finance:*",
                    "billing:*",
                    "operations:*",
                    "complaints:*",
                    "reports:*",
                    "uploads:*",
                    "profile:*",
                    "users:view",
                    "settings:view",
                ],
            ),
            RoleDefinition::new(
                "staff",
                "Staff",
                "Management staff with read access",
                &["dashboard:view", "properties:view"],
            ),
            RoleDefinition::new(
                "general_staff",
                "General Staff",
                "External staff with self-service access",
                &["dashboard:view", "profile:view", "profile:edit"],
            ),
            RoleDefinition::new("guest", "Guest", "Minimal access", &["dashboard:view"]),
            RoleDefinition {
                system: true,
                permissions: everything,
                ..RoleDefinition::new(
                    BREAK_GLASS_ROLE,
                    "Break Glass",
                    "Emergency access; every resolution is audited",
                    &[],
                )
            },
        ];

        Self { modules, roles }
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Invalid policy document")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Validate the whole document and freeze it.
    pub fn compile(&self) -> AccessResult<AccessPolicy> {
        let catalog = Arc::new(PermissionCatalog::new(self.modules.iter().cloned())?);
        let mut resolver = RoleResolver::new(catalog.clone());

        for definition in &self.roles {
            let mut permissions = PermissionSet::new();
            for entry in &definition.permissions {
                permissions.extend(expand_entry(&catalog, entry)?);
            }

            let mut role = Role::new(&definition.name, &definition.display_name, permissions);
            role.description.clone_from(&definition.description);
            role.is_system = definition.system;
            role.active = definition.active;
            resolver.register_role(role)?;
        }

        tracing::info!(
            modules = catalog.len(),
            roles = resolver.roles().count(),
            "Access policy compiled"
        );

        Ok(AccessPolicy {
            catalog,
            resolver,
            fallback_role: None,
        })
    }
}

/// Expand one role entry into concrete permissions.
fn expand_entry(catalog: &PermissionCatalog, entry: &str) -> AccessResult<Vec<Permission>> {
    let (module, action) = split_token(entry)?;
    if action == MODULE_WILDCARD {
        catalog.module_permissions(module)
    } else {
        catalog.create_permission(module, action).map(|p| vec![p])
    }
}

/// Compiled, immutable policy: catalog plus registered roles.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    catalog: Arc<PermissionCatalog>,
    resolver: RoleResolver,
    /// Role applied by [`Self::resolve_user`] when a user's role is unknown.
    fallback_role: Option<String>,
}

impl AccessPolicy {
    /// Opt in to resolving unknown roles to `role`.
    ///
    /// The role must be registered and active.
    pub fn with_fallback_role(mut self, role: &str) -> AccessResult<Self> {
        self.resolver.role(role)?;
        self.fallback_role = Some(role.to_string());
        Ok(self)
    }

    /// The configured unknown-role fallback, if any.
    #[must_use]
    pub fn fallback_role(&self) -> Option<&str> {
        self.fallback_role.as_deref()
    }

    #[must_use]
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// Shared handle to the catalog.
    #[must_use]
    pub fn catalog_handle(&self) -> Arc<PermissionCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub const fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    /// Validate an identity-provider record and compute its effective set.
    ///
    /// Overrides expired at `now` are left out. Unknown roles are an error.
    pub fn effective_permissions(
        &self,
        record: &UserRecord,
        now: DateTime<Utc>,
    ) -> AccessResult<PermissionSet> {
        let subject = Subject::from_record(record, &self.catalog, now)?;
        self.resolver.compute_effective_permissions(&subject)
    }

    /// Like [`Self::effective_permissions`] with an explicit unknown-role fallback.
    pub fn effective_permissions_or(
        &self,
        record: &UserRecord,
        fallback_role: &str,
        now: DateTime<Utc>,
    ) -> AccessResult<PermissionSet> {
        let subject = Subject::from_record(record, &self.catalog, now)?;
        self.resolver
            .compute_effective_permissions_or(&subject, fallback_role)
    }

    /// Compute a user's effective set under this policy's fallback setting.
    ///
    /// Uses the configured fallback role when there is one, otherwise
    /// behaves exactly like [`Self::effective_permissions`].
    pub fn resolve_user(
        &self,
        record: &UserRecord,
        now: DateTime<Utc>,
    ) -> AccessResult<PermissionSet> {
        match &self.fallback_role {
            Some(fallback) => self.effective_permissions_or(record, fallback, now),
            None => self.effective_permissions(record, now),
        }
    }

    /// Summary of modules and expanded role bundles.
    #[must_use]
    pub fn report(&self) -> PolicyReport {
        PolicyReport {
            modules: self.catalog.modules().cloned().collect(),
            roles: self
                .resolver
                .roles()
                .map(|role| (role.name.clone(), role.permissions.tokens()))
                .collect(),
        }
    }
}

/// JSON report printed by the policy checker.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyReport {
    pub modules: Vec<ModuleDefinition>,
    pub roles: BTreeMap<String, Vec<String>>,
}
