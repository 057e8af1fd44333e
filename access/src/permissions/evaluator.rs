//! Point-in-time authorization queries.
//!
//! Every query takes the effective permission set explicitly. Nothing here
//! holds state or can answer "yes" without a matching grant.

use std::collections::BTreeMap;

use super::action::Action;
use super::catalog::{ModuleDefinition, Permission, PermissionCatalog};
use super::set::PermissionSet;

/// Exact membership test.
#[must_use]
pub fn has_permission(effective: &PermissionSet, permission: &Permission) -> bool {
    effective.contains(permission)
}

/// True if at least one of `permissions` is granted. An empty list is false.
#[must_use]
pub fn has_any_permission(effective: &PermissionSet, permissions: &[Permission]) -> bool {
    permissions.iter().any(|p| effective.contains(p))
}

/// True if every one of `permissions` is granted. An empty list is true.
#[must_use]
pub fn has_all_permissions(effective: &PermissionSet, permissions: &[Permission]) -> bool {
    permissions.iter().all(|p| effective.contains(p))
}

/// `module:<action>` membership by name. Unknown modules are never granted.
#[must_use]
pub fn can_perform(effective: &PermissionSet, module: &str, action: Action) -> bool {
    effective.grants(module, action)
}

#[must_use]
pub fn can_view_module(effective: &PermissionSet, module: &str) -> bool {
    can_perform(effective, module, Action::View)
}

#[must_use]
pub fn can_edit_module(effective: &PermissionSet, module: &str) -> bool {
    can_perform(effective, module, Action::Edit)
}

#[must_use]
pub fn can_create_in_module(effective: &PermissionSet, module: &str) -> bool {
    can_perform(effective, module, Action::Create)
}

#[must_use]
pub fn can_delete_in_module(effective: &PermissionSet, module: &str) -> bool {
    can_perform(effective, module, Action::Delete)
}

/// Group granted actions by module, e.g. `{"finance": [view, edit]}`.
#[must_use]
pub fn actions_by_module(effective: &PermissionSet) -> BTreeMap<String, Vec<Action>> {
    let mut grouped: BTreeMap<String, Vec<Action>> = BTreeMap::new();
    for permission in effective {
        grouped
            .entry(permission.module().to_string())
            .or_default()
            .push(permission.action());
    }
    grouped
}

/// Catalog modules the set can view, in navigation order.
#[must_use]
pub fn accessible_modules<'a>(
    catalog: &'a PermissionCatalog,
    effective: &PermissionSet,
) -> Vec<&'a ModuleDefinition> {
    catalog
        .modules()
        .filter(|module| can_view_module(effective, &module.name))
        .collect()
}
