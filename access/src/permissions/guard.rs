//! Guard contract shared by UI, route and API call sites.
//!
//! A guard names its criteria declaratively and resolves to one boolean.
//! Precedence:
//! 1. `permission` alone
//! 2. `permissions`, as all-of when `require_all` is set, otherwise any-of
//! 3. `module` plus `action` (defaulting to view)
//!
//! A guard with none of these is an error, never an allow.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::action::Action;
use super::catalog::{Permission, PermissionCatalog};
use super::error::{AccessError, AccessResult};
use super::evaluator::{
    can_edit_module, can_perform, can_view_module, has_all_permissions, has_any_permission,
    has_permission,
};
use super::set::PermissionSet;

/// Typed guard criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardSpec {
    pub permission: Option<Permission>,
    pub permissions: Option<Vec<Permission>>,
    pub module: Option<SmolStr>,
    pub action: Option<Action>,
    pub require_all: bool,
}

impl GuardSpec {
    /// Guard on a single permission.
    #[must_use]
    pub fn permission(permission: Permission) -> Self {
        Self {
            permission: Some(permission),
            ..Self::default()
        }
    }

    /// Guard passing if any of `permissions` is granted.
    #[must_use]
    pub fn any_of(permissions: Vec<Permission>) -> Self {
        Self {
            permissions: Some(permissions),
            ..Self::default()
        }
    }

    /// Guard passing only if all of `permissions` are granted.
    #[must_use]
    pub fn all_of(permissions: Vec<Permission>) -> Self {
        Self {
            permissions: Some(permissions),
            require_all: true,
            ..Self::default()
        }
    }

    /// Guard on a module-level action.
    #[must_use]
    pub fn module(module: &str, action: Action) -> Self {
        Self {
            module: Some(SmolStr::new(module)),
            action: Some(action),
            ..Self::default()
        }
    }

    /// Resolve the guard against an effective set.
    pub fn evaluate(&self, effective: &PermissionSet) -> AccessResult<bool> {
        if let Some(permission) = &self.permission {
            return Ok(has_permission(effective, permission));
        }

        if let Some(permissions) = &self.permissions {
            return Ok(if self.require_all {
                has_all_permissions(effective, permissions)
            } else {
                has_any_permission(effective, permissions)
            });
        }

        if let Some(module) = &self.module {
            return Ok(match self.action.unwrap_or(Action::View) {
                Action::View => can_view_module(effective, module),
                Action::Edit => can_edit_module(effective, module),
                other => can_perform(effective, module, other),
            });
        }

        Err(AccessError::AmbiguousGuardSpec)
    }
}

/// Guard criteria as written in route or component configuration.
///
/// Only the criterion selected by precedence is validated; lower-precedence
/// fields are ignored the same way [`GuardSpec::evaluate`] ignores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardRequest {
    pub permission: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub module: Option<String>,
    pub action: Option<String>,
    pub require_all: bool,
}

impl GuardRequest {
    /// Validate against the catalog and produce a typed guard.
    pub fn resolve(&self, catalog: &PermissionCatalog) -> AccessResult<GuardSpec> {
        if let Some(token) = &self.permission {
            return Ok(GuardSpec::permission(catalog.parse_permission(token)?));
        }

        if let Some(tokens) = &self.permissions {
            let permissions = tokens
                .iter()
                .map(|token| catalog.parse_permission(token))
                .collect::<AccessResult<Vec<_>>>()?;
            return Ok(GuardSpec {
                permissions: Some(permissions),
                require_all: self.require_all,
                ..GuardSpec::default()
            });
        }

        if let Some(module) = &self.module {
            if !catalog.is_valid_module(module) {
                return Err(AccessError::InvalidModule(module.clone()));
            }
            let action = self
                .action
                .as_deref()
                .map(str::parse::<Action>)
                .transpose()?
                .unwrap_or(Action::View);
            return Ok(GuardSpec::module(module, action));
        }

        Err(AccessError::AmbiguousGuardSpec)
    }
}

/// The caller's knowledge of a session's permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessState {
    /// Permissions not fetched yet (or fetch failed).
    #[default]
    Unresolved,
    /// Effective set computed for the current user.
    Resolved(PermissionSet),
}

impl AccessState {
    #[must_use]
    pub const fn effective(&self) -> Option<&PermissionSet> {
        match self {
            Self::Unresolved => None,
            Self::Resolved(set) => Some(set),
        }
    }
}

impl From<PermissionSet> for AccessState {
    fn from(set: PermissionSet) -> Self {
        Self::Resolved(set)
    }
}

/// Outcome of a guard at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardDecision {
    Allow,
    Deny,
}

impl GuardDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl From<bool> for GuardDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

/// Fail-closed guard evaluation.
///
/// Unresolved state and evaluation errors both deny.
pub fn authorize(state: &AccessState, spec: &GuardSpec) -> GuardDecision {
    let Some(effective) = state.effective() else {
        tracing::debug!("Permissions unresolved, denying");
        return GuardDecision::Deny;
    };

    match spec.evaluate(effective) {
        Ok(allowed) => allowed.into(),
        Err(e) => {
            log_denial(&e, "Guard evaluation failed, denying");
            GuardDecision::Deny
        }
    }
}

/// Fail-closed evaluation of a declarative guard request.
pub fn authorize_request(
    state: &AccessState,
    catalog: &PermissionCatalog,
    request: &GuardRequest,
) -> GuardDecision {
    match request.resolve(catalog) {
        Ok(spec) => authorize(state, &spec),
        Err(e) => {
            log_denial(&e, "Invalid guard request, denying");
            GuardDecision::Deny
        }
    }
}

/// Broken guard declarations are errors; anything else is a warning.
fn log_denial(error: &AccessError, message: &str) {
    if error.is_configuration_error() {
        tracing::error!(error = %error, code = error.code(), "{message}");
    } else {
        tracing::warn!(error = %error, code = error.code(), "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::catalog::ModuleDefinition;

    fn catalog() -> PermissionCatalog {
        PermissionCatalog::new([
            ModuleDefinition::new("dashboard", "Dashboard", 0),
            ModuleDefinition::new("properties", "Properties", 1),
            ModuleDefinition::new("finance", "Finance", 2),
            ModuleDefinition::new("billing", "Billing", 3),
        ])
        .unwrap()
    }

    fn p(catalog: &PermissionCatalog, token: &str) -> Permission {
        catalog.parse_permission(token).unwrap()
    }

    fn set(catalog: &PermissionCatalog, tokens: &[&str]) -> PermissionSet {
        tokens.iter().map(|t| p(catalog, t)).collect()
    }

    #[test]
    fn test_empty_spec_is_ambiguous() {
        let catalog = catalog();
        let everything: PermissionSet = catalog.all_permissions().into_iter().collect();
        assert_eq!(
            GuardSpec::default().evaluate(&everything),
            Err(AccessError::AmbiguousGuardSpec)
        );
    }

    #[test]
    fn test_action_without_module_is_ambiguous() {
        let spec = GuardSpec {
            action: Some(Action::View),
            require_all: true,
            ..GuardSpec::default()
        };
        assert_eq!(
            spec.evaluate(&PermissionSet::new()),
            Err(AccessError::AmbiguousGuardSpec)
        );
    }

    #[test]
    fn test_permission_takes_precedence() {
        let catalog = catalog();
        let effective = set(&catalog, &["finance:view"]);
        let spec = GuardSpec {
            permission: Some(p(&catalog, "billing:view")),
            permissions: Some(vec![p(&catalog, "finance:view")]),
            module: Some("finance".into()),
            action: Some(Action::View),
            require_all: false,
        };
        // Lower-precedence criteria would allow, but only `permission` counts
        assert_eq!(spec.evaluate(&effective), Ok(false));
    }

    #[test]
    fn test_permissions_take_precedence_over_module() {
        let catalog = catalog();
        let effective = set(&catalog, &["dashboard:view"]);
        let spec = GuardSpec {
            permissions: Some(vec![p(&catalog, "finance:view")]),
            module: Some("dashboard".into()),
            ..GuardSpec::default()
        };
        assert_eq!(spec.evaluate(&effective), Ok(false));
    }

    #[test]
    fn test_permission_list_any_and_all() {
        let catalog = catalog();
        let effective = set(&catalog, &["finance:view"]);
        let wanted = vec![p(&catalog, "finance:view"), p(&catalog, "finance:edit")];

        assert_eq!(GuardSpec::any_of(wanted.clone()).evaluate(&effective), Ok(true));
        assert_eq!(GuardSpec::all_of(wanted).evaluate(&effective), Ok(false));
    }

    #[test]
    fn test_empty_permission_list() {
        let effective = PermissionSet::new();
        assert_eq!(GuardSpec::any_of(vec![]).evaluate(&effective), Ok(false));
        assert_eq!(GuardSpec::all_of(vec![]).evaluate(&effective), Ok(true));
    }

    #[test]
    fn test_module_dispatch() {
        let catalog = catalog();
        let effective = set(&catalog, &["properties:view", "billing:delete"]);

        assert_eq!(
            GuardSpec::module("properties", Action::View).evaluate(&effective),
            Ok(true)
        );
        assert_eq!(
            GuardSpec::module("properties", Action::Edit).evaluate(&effective),
            Ok(false)
        );
        assert_eq!(
            GuardSpec::module("billing", Action::Delete).evaluate(&effective),
            Ok(true)
        );
        assert_eq!(
            GuardSpec::module("billing", Action::Create).evaluate(&effective),
            Ok(false)
        );
    }

    #[test]
    fn test_module_without_action_means_view() {
        let catalog = catalog();
        let effective = set(&catalog, &["finance:edit"]);
        let spec = GuardSpec {
            module: Some("finance".into()),
            ..GuardSpec::default()
        };
        assert_eq!(spec.evaluate(&effective), Ok(false));

        let effective = set(&catalog, &["finance:view"]);
        assert_eq!(spec.evaluate(&effective), Ok(true));
    }

    #[test]
    fn test_request_resolves_by_precedence() {
        let catalog = catalog();
        let request = GuardRequest {
            permission: Some("finance:view".into()),
            // Ignored: lower precedence
            permissions: Some(vec!["not a token".into()]),
            module: Some("weather".into()),
            ..GuardRequest::default()
        };
        assert_eq!(
            request.resolve(&catalog),
            Ok(GuardSpec::permission(p(&catalog, "finance:view")))
        );
    }

    #[test]
    fn test_request_errors() {
        let catalog = catalog();

        let empty = GuardRequest::default();
        assert_eq!(empty.resolve(&catalog), Err(AccessError::AmbiguousGuardSpec));

        let bad_token = GuardRequest {
            permissions: Some(vec!["finance:view".into(), "finance".into()]),
            ..GuardRequest::default()
        };
        assert!(matches!(
            bad_token.resolve(&catalog),
            Err(AccessError::MalformedPermission(_))
        ));

        let bad_module = GuardRequest {
            module: Some("weather".into()),
            ..GuardRequest::default()
        };
        assert_eq!(
            bad_module.resolve(&catalog),
            Err(AccessError::InvalidModule("weather".into()))
        );

        let bad_action = GuardRequest {
            module: Some("finance".into()),
            action: Some("approve".into()),
            ..GuardRequest::default()
        };
        assert_eq!(
            bad_action.resolve(&catalog),
            Err(AccessError::InvalidAction("approve".into()))
        );
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: GuardRequest =
            serde_json::from_str(r#"{"permissions":["finance:view"],"require_all":true}"#).unwrap();
        assert!(request.require_all);
        assert!(request.permission.is_none());
        assert_eq!(request.permissions.as_deref(), Some(&["finance:view".to_string()][..]));
    }

    #[test]
    fn test_authorize_unresolved_denies() {
        let catalog = catalog();
        let spec = GuardSpec::permission(p(&catalog, "dashboard:view"));
        assert_eq!(authorize(&AccessState::Unresolved, &spec), GuardDecision::Deny);
        assert_eq!(
            authorize(&AccessState::default(), &GuardSpec::all_of(vec![])),
            GuardDecision::Deny
        );
    }

    #[test]
    fn test_authorize_error_denies() {
        let catalog = catalog();
        let state = AccessState::from(catalog.all_permissions().into_iter().collect::<PermissionSet>());
        assert_eq!(authorize(&state, &GuardSpec::default()), GuardDecision::Deny);
    }

    #[test]
    fn test_authorize_resolved() {
        let catalog = catalog();
        let state = AccessState::from(set(&catalog, &["dashboard:view"]));

        let allowed = authorize(&state, &GuardSpec::module("dashboard", Action::View));
        assert!(allowed.is_allowed());
        let denied = authorize(&state, &GuardSpec::module("dashboard", Action::Edit));
        assert!(!denied.is_allowed());
    }

    #[test]
    fn test_authorize_request_invalid_denies() {
        let catalog = catalog();
        let state = AccessState::from(catalog.all_permissions().into_iter().collect::<PermissionSet>());
        let request = GuardRequest {
            permission: Some("finance:manage".into()),
            ..GuardRequest::default()
        };
        assert_eq!(
            authorize_request(&state, &catalog, &request),
            GuardDecision::Deny
        );

        let request = GuardRequest {
            module: Some("finance".into()),
            action: Some("delete".into()),
            ..GuardRequest::default()
        };
        assert_eq!(
            authorize_request(&state, &catalog, &request),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_decision_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&GuardDecision::Allow).unwrap(), "\"allow\"");
        assert_eq!(serde_json::to_string(&GuardDecision::Deny).unwrap(), "\"deny\"");
    }
}
