//! Permission catalog.
//!
//! The catalog is the registry of modules that exist on the platform. Together
//! with the closed [`Action`] set it defines every valid `module:action`
//! token. A [`Permission`] can only be obtained through a catalog lookup, so
//! holding one proves the token was valid when it was created.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use smol_str::SmolStr;

use super::action::Action;
use super::error::{AccessError, AccessResult};

/// Separator between module and action in a permission token.
pub const TOKEN_SEPARATOR: char = ':';

/// A validated `module:action` permission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission {
    module: SmolStr,
    action: Action,
}

impl Permission {
    /// Module half of the token.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Action half of the token.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Returns true if this permission names `module` and `action`.
    #[must_use]
    pub fn matches(&self, module: &str, action: Action) -> bool {
        self.action == action && self.module.as_str() == module
    }

    /// Canonical `module:action` token.
    #[must_use]
    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{TOKEN_SEPARATOR}{}", self.module, self.action)
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A module registered with the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Wire name used in permission tokens (e.g. `finance`).
    pub name: SmolStr,
    /// Label shown in navigation and permission grids.
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Navigation order; lower sorts first.
    #[serde(default)]
    pub sort_order: i32,
    /// Inactive modules are left out of the catalog.
    #[serde(default = "default_active")]
    pub active: bool,
}

pub(super) const fn default_active() -> bool {
    true
}

impl ModuleDefinition {
    /// Create an active module definition.
    #[must_use]
    pub fn new(name: &str, display_name: &str, sort_order: i32) -> Self {
        Self {
            name: SmolStr::new(name),
            display_name: display_name.to_string(),
            description: None,
            sort_order,
            active: true,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Human-facing description of a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDescription {
    pub token: String,
    pub display_name: String,
    pub description: String,
}

/// Registry of valid modules and, by extension, valid permissions.
///
/// Built once at startup and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    modules: BTreeMap<SmolStr, ModuleDefinition>,
    /// Module names in navigation order.
    order: Vec<SmolStr>,
}

impl PermissionCatalog {
    /// Build a catalog from module definitions.
    ///
    /// Inactive definitions are skipped, but their names still count towards
    /// duplicate detection. Fails on a malformed or repeated module name.
    pub fn new<I>(definitions: I) -> AccessResult<Self>
    where
        I: IntoIterator<Item = ModuleDefinition>,
    {
        let mut modules = BTreeMap::new();
        let mut seen = BTreeSet::new();

        for definition in definitions {
            if !is_well_formed_module_name(&definition.name) {
                return Err(AccessError::InvalidModule(definition.name.to_string()));
            }
            if !seen.insert(definition.name.clone()) {
                return Err(AccessError::DuplicateModule(definition.name.to_string()));
            }
            if !definition.active {
                tracing::debug!(module = %definition.name, "Skipping inactive module");
                continue;
            }
            modules.insert(definition.name.clone(), definition);
        }

        let mut order: Vec<_> = modules.values().collect();
        order.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.name.cmp(&b.name)));
        let order = order.into_iter().map(|m| m.name.clone()).collect();

        Ok(Self { modules, order })
    }

    /// Whether `module` is a registered module.
    #[must_use]
    pub fn is_valid_module(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Whether `token` is a valid `module:action` permission.
    ///
    /// Fails closed: anything that does not parse is invalid.
    #[must_use]
    pub fn is_valid_permission(&self, token: &str) -> bool {
        self.parse_permission(token).is_ok()
    }

    /// Construct a permission from its two halves.
    ///
    /// The module is checked before the action.
    pub fn create_permission(&self, module: &str, action: &str) -> AccessResult<Permission> {
        let module = self.registered_module(module)?;
        let action = action.parse::<Action>()?;
        Ok(Permission { module, action })
    }

    /// Construct a permission from a module name and a typed action.
    pub fn permission(&self, module: &str, action: Action) -> AccessResult<Permission> {
        let module = self.registered_module(module)?;
        Ok(Permission { module, action })
    }

    /// Parse a `module:action` token.
    pub fn parse_permission(&self, token: &str) -> AccessResult<Permission> {
        let (module, action) = split_token(token)?;
        self.create_permission(module, action)
    }

    /// Every permission of a single module, in action order.
    pub fn module_permissions(&self, module: &str) -> AccessResult<Vec<Permission>> {
        let module = self.registered_module(module)?;
        Ok(Action::all()
            .iter()
            .map(|&action| Permission {
                module: module.clone(),
                action,
            })
            .collect())
    }

    /// Every valid permission, in module order then action order.
    #[must_use]
    pub fn all_permissions(&self) -> Vec<Permission> {
        self.order
            .iter()
            .flat_map(|module| {
                Action::all().iter().map(move |&action| Permission {
                    module: module.clone(),
                    action,
                })
            })
            .collect()
    }

    /// Look up a module definition.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleDefinition> {
        self.modules.get(name)
    }

    /// Registered modules in navigation order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDefinition> {
        self.order.iter().filter_map(|name| self.modules.get(name))
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Display name and description for a permission, e.g. "View Dashboard".
    pub fn describe(&self, permission: &Permission) -> AccessResult<PermissionDescription> {
        let module = self
            .module(permission.module())
            .ok_or_else(|| AccessError::InvalidModule(permission.module().to_string()))?;
        let action = permission.action();

        Ok(PermissionDescription {
            token: permission.token(),
            display_name: format!("{} {}", action.display_name(), module.display_name),
            description: format!("{} for {}", action.description(), module.display_name),
        })
    }

    fn registered_module(&self, module: &str) -> AccessResult<SmolStr> {
        self.modules
            .get_key_value(module)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| AccessError::InvalidModule(module.to_string()))
    }
}

/// Split a token into its module and action halves without validating them.
pub fn split_token(token: &str) -> AccessResult<(&str, &str)> {
    let malformed = || AccessError::MalformedPermission(token.to_string());

    let (module, action) = token.split_once(TOKEN_SEPARATOR).ok_or_else(malformed)?;
    if module.is_empty() || action.is_empty() || action.contains(TOKEN_SEPARATOR) {
        return Err(malformed());
    }
    Ok((module, action))
}

fn is_well_formed_module_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PermissionCatalog {
        PermissionCatalog::new([
            ModuleDefinition::new("finance", "Finance", 20),
            ModuleDefinition::new("dashboard", "Dashboard", 0),
            ModuleDefinition::new("job-orders", "Job Orders", 30),
            ModuleDefinition::new("legacy", "Legacy", 40).inactive(),
        ])
        .unwrap()
    }

    #[test]
    fn test_every_registered_pair_is_valid() {
        let catalog = catalog();
        for module in ["dashboard", "finance", "job-orders"] {
            for action in Action::all() {
                let token = format!("{module}:{action}");
                assert!(catalog.is_valid_permission(&token), "{token} should be valid");
            }
        }
    }

    #[test]
    fn test_invalid_tokens_fail_closed() {
        let catalog = catalog();
        for token in [
            "",
            ":",
            "finance",
            "finance:",
            ":view",
            "finance:view:extra",
            "finance:manage",
            "Finance:view",
            "weather:view",
            "legacy:view",
            " finance:view",
            "finance::view",
        ] {
            assert!(!catalog.is_valid_permission(token), "{token:?} should be invalid");
        }
    }

    #[test]
    fn test_create_permission_errors() {
        let catalog = catalog();
        assert_eq!(
            catalog.create_permission("weather", "view"),
            Err(AccessError::InvalidModule("weather".into()))
        );
        assert_eq!(
            catalog.create_permission("finance", "approve"),
            Err(AccessError::InvalidAction("approve".into()))
        );
        // Module is reported first when both halves are bad
        assert!(matches!(
            catalog.create_permission("weather", "approve"),
            Err(AccessError::InvalidModule(_))
        ));
    }

    #[test]
    fn test_create_permission_round_trips_token() {
        let catalog = catalog();
        let perm = catalog.create_permission("finance", "edit").unwrap();
        assert_eq!(perm.module(), "finance");
        assert_eq!(perm.action(), Action::Edit);
        assert_eq!(perm.token(), "finance:edit");
        assert_eq!(catalog.parse_permission("finance:edit").unwrap(), perm);
    }

    #[test]
    fn test_parse_reports_malformed_tokens() {
        let catalog = catalog();
        assert!(matches!(
            catalog.parse_permission("finance"),
            Err(AccessError::MalformedPermission(_))
        ));
        assert!(matches!(
            catalog.parse_permission("a:b:c"),
            Err(AccessError::MalformedPermission(_))
        ));
        assert!(matches!(
            catalog.parse_permission("weather:view"),
            Err(AccessError::InvalidModule(_))
        ));
    }

    #[test]
    fn test_inactive_modules_not_registered() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 3);
        assert!(!catalog.is_valid_module("legacy"));
        assert!(catalog.module("legacy").is_none());
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let result = PermissionCatalog::new([
            ModuleDefinition::new("hr", "HR", 0),
            ModuleDefinition::new("hr", "Human Resources", 1),
        ]);
        assert_eq!(result.unwrap_err(), AccessError::DuplicateModule("hr".into()));
    }

    #[test]
    fn test_duplicate_module_rejected_whatever_the_activity() {
        let cases = [
            [
                ModuleDefinition::new("legacy", "Legacy", 0).inactive(),
                ModuleDefinition::new("legacy", "Legacy", 1),
            ],
            [
                ModuleDefinition::new("legacy", "Legacy", 0),
                ModuleDefinition::new("legacy", "Legacy", 1).inactive(),
            ],
            [
                ModuleDefinition::new("legacy", "Legacy", 0).inactive(),
                ModuleDefinition::new("legacy", "Legacy", 1).inactive(),
            ],
        ];

        for definitions in cases {
            assert_eq!(
                PermissionCatalog::new(definitions).unwrap_err(),
                AccessError::DuplicateModule("legacy".into())
            );
        }
    }

    #[test]
    fn test_malformed_module_name_rejected() {
        for name in ["", "Finance", "fin:ance", "fin ance"] {
            let result = PermissionCatalog::new([ModuleDefinition::new(name, "X", 0)]);
            assert!(
                matches!(result, Err(AccessError::InvalidModule(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_modules_in_sort_order() {
        let catalog = catalog();
        let names: Vec<_> = catalog.modules().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["dashboard", "finance", "job-orders"]);
    }

    #[test]
    fn test_all_permissions_enumerates_universe() {
        let catalog = catalog();
        let all = catalog.all_permissions();
        assert_eq!(all.len(), 3 * Action::all().len());
        assert_eq!(all[0].token(), "dashboard:view");
        assert_eq!(all[3].token(), "dashboard:delete");
        assert_eq!(all[4].token(), "finance:view");
        assert!(all.iter().all(|p| catalog.is_valid_permission(&p.token())));
    }

    #[test]
    fn test_module_permissions() {
        let catalog = catalog();
        let perms = catalog.module_permissions("finance").unwrap();
        let tokens: Vec<_> = perms.iter().map(Permission::token).collect();
        assert_eq!(
            tokens,
            ["finance:view", "finance:edit", "finance:create", "finance:delete"]
        );
        assert!(catalog.module_permissions("weather").is_err());
    }

    #[test]
    fn test_describe_permission() {
        let catalog = catalog();
        let perm = catalog.permission("dashboard", Action::View).unwrap();
        let description = catalog.describe(&perm).unwrap();
        assert_eq!(description.token, "dashboard:view");
        assert_eq!(description.display_name, "View Dashboard");
        assert_eq!(description.description, "Read access for Dashboard");
    }

    #[test]
    fn test_permission_serializes_as_token() {
        let catalog = catalog();
        let perm = catalog.parse_permission("job-orders:delete").unwrap();
        assert_eq!(
            serde_json::to_string(&perm).unwrap(),
            "\"job-orders:delete\""
        );
    }

    #[test]
    fn test_empty_catalog_rejects_everything() {
        let catalog = PermissionCatalog::default();
        assert!(catalog.is_empty());
        assert!(!catalog.is_valid_permission("dashboard:view"));
        assert!(catalog.all_permissions().is_empty());
    }
}
