//! Permission system types and utilities.
//!
//! Three layers:
//! - Catalog: which `module:action` permissions exist
//! - Roles: which permissions a role grants, merged with user overrides
//! - Evaluation: yes/no queries and guards over an effective set

pub mod action;
pub mod catalog;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod policy;
pub mod roles;
pub mod set;

pub use action::Action;
pub use catalog::{ModuleDefinition, Permission, PermissionCatalog, PermissionDescription};
pub use error::{AccessError, AccessResult};
pub use evaluator::{
    accessible_modules, actions_by_module, can_create_in_module, can_delete_in_module,
    can_edit_module, can_perform, can_view_module, has_all_permissions, has_any_permission,
    has_permission,
};
pub use guard::{authorize, authorize_request, AccessState, GuardDecision, GuardRequest, GuardSpec};
pub use policy::{AccessPolicy, PolicyDocument, PolicyReport, RoleDefinition, BREAK_GLASS_ROLE};
pub use roles::{Role, RoleResolver, Subject};
pub use set::PermissionSet;
