//! Ops Platform Access Control
//!
//! Role-based permission evaluation for the back-office operations platform.
//! Permissions are `module:action` tokens; roles bundle them; guards answer
//! yes/no and fail closed.

pub mod config;
pub mod observability;
pub mod permissions;
