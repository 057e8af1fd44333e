//! Shared Types

pub mod user;

pub use user::{PermissionOverride, UserRecord};
