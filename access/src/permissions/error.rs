//! Access Error Types

use thiserror::Error;

/// Errors raised by the permission core.
///
/// All of these are deterministic and synchronous. Callers that gate access
/// on a result must treat any of them as a denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Module is not registered in the catalog.
    #[error("Invalid module: {0}")]
    InvalidModule(String),

    /// Action is not part of the action universe.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Token does not have the `module:action` shape.
    #[error("Malformed permission token: {0:?}")]
    MalformedPermission(String),

    /// Module registered twice while building the catalog.
    #[error("Module already registered: {0}")]
    DuplicateModule(String),

    /// Role name is not registered.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Role registered twice.
    #[error("Role already registered: {0}")]
    DuplicateRole(String),

    /// Guard spec names no permission, permission list or module.
    #[error("Guard spec has no permission, permission list or module")]
    AmbiguousGuardSpec,
}

impl AccessError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidModule(_) => "INVALID_MODULE",
            Self::InvalidAction(_) => "INVALID_ACTION",
            Self::MalformedPermission(_) => "MALFORMED_PERMISSION",
            Self::DuplicateModule(_) => "DUPLICATE_MODULE",
            Self::UnknownRole(_) => "UNKNOWN_ROLE",
            Self::DuplicateRole(_) => "DUPLICATE_ROLE",
            Self::AmbiguousGuardSpec => "AMBIGUOUS_GUARD",
        }
    }

    /// Whether this error is a programmer or configuration mistake (bad
    /// token, bad registration, guard without criteria).
    ///
    /// Only an unknown role is left to the caller to judge.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::UnknownRole(_))
    }
}

/// Result type for access operations.
pub type AccessResult<T> = Result<T, AccessError>;
