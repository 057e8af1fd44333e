//! Access Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::permissions::{AccessPolicy, PolicyDocument};

/// Access configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Policy document path; the built-in policy is used when unset
    pub policy_path: Option<PathBuf>,

    /// Role used when a user's assigned role is unknown. Installed on the
    /// loaded policy and applied by `AccessPolicy::resolve_user`.
    /// Unset means unknown roles are rejected.
    pub fallback_role: Option<String>,

    /// Emit logs as JSON (default: false)
    pub log_json: bool,
}

impl AccessConfig {
    /// Load configuration from environment variables.
    ///
    /// - `ACCESS_POLICY_PATH`: path to a JSON policy document
    /// - `ACCESS_FALLBACK_ROLE`: opt-in fallback role for unknown roles
    /// - `ACCESS_LOG_JSON`: `true` for JSON log output
    pub fn from_env() -> Result<Self> {
        let log_json = match env::var("ACCESS_LOG_JSON") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("ACCESS_LOG_JSON must be true or false, got {v:?}"))?,
            Err(_) => false,
        };

        Ok(Self {
            policy_path: non_empty_var("ACCESS_POLICY_PATH").map(PathBuf::from),
            fallback_role: non_empty_var("ACCESS_FALLBACK_ROLE"),
            log_json,
        })
    }

    /// Load and compile the configured policy.
    ///
    /// A configured fallback role must exist in the compiled policy and is
    /// installed on it.
    pub fn load_policy(&self) -> Result<AccessPolicy> {
        let document = match &self.policy_path {
            Some(path) => PolicyDocument::from_path(path)?,
            None => PolicyDocument::builtin(),
        };

        let policy = document.compile().context("Access policy is invalid")?;

        match &self.fallback_role {
            Some(fallback) => policy
                .with_fallback_role(fallback)
                .context("ACCESS_FALLBACK_ROLE names a role the policy does not define"),
            None => Ok(policy),
        }
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub const fn default_for_test() -> Self {
        Self {
            policy_path: None,
            fallback_role: None,
            log_json: false,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
