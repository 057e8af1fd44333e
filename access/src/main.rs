//! Access Policy Checker - Main Entry Point
//!
//! Loads the configured access policy, validates it and prints the expanded
//! role bundles as JSON.

use anyhow::Result;
use tracing::info;

use ops_access::{config, observability};

fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::AccessConfig::from_env()?;

    observability::init(config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        policy = ?config.policy_path,
        "Checking access policy"
    );

    let policy = config.load_policy()?;

    for role in policy.resolver().roles() {
        info!(
            role = %role.name,
            permissions = role.permissions.len(),
            system = role.is_system,
            "Role loaded"
        );
    }

    match policy.fallback_role() {
        Some(role) => info!(fallback = %role, "Unknown roles fall back to configured role"),
        None => info!("Unknown roles are rejected"),
    }

    let report = serde_json::to_string_pretty(&policy.report())?;
    println!("{report}");

    Ok(())
}
