use anyhow::{bail, Result};
use std::collections::HashSet;

use super::types::LaunchConfig;

/// Validate the entire configuration for correctness.
pub fn validate(config: &LaunchConfig) -> Result<()> {
    validate_target(config)?;
    validate_assets(config)?;
    validate_upstream(config)?;
    Ok(())
}

fn validate_target(config: &LaunchConfig) -> Result<()> {
    if config.job.trim().is_empty() {
        bail!("'job' must not be empty");
    }
    if config.repository.location.trim().is_empty() || config.repository.name.trim().is_empty() {
        bail!("'repository' needs both a location and a name");
    }
    if config.settings.timeout_secs == 0 {
        bail!("'settings.timeout_secs' must be greater than zero");
    }
    Ok(())
}

/// Every launched asset needs a unique, non-empty key and an op name.
fn validate_assets(config: &LaunchConfig) -> Result<()> {
    if config.assets.is_empty() {
        bail!("At least one asset must be listed under 'assets'");
    }

    let mut seen = HashSet::new();
    for asset in &config.assets {
        let display = asset.key.join("/");
        if asset.key.is_empty() || asset.key.iter().any(|s| s.trim().is_empty()) {
            bail!("Asset key '{}' has an empty path segment", display);
        }
        if !seen.insert(display.clone()) {
            bail!("Asset '{}' is listed more than once", display);
        }
    }

    // op names
    config.target()?;
    Ok(())
}

fn validate_upstream(config: &LaunchConfig) -> Result<()> {
    for key in &config.upstream {
        if key.is_empty() || key.iter().any(|s| s.trim().is_empty()) {
            bail!(
                "Upstream asset key '{}' has an empty path segment",
                key.join("/")
            );
        }
    }
    Ok(())
}
