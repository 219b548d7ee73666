use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::types::LaunchConfig;
use super::validator;

/// File names looked up when a directory is given.
const DEFAULT_FILES: [&str; 2] = ["partlaunch.yaml", "partlaunch.yml"];

/// Load and validate a launch config.
///
/// - If `path` is a file, load just that file.
/// - If `path` is a directory, load `partlaunch.yaml` (or `.yml`) inside it.
pub fn load_config(path: &Path) -> Result<LaunchConfig> {
    let file = resolve_config_file(path)?;
    tracing::info!(file = %file.display(), "Loading launch config");

    let content = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read config file: {}", file.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Failed to parse YAML in: {}", file.display()))?;
    validator::validate(&config)?;
    Ok(config)
}

/// Parse YAML content into a LaunchConfig without validating it.
pub fn parse_config(content: &str) -> Result<LaunchConfig> {
    let config: LaunchConfig =
        serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;
    Ok(config)
}

fn resolve_config_file(path: &Path) -> Result<std::path::PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    if path.is_dir() {
        for name in DEFAULT_FILES {
            let candidate = path.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        bail!("No partlaunch.yaml found in directory: {}", path.display());
    }

    bail!(
        "Config not found: '{}'. Create partlaunch.yaml or specify a path with -c",
        path.display()
    )
}
