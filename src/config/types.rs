use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PreconditionViolation;
use crate::launch::{LaunchAsset, LaunchTarget};
use crate::partition::asset_key::AssetKey;
use crate::partition::selection::ReseedPolicy;
use crate::remote::RepoAddress;

// ─── Top-Level Config ───────────────────────────────────────────────────────

/// Root of a `partlaunch.yaml` file: one partitioned asset job to launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub repository: RepoAddress,
    pub job: String,
    pub assets: Vec<AssetConfig>,
    /// Direct upstream dependencies of the launched assets.
    #[serde(default)]
    pub upstream: Vec<Vec<String>>,
    #[serde(default)]
    pub settings: Settings,
}

/// An asset launched together with the others in the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub key: Vec<String>,
    /// Op (step) that materializes the asset.
    #[serde(default)]
    pub op: Option<String>,
}

/// Global settings controlling remote calls and selection behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub reseed: ReseedPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            reseed: ReseedPolicy::default(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:3000/graphql".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl LaunchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    pub fn asset_keys(&self) -> Vec<AssetKey> {
        self.assets.iter().map(|a| AssetKey::new(a.key.clone())).collect()
    }

    pub fn upstream_keys(&self) -> Vec<AssetKey> {
        self.upstream.iter().map(|k| AssetKey::new(k.clone())).collect()
    }

    /// Build the launch target. Every asset must name its op.
    pub fn target(&self) -> Result<LaunchTarget, PreconditionViolation> {
        let assets = self
            .assets
            .iter()
            .map(|a| LaunchAsset::new(AssetKey::new(a.key.clone()), a.op.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LaunchTarget {
            repo: self.repository.clone(),
            job_name: self.job.clone(),
            assets,
        })
    }
}
