pub mod coordinator;
pub mod resolver;
pub mod session;

use std::fmt;

use crate::error::PreconditionViolation;
use crate::partition::asset_key::AssetKey;
use crate::remote::RepoAddress;

/// An asset in the launch set together with the op that materializes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAsset {
    pub asset_key: AssetKey,
    pub op_name: String,
}

impl LaunchAsset {
    pub fn new(asset_key: AssetKey, op_name: Option<String>) -> Result<Self, PreconditionViolation> {
        match op_name {
            Some(op_name) if !op_name.trim().is_empty() => Ok(Self { asset_key, op_name }),
            _ => Err(PreconditionViolation::MissingStepKey {
                asset: asset_key.display_name(),
            }),
        }
    }
}

/// The job and assets a dialog launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub repo: RepoAddress,
    pub job_name: String,
    pub assets: Vec<LaunchAsset>,
}

impl LaunchTarget {
    pub fn asset_keys(&self) -> Vec<AssetKey> {
        self.assets.iter().map(|a| a.asset_key.clone()).collect()
    }

    /// One step key per launched asset, in asset order.
    pub fn step_keys(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.op_name.clone()).collect()
    }
}

/// The protocol step a launch failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaunchStage {
    PartitionSetLookup,
    TagFetch,
    ConfigFetch,
    Submit,
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchStage::PartitionSetLookup => write!(f, "partition-set-lookup"),
            LaunchStage::TagFetch => write!(f, "tag-fetch"),
            LaunchStage::ConfigFetch => write!(f, "config-fetch"),
            LaunchStage::Submit => write!(f, "submit"),
        }
    }
}

/// Result of one invocation of the launch protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    SingleRunLaunched { run_id: String },
    BackfillLaunched { backfill_id: String },
    Failed { stage: LaunchStage, message: String },
}

impl LaunchOutcome {
    pub fn failed(stage: LaunchStage, message: impl Into<String>) -> Self {
        LaunchOutcome::Failed {
            stage,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, LaunchOutcome::Failed { .. })
    }
}

impl fmt::Display for LaunchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchOutcome::SingleRunLaunched { run_id } => write!(f, "Launched run {}", run_id),
            LaunchOutcome::BackfillLaunched { backfill_id } => {
                write!(f, "Created backfill {}", backfill_id)
            }
            LaunchOutcome::Failed { stage, message } => {
                write!(f, "Launch failed at {}: {}", stage, message)
            }
        }
    }
}
