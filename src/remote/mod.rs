pub mod graphql;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::partition::asset_key::AssetKey;
use crate::partition::health::PartitionHealthData;

/// Code location and repository a job lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoAddress {
    pub location: String,
    pub name: String,
}

impl RepoAddress {
    pub fn selector(&self) -> RepositorySelector {
        RepositorySelector {
            repository_location_name: self.location.clone(),
            repository_name: self.name.clone(),
        }
    }
}

impl std::fmt::Display for RepoAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySelector {
    pub repository_location_name: String,
    pub repository_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSelector {
    pub repository_location_name: String,
    pub repository_name: String,
    pub job_name: String,
}

/// Remote identity needed to address partition launches of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSet {
    pub name: String,
    pub mode: String,
}

/// A tag attached to a partition, as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionTag {
    pub key: String,
    pub value: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl PartitionTag {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// A tag as submitted with a launch: key and value only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTag {
    pub key: String,
    pub value: String,
}

impl From<&PartitionTag> for ExecutionTag {
    fn from(tag: &PartitionTag) -> Self {
        Self {
            key: tag.key.clone(),
            value: tag.value.clone(),
        }
    }
}

/// Launch inputs for one partition. Tags and run config fail independently.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRunInputs {
    pub mode: String,
    pub tags: Result<Vec<PartitionTag>, RemoteError>,
    pub run_config_yaml: Result<Option<String>, RemoteError>,
}

/// Single-partition run submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleRunRequest {
    pub run_config_data: serde_json::Value,
    pub mode: String,
    pub step_keys: Vec<String>,
    pub selector: JobSelector,
    pub tags: Vec<ExecutionTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSetSelector {
    pub partition_set_name: String,
    pub repository_selector: RepositorySelector,
}

/// Multi-partition backfill submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillRequest {
    pub selector: PartitionSetSelector,
    pub partition_names: Vec<String>,
    pub reexecution_steps: Vec<String>,
    pub from_failure: bool,
    pub tags: Vec<ExecutionTag>,
}

/// The remote operations the launch orchestrator depends on.
#[async_trait]
pub trait PartitionService: Send + Sync {
    /// Health data for each asset, in request order.
    async fn fetch_partition_health(
        &self,
        asset_keys: &[AssetKey],
    ) -> Result<Vec<PartitionHealthData>, RemoteError>;

    /// Partition sets defined for a job. May be empty.
    async fn fetch_partition_sets(
        &self,
        repo: &RepoAddress,
        job_name: &str,
    ) -> Result<Vec<PartitionSet>, RemoteError>;

    /// Tags, mode and run config for a single partition.
    async fn fetch_partition_tags_and_config(
        &self,
        repo: &RepoAddress,
        partition_set_name: &str,
        partition_name: &str,
    ) -> Result<PartitionRunInputs, RemoteError>;

    /// Launch one run. Returns the run id.
    async fn submit_single_run(&self, request: &SingleRunRequest) -> Result<String, RemoteError>;

    /// Ids of backfills still in progress for a partition set.
    async fn fetch_running_backfills(
        &self,
        partition_set_name: &str,
    ) -> Result<Vec<String>, RemoteError>;

    /// Create a backfill. Returns the backfill id.
    async fn submit_backfill(&self, request: &BackfillRequest) -> Result<String, RemoteError>;
}
