use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ResolutionFailure;
use crate::remote::{PartitionService, PartitionSet, RepoAddress};

/// Where a dialog is in locating its partition set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PartitionSetState {
    /// Not resolved yet; the dialog has not been opened.
    #[default]
    Pending,
    Resolved(PartitionSet),
    Failed(ResolutionFailure),
}

impl PartitionSetState {
    pub fn partition_set(&self) -> Option<&PartitionSet> {
        match self {
            PartitionSetState::Resolved(set) => Some(set),
            PartitionSetState::Pending | PartitionSetState::Failed(_) => None,
        }
    }
}

impl From<Result<PartitionSet, ResolutionFailure>> for PartitionSetState {
    fn from(result: Result<PartitionSet, ResolutionFailure>) -> Self {
        match result {
            Ok(set) => PartitionSetState::Resolved(set),
            Err(failure) => PartitionSetState::Failed(failure),
        }
    }
}

/// Pick the partition set addressing a job's launches.
///
/// Jobs are expected to define exactly one partition set. When the server
/// lists several, the first one wins.
pub fn pick_partition_set(results: Vec<PartitionSet>) -> Option<PartitionSet> {
    if results.len() > 1 {
        warn!(
            count = results.len(),
            chosen = %results[0].name,
            "Job has multiple partition sets, using the first"
        );
    }
    results.into_iter().next()
}

/// Looks up the partition set of a job.
pub struct PartitionSetResolver {
    service: Arc<dyn PartitionService>,
}

impl PartitionSetResolver {
    pub fn new(service: Arc<dyn PartitionService>) -> Self {
        Self { service }
    }

    pub async fn resolve(
        &self,
        repo: &RepoAddress,
        job_name: &str,
    ) -> Result<PartitionSet, ResolutionFailure> {
        debug!(repository = %repo, job = job_name, "Resolving partition set");

        match self.service.fetch_partition_sets(repo, job_name).await {
            Ok(results) => {
                pick_partition_set(results).ok_or_else(|| ResolutionFailure::no_details(job_name))
            }
            Err(e) => Err(ResolutionFailure {
                job_name: job_name.to_string(),
                message: e.message(),
            }),
        }
    }
}
