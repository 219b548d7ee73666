use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::resolver::PartitionSetState;
use super::{LaunchOutcome, LaunchStage, LaunchTarget};
use crate::config::run_config::parse_run_config;
use crate::error::ResolutionFailure;
use crate::remote::{
    BackfillRequest, ExecutionTag, JobSelector, PartitionService, PartitionSet,
    PartitionSetSelector, SingleRunRequest,
};

pub const NO_PARTITIONS_SELECTED: &str = "No partitions selected.";

/// Clears the launching flag when the launch future completes or is dropped.
pub(crate) struct LaunchGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LaunchGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for LaunchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs the single-run or backfill launch protocol for a selection.
///
/// At most one launch is in flight per coordinator. Remote calls within a
/// launch are issued strictly in sequence and any failure stops the protocol
/// before a later (mutating) call is made. Nothing is retried.
pub struct LaunchCoordinator {
    service: Arc<dyn PartitionService>,
    launching: AtomicBool,
}

impl LaunchCoordinator {
    pub fn new(service: Arc<dyn PartitionService>) -> Self {
        Self {
            service,
            launching: AtomicBool::new(false),
        }
    }

    pub fn is_launching(&self) -> bool {
        self.launching.load(Ordering::Acquire)
    }

    /// Launch `selection` against `target`.
    ///
    /// Returns `None` without contacting the service when another launch is
    /// still in flight; otherwise exactly one outcome.
    pub async fn launch(
        &self,
        target: &LaunchTarget,
        partition_set: &PartitionSetState,
        selection: Vec<String>,
    ) -> Option<LaunchOutcome> {
        let Some(_guard) = LaunchGuard::acquire(&self.launching) else {
            debug!(job = %target.job_name, "Launch already in flight, ignoring");
            return None;
        };

        let outcome = self.run_protocol(target, partition_set, selection).await;
        match &outcome {
            LaunchOutcome::Failed { stage, message } => {
                warn!(job = %target.job_name, %stage, message = %message, "Launch failed")
            }
            LaunchOutcome::SingleRunLaunched { run_id } => {
                info!(job = %target.job_name, run_id = %run_id, "Run launched")
            }
            LaunchOutcome::BackfillLaunched { backfill_id } => {
                info!(job = %target.job_name, backfill_id = %backfill_id, "Backfill created")
            }
        }
        Some(outcome)
    }

    async fn run_protocol(
        &self,
        target: &LaunchTarget,
        partition_set: &PartitionSetState,
        selection: Vec<String>,
    ) -> LaunchOutcome {
        let set = match partition_set {
            PartitionSetState::Resolved(set) => set,
            PartitionSetState::Failed(failure) => {
                return LaunchOutcome::failed(LaunchStage::PartitionSetLookup, failure.to_string())
            }
            PartitionSetState::Pending => {
                let failure = ResolutionFailure::no_details(&target.job_name);
                return LaunchOutcome::failed(LaunchStage::PartitionSetLookup, failure.to_string());
            }
        };

        match selection.as_slice() {
            [] => LaunchOutcome::failed(LaunchStage::Submit, NO_PARTITIONS_SELECTED),
            [partition] => self.launch_single_run(target, set, partition).await,
            _ => self.launch_backfill(target, set, selection).await,
        }
    }

    async fn launch_single_run(
        &self,
        target: &LaunchTarget,
        set: &PartitionSet,
        partition: &str,
    ) -> LaunchOutcome {
        info!(
            job = %target.job_name,
            partition_set = %set.name,
            partition,
            "Launching single partition run"
        );

        let inputs = match self
            .service
            .fetch_partition_tags_and_config(&target.repo, &set.name, partition)
            .await
        {
            Ok(inputs) => inputs,
            Err(e) => return LaunchOutcome::failed(LaunchStage::TagFetch, e.message()),
        };

        let tags = match inputs.tags {
            Ok(tags) => tags,
            Err(e) => return LaunchOutcome::failed(LaunchStage::TagFetch, e.message()),
        };
        let run_config_yaml = match inputs.run_config_yaml {
            Ok(yaml) => yaml.unwrap_or_default(),
            Err(e) => return LaunchOutcome::failed(LaunchStage::ConfigFetch, e.message()),
        };

        let request = SingleRunRequest {
            run_config_data: parse_run_config(&run_config_yaml),
            mode: inputs.mode,
            step_keys: target.step_keys(),
            selector: JobSelector {
                repository_location_name: target.repo.location.clone(),
                repository_name: target.repo.name.clone(),
                job_name: target.job_name.clone(),
            },
            tags: tags.iter().map(ExecutionTag::from).collect(),
        };

        match self.service.submit_single_run(&request).await {
            Ok(run_id) => LaunchOutcome::SingleRunLaunched { run_id },
            Err(e) => LaunchOutcome::failed(LaunchStage::Submit, e.message()),
        }
    }

    async fn launch_backfill(
        &self,
        target: &LaunchTarget,
        set: &PartitionSet,
        selection: Vec<String>,
    ) -> LaunchOutcome {
        info!(
            job = %target.job_name,
            partition_set = %set.name,
            partitions = selection.len(),
            "Launching partition backfill"
        );

        // Backfills never carry tags and never resume from a failure.
        let request = BackfillRequest {
            selector: PartitionSetSelector {
                partition_set_name: set.name.clone(),
                repository_selector: target.repo.selector(),
            },
            partition_names: selection,
            reexecution_steps: target.step_keys(),
            from_failure: false,
            tags: Vec::new(),
        };

        match self.service.submit_backfill(&request).await {
            Ok(backfill_id) => LaunchOutcome::BackfillLaunched { backfill_id },
            Err(e) => LaunchOutcome::failed(LaunchStage::Submit, e.message()),
        }
    }
}
