#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use partlaunch::error::RemoteError;
use partlaunch::launch::{LaunchAsset, LaunchTarget};
use partlaunch::partition::asset_key::AssetKey;
use partlaunch::partition::health::PartitionHealthData;
use partlaunch::remote::{
    BackfillRequest, PartitionRunInputs, PartitionService, PartitionSet, PartitionTag,
    RepoAddress, SingleRunRequest,
};

/// A remote call observed by [`FakeService`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Health(Vec<AssetKey>),
    PartitionSets(String),
    TagsAndConfig { partition_set: String, partition: String },
    RunningBackfills(String),
    SingleRun(SingleRunRequest),
    Backfill(BackfillRequest),
}

/// Scripted `PartitionService` that records every call.
pub struct FakeService {
    pub health: Mutex<HashMap<AssetKey, PartitionHealthData>>,
    pub partition_sets: Mutex<Result<Vec<PartitionSet>, RemoteError>>,
    pub run_inputs: Mutex<Result<PartitionRunInputs, RemoteError>>,
    pub running_backfills: Mutex<Result<Vec<String>, RemoteError>>,
    pub single_run: Mutex<Result<String, RemoteError>>,
    pub backfill: Mutex<Result<String, RemoteError>>,
    pub calls: Mutex<Vec<Call>>,
    /// When set, submissions wait for a permit before answering.
    pub submit_gate: Option<Arc<Semaphore>>,
    pub submits_started: AtomicUsize,
}

impl Default for FakeService {
    fn default() -> Self {
        Self {
            health: Mutex::new(HashMap::new()),
            partition_sets: Mutex::new(Ok(vec![daily_set()])),
            run_inputs: Mutex::new(Ok(PartitionRunInputs {
                mode: "default".to_string(),
                tags: Ok(vec![PartitionTag::new("a", "1")]),
                run_config_yaml: Ok(Some("x: 1".to_string())),
            })),
            running_backfills: Mutex::new(Ok(Vec::new())),
            single_run: Mutex::new(Ok("run-1".to_string())),
            backfill: Mutex::new(Ok("backfill-1".to_string())),
            calls: Mutex::new(Vec::new()),
            submit_gate: None,
            submits_started: AtomicUsize::new(0),
        }
    }
}

impl FakeService {
    pub fn with_gate(gate: Arc<Semaphore>) -> Self {
        Self {
            submit_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn set_health(&self, data: PartitionHealthData) {
        self.health
            .lock()
            .unwrap()
            .insert(data.asset_key.clone(), data);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SingleRun(_) | Call::Backfill(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_for_gate(&self) {
        self.submits_started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.submit_gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl PartitionService for FakeService {
    async fn fetch_partition_health(
        &self,
        asset_keys: &[AssetKey],
    ) -> Result<Vec<PartitionHealthData>, RemoteError> {
        self.record(Call::Health(asset_keys.to_vec()));
        let health = self.health.lock().unwrap();
        Ok(asset_keys
            .iter()
            .map(|k| {
                health.get(k).cloned().unwrap_or_else(|| PartitionHealthData {
                    asset_key: k.clone(),
                    ..PartitionHealthData::default()
                })
            })
            .collect())
    }

    async fn fetch_partition_sets(
        &self,
        _repo: &RepoAddress,
        job_name: &str,
    ) -> Result<Vec<PartitionSet>, RemoteError> {
        self.record(Call::PartitionSets(job_name.to_string()));
        self.partition_sets.lock().unwrap().clone()
    }

    async fn fetch_partition_tags_and_config(
        &self,
        _repo: &RepoAddress,
        partition_set_name: &str,
        partition_name: &str,
    ) -> Result<PartitionRunInputs, RemoteError> {
        self.record(Call::TagsAndConfig {
            partition_set: partition_set_name.to_string(),
            partition: partition_name.to_string(),
        });
        self.run_inputs.lock().unwrap().clone()
    }

    async fn fetch_running_backfills(
        &self,
        partition_set_name: &str,
    ) -> Result<Vec<String>, RemoteError> {
        self.record(Call::RunningBackfills(partition_set_name.to_string()));
        self.running_backfills.lock().unwrap().clone()
    }

    async fn submit_single_run(&self, request: &SingleRunRequest) -> Result<String, RemoteError> {
        self.record(Call::SingleRun(request.clone()));
        self.wait_for_gate().await;
        self.single_run.lock().unwrap().clone()
    }

    async fn submit_backfill(&self, request: &BackfillRequest) -> Result<String, RemoteError> {
        self.record(Call::Backfill(request.clone()));
        self.wait_for_gate().await;
        self.backfill.lock().unwrap().clone()
    }
}

pub fn daily_set() -> PartitionSet {
    PartitionSet {
        name: "daily".to_string(),
        mode: "default".to_string(),
    }
}

pub fn keys(ks: &[&str]) -> Vec<String> {
    ks.iter().map(|k| k.to_string()).collect()
}

pub fn health(path: &[&str], ks: &[&str], materialized: &[&str]) -> PartitionHealthData {
    let materialized: HashSet<&str> = materialized.iter().copied().collect();
    PartitionHealthData::from_statuses(
        AssetKey::new(path.iter().copied()),
        ks.iter().map(|k| (k.to_string(), materialized.contains(k))),
    )
}

pub fn repo() -> RepoAddress {
    RepoAddress {
        location: "loc".to_string(),
        name: "repo".to_string(),
    }
}

pub fn target(ops: &[(&[&str], &str)]) -> LaunchTarget {
    LaunchTarget {
        repo: repo(),
        job_name: "asset_job".to_string(),
        assets: ops
            .iter()
            .map(|(path, op)| {
                LaunchAsset::new(AssetKey::new(path.iter().copied()), Some(op.to_string()))
                    .unwrap()
            })
            .collect(),
    }
}
