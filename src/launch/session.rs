use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::coordinator::{LaunchCoordinator, LaunchGuard};
use super::resolver::{PartitionSetResolver, PartitionSetState};
use super::{LaunchOutcome, LaunchTarget};
use crate::error::RemoteError;
use crate::partition::asset_key::AssetKey;
use crate::partition::health::PartitionHealthIndex;
use crate::partition::selection::{ReseedPolicy, SelectionState};
use crate::remote::PartitionService;

/// What became of a call to [`LaunchSession::launch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchAttempt {
    Completed(LaunchOutcome),
    /// Another launch from this session was still in flight; nothing was sent.
    AlreadyLaunching,
    /// The dialog is not open; nothing was sent.
    NotOpen,
    /// The dialog was closed while the launch was in flight. The remote call
    /// still completed; its outcome is not presented.
    Discarded(LaunchOutcome),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State of one launch dialog: selection, partition set, launch status.
///
/// All methods take `&self` so a session can be shared between the task
/// driving the operator's actions and a background health refresh.
pub struct LaunchSession {
    target: LaunchTarget,
    upstream_keys: Vec<AssetKey>,
    service: Arc<dyn PartitionService>,
    resolver: PartitionSetResolver,
    coordinator: LaunchCoordinator,
    selection: Mutex<SelectionState>,
    partition_set: Mutex<PartitionSetState>,
    last_outcome: Mutex<Option<LaunchOutcome>>,
    running_backfills: Mutex<Vec<String>>,
    open: AtomicBool,
    launching: AtomicBool,
    activation: AtomicU64,
}

impl LaunchSession {
    pub fn new(
        target: LaunchTarget,
        upstream_keys: Vec<AssetKey>,
        service: Arc<dyn PartitionService>,
        policy: ReseedPolicy,
    ) -> Self {
        Self {
            target,
            upstream_keys,
            resolver: PartitionSetResolver::new(Arc::clone(&service)),
            coordinator: LaunchCoordinator::new(Arc::clone(&service)),
            service,
            selection: Mutex::new(SelectionState::new(policy)),
            partition_set: Mutex::new(PartitionSetState::Pending),
            last_outcome: Mutex::new(None),
            running_backfills: Mutex::new(Vec::new()),
            open: AtomicBool::new(false),
            launching: AtomicBool::new(false),
            activation: AtomicU64::new(0),
        }
    }

    pub fn target(&self) -> &LaunchTarget {
        &self.target
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn is_launching(&self) -> bool {
        self.launching.load(Ordering::Acquire)
    }

    pub fn partition_set(&self) -> PartitionSetState {
        lock(&self.partition_set).clone()
    }

    pub fn last_outcome(&self) -> Option<LaunchOutcome> {
        lock(&self.last_outcome).clone()
    }

    /// Snapshot of the current selection state.
    pub fn selection(&self) -> SelectionState {
        lock(&self.selection).clone()
    }

    pub fn selected(&self) -> Vec<String> {
        lock(&self.selection).selected().to_vec()
    }

    /// Apply an operator action to the selection.
    pub fn update_selection<R>(&self, f: impl FnOnce(&mut SelectionState) -> R) -> R {
        f(&mut lock(&self.selection))
    }

    /// Activate the dialog and resolve the partition set if it is not known
    /// yet. A failed lookup is attempted again on the next activation.
    ///
    /// Once the partition set is known, the backfills already running for it
    /// are looked up on every activation.
    pub async fn open(&self) -> PartitionSetState {
        self.open.store(true, Ordering::Release);
        self.activation.fetch_add(1, Ordering::AcqRel);

        let mut state = self.partition_set();
        if !matches!(state, PartitionSetState::Resolved(_)) {
            state = self
                .resolver
                .resolve(&self.target.repo, &self.target.job_name)
                .await
                .into();
            if let PartitionSetState::Failed(failure) = &state {
                info!(job = %self.target.job_name, message = %failure.message, "Partition set lookup failed");
            }
            *lock(&self.partition_set) = state.clone();
        }

        if let PartitionSetState::Resolved(set) = &state {
            self.refresh_running_backfills(&set.name).await;
        }
        state
    }

    /// Backfills already in progress for the partition set, as of the last
    /// activation.
    pub fn running_backfills(&self) -> Vec<String> {
        lock(&self.running_backfills).clone()
    }

    async fn refresh_running_backfills(&self, partition_set_name: &str) {
        let running = match self.service.fetch_running_backfills(partition_set_name).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(partition_set = partition_set_name, error = %e, "Failed to list running backfills");
                Vec::new()
            }
        };
        *lock(&self.running_backfills) = running;
    }

    /// Deactivate the dialog. An in-flight launch keeps running.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Pull fresh health data for the launched and upstream assets.
    ///
    /// Returns true when the selection was reseeded to a new most-recent key.
    pub async fn refresh_health(&self) -> Result<bool, RemoteError> {
        let health = self
            .service
            .fetch_partition_health(&self.target.asset_keys())
            .await?;
        let upstream = if self.upstream_keys.is_empty() {
            Vec::new()
        } else {
            self.service
                .fetch_partition_health(&self.upstream_keys)
                .await?
        };

        let reseeded = lock(&self.selection).observe_health(
            PartitionHealthIndex::new(health),
            PartitionHealthIndex::new(upstream),
        );
        debug!(reseeded, "Partition health refreshed");
        Ok(reseeded)
    }

    /// Launch the current selection.
    ///
    /// The selection is captured when the call starts; later refreshes do
    /// not affect the launch already in flight. The session stays in the
    /// launching state until the outcome is recorded, so a successful launch
    /// has closed the dialog before another call can start.
    pub async fn launch(&self) -> LaunchAttempt {
        let Some(_guard) = LaunchGuard::acquire(&self.launching) else {
            return LaunchAttempt::AlreadyLaunching;
        };
        if !self.is_open() {
            debug!(job = %self.target.job_name, "Dialog is not open, ignoring launch");
            return LaunchAttempt::NotOpen;
        }

        let activation = self.activation.load(Ordering::Acquire);
        let selection = self.selected();
        let partition_set = self.partition_set();

        let Some(outcome) = self
            .coordinator
            .launch(&self.target, &partition_set, selection)
            .await
        else {
            return LaunchAttempt::AlreadyLaunching;
        };

        if !self.is_open() || self.activation.load(Ordering::Acquire) != activation {
            debug!(outcome = %outcome, "Dialog closed during launch, discarding outcome");
            return LaunchAttempt::Discarded(outcome);
        }

        *lock(&self.last_outcome) = Some(outcome.clone());
        if outcome.is_success() {
            self.close();
        }
        LaunchAttempt::Completed(outcome)
    }
}
