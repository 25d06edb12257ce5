//! Background refresh scheduler
//!
//! Drives the fetch -> normalize -> publish pipeline on a fixed interval,
//! with a coalesced manual trigger and exponential backoff after failures.
//! At most one refresh cycle is in flight at any time; queries keep reading
//! the previously-published snapshot throughout.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::Config;
use crate::normalize::{BuildError, Normalizer};
use crate::snapshot::SnapshotStore;
use crate::upstream::{FetchError, UpstreamClient};

/// Phases of the refresh state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    /// No cycle in flight; waiting for the next trigger
    Idle,
    /// Fetching the raw payload from upstream
    Fetching,
    /// Building a snapshot from the fetched payload
    Normalizing,
    /// Publishing the built snapshot
    Publishing,
    /// Waiting out the backoff delay after a failed cycle
    BackoffWait,
}

/// Point-in-time view of the scheduler, served by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    /// Current state-machine phase
    pub state: RefreshState,
    /// When the last cycle published successfully, if ever
    pub last_success_at: Option<DateTime<Utc>>,
    /// Failed cycles since the last success
    pub consecutive_failures: u32,
    /// Version of the currently-served snapshot (0 = bootstrap)
    pub snapshot_version: u64,
    /// Description of the most recent failure, cleared on success
    pub last_error: Option<String>,
}

/// Mutable scheduler bookkeeping shared with status readers
#[derive(Debug)]
struct StatusInner {
    state: RefreshState,
    last_success_at: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    last_error: Option<String>,
}

/// A failed refresh cycle, from either pipeline stage
#[derive(Debug, Error)]
enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Cloneable handle for triggering and observing the scheduler
///
/// This is the surface handed to the HTTP layer; the owning
/// [`RefreshScheduler`] keeps the shutdown side.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    shared: Arc<Mutex<StatusInner>>,
    force_tx: mpsc::Sender<()>,
    store: Arc<SnapshotStore>,
}

impl SchedulerHandle {
    /// Requests an immediate refresh
    ///
    /// Triggers are coalesced: while a cycle is in flight or a trigger is
    /// already pending, additional requests collapse into the single pending
    /// one. Returns `true` if this call queued a new trigger.
    pub fn force_refresh(&self) -> bool {
        self.force_tx.try_send(()).is_ok()
    }

    /// Returns the current scheduler status for health reporting
    pub fn status(&self) -> RefreshStatus {
        let inner = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        RefreshStatus {
            state: inner.state,
            last_success_at: inner.last_success_at,
            consecutive_failures: inner.consecutive_failures,
            snapshot_version: self.store.current().version,
            last_error: inner.last_error.clone(),
        }
    }
}

/// Owns the background refresh task
///
/// Spawned once at startup; [`shutdown`](RefreshScheduler::shutdown) cancels
/// the task cleanly, aborting any in-flight fetch.
#[derive(Debug)]
pub struct RefreshScheduler {
    handle: SchedulerHandle,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawns the background refresh task
    ///
    /// The first cycle runs immediately so the cache is populated at startup;
    /// subsequent cycles follow `config.refresh_interval`.
    pub fn spawn(client: UpstreamClient, store: Arc<SnapshotStore>, config: &Config) -> Self {
        let shared = Arc::new(Mutex::new(StatusInner {
            state: RefreshState::Idle,
            last_success_at: None,
            consecutive_failures: 0,
            last_error: None,
        }));
        // Capacity 1: a second trigger while one is pending is coalesced.
        let (force_tx, force_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = Worker {
            client,
            store: Arc::clone(&store),
            normalizer: Normalizer::new(),
            shared: Arc::clone(&shared),
            base_backoff: config.base_backoff,
            max_backoff: config.max_backoff,
        };
        let interval = config.refresh_interval;
        let task = tokio::spawn(worker.run(interval, force_rx, shutdown_rx));

        Self {
            handle: SchedulerHandle {
                shared,
                force_tx,
                store,
            },
            shutdown_tx,
            task,
        }
    }

    /// Returns a cloneable trigger/status handle
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Stops the background task and waits for it to finish
    ///
    /// An in-flight cycle is aborted; the fetch future is dropped rather
    /// than leaked.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// State owned by the background task
struct Worker {
    client: UpstreamClient,
    store: Arc<SnapshotStore>,
    normalizer: Normalizer,
    shared: Arc<Mutex<StatusInner>>,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl Worker {
    async fn run(
        self,
        refresh_interval: Duration,
        mut force_rx: mpsc::Receiver<()>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(refresh_interval);
        // A cycle that overruns the interval should not cause a burst of
        // catch-up cycles afterwards.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                trigger = force_rx.recv() => {
                    if trigger.is_none() {
                        break;
                    }
                    info!("manual refresh trigger");
                }
                _ = shutdown_rx.changed() => break,
            }

            tokio::select! {
                _ = self.run_cycle() => {}
                _ = shutdown_rx.changed() => break,
            }
        }

        self.set_state(RefreshState::Idle);
        info!("refresh scheduler stopped");
    }

    /// Runs one fetch -> normalize -> publish cycle
    async fn run_cycle(&self) {
        self.set_state(RefreshState::Fetching);
        let payload = match self.client.fetch().await {
            Ok(payload) => payload,
            Err(err) => {
                self.fail(CycleError::Fetch(err)).await;
                return;
            }
        };

        self.set_state(RefreshState::Normalizing);
        let snapshot = match self.normalizer.build(&payload) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.fail(CycleError::Build(err)).await;
                return;
            }
        };

        self.set_state(RefreshState::Publishing);
        let skipped = snapshot.skipped.total();
        let projections = snapshot.projections.len();
        let version = self.store.publish(snapshot);

        {
            let mut inner = self.shared.lock().unwrap_or_else(|e| e.into_inner());
            inner.consecutive_failures = 0;
            inner.last_success_at = Some(Utc::now());
            inner.last_error = None;
            inner.state = RefreshState::Idle;
        }
        info!(version, projections, skipped, "published snapshot");
    }

    /// Records a failed cycle and waits out the backoff delay
    async fn fail(&self, err: CycleError) {
        let failures = {
            let mut inner = self.shared.lock().unwrap_or_else(|e| e.into_inner());
            inner.consecutive_failures += 1;
            inner.last_error = Some(err.to_string());
            inner.state = RefreshState::BackoffWait;
            inner.consecutive_failures
        };

        let delay = backoff_delay(self.base_backoff, self.max_backoff, failures);
        warn!(%err, failures, ?delay, "refresh cycle failed; backing off");
        tokio::time::sleep(delay).await;

        self.set_state(RefreshState::Idle);
    }

    fn set_state(&self, state: RefreshState) {
        let mut inner = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        inner.state = state;
    }
}

/// Computes the backoff delay after `failures` consecutive failed cycles
///
/// Doubles from `base` per failure and saturates at `max`, so the wait is
/// non-decreasing in the failure count.
fn backoff_delay(base: Duration, max: Duration, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    let factor = 2u32.saturating_pow(exponent);
    base.saturating_mul(factor).min(max)
}
