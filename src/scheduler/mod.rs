//! Scheduler module for running probes and aggregating results.

mod summary;

pub use summary::*;

use crate::catalog::{ProbeDescriptor, Registry, Target};
use crate::probe::{AvailabilityChecker, Executor, ProbeResult, TargetStatus};

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

/// Scheduler error types.
#[derive(Error, Debug, PartialEq)]
pub enum SchedulerError {
    #[error("a run is already in progress")]
    AlreadyRunning,
    #[error("unknown target: {0}")]
    UnknownTarget(String),
}

/// Whether a full run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
}

/// The targets a run exercises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Scope {
    All,
    Target(String),
}

impl Scope {
    /// The single target this scope is restricted to, if any.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Scope::All => None,
            Scope::Target(id) => Some(id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "all"),
            Scope::Target(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        if s == "all" {
            Scope::All
        } else {
            Scope::Target(s.to_string())
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

/// Outcome of one full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scope: Scope,
    pub probes_run: usize,
    pub aborted: bool,
    pub summary: Summary,
}

/// Mutable harness state. Only the scheduler writes it.
struct HarnessState {
    run_state: RunState,
    scope: Scope,
    target_status: TargetStatus,
    /// Most recent first.
    results: VecDeque<ProbeResult>,
    abort_tx: Option<broadcast::Sender<()>>,
}

/// Drives probe runs and owns the run state and the result log.
pub struct Scheduler {
    registry: Arc<Registry>,
    executor: Executor,
    checker: AvailabilityChecker,
    probe_delay: Duration,
    state: RwLock<HarnessState>,
    next_id: AtomicU64,
}

impl Scheduler {
    /// Create a new scheduler. `probe_delay` is the pause between probes of a run.
    pub fn new(
        registry: Arc<Registry>,
        executor: Executor,
        checker: AvailabilityChecker,
        probe_delay: Duration,
    ) -> Self {
        let target_status = registry
            .targets()
            .iter()
            .map(|t| (t.id.clone(), false))
            .collect();

        Self {
            registry,
            executor,
            checker,
            probe_delay,
            state: RwLock::new(HarnessState {
                run_state: RunState::Idle,
                scope: Scope::All,
                target_status,
                results: VecDeque::new(),
                abort_tx: None,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start a run over the given scope.
    ///
    /// The run proceeds in a background task; the returned handle resolves
    /// to its report once the scheduler is idle again.
    pub async fn start_run(
        self: &Arc<Self>,
        scope: Scope,
    ) -> Result<JoinHandle<RunReport>, SchedulerError> {
        self.validate_scope(&scope)?;

        let (abort_tx, abort_rx) = broadcast::channel(1);
        {
            let mut state = self.state.write().await;
            if state.run_state == RunState::Running {
                tracing::warn!("Rejecting run for scope {}: a run is in progress", scope);
                return Err(SchedulerError::AlreadyRunning);
            }
            state.run_state = RunState::Running;
            state.scope = scope.clone();
            state.abort_tx = Some(abort_tx);
        }

        let scheduler = Arc::clone(self);
        Ok(tokio::spawn(async move { scheduler.run(scope, abort_rx).await }))
    }

    /// Signal the current run to stop before its next probe.
    ///
    /// Returns false if no run is in progress.
    pub async fn abort_run(&self) -> bool {
        let state = self.state.read().await;
        match &state.abort_tx {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Run one probe outside of any full run.
    pub async fn run_single_probe(&self, descriptor: &ProbeDescriptor) -> ProbeResult {
        self.probe(descriptor).await
    }

    /// Empty the result log.
    pub async fn clear_results(&self) {
        self.state.write().await.results.clear();
    }

    /// Re-check every target and narrow the selected scope to what is reachable.
    pub async fn refresh_availability(&self) -> TargetStatus {
        let status = self.checker.check_targets(self.registry.targets()).await;

        let mut state = self.state.write().await;
        if let Some(scope) = narrow_scope(&state.scope, &status, self.registry.targets()) {
            if scope != state.scope {
                tracing::info!("Scope changed from {} to {}", state.scope, scope);
                state.scope = scope;
            }
        }
        state.target_status = status.clone();

        status
    }

    /// Select the scope used by the next run.
    pub async fn select_scope(&self, scope: Scope) -> Result<(), SchedulerError> {
        self.validate_scope(&scope)?;
        self.state.write().await.scope = scope;
        Ok(())
    }

    pub async fn selected_scope(&self) -> Scope {
        self.state.read().await.scope.clone()
    }

    pub async fn run_state(&self) -> RunState {
        self.state.read().await.run_state
    }

    pub async fn target_status(&self) -> TargetStatus {
        self.state.read().await.target_status.clone()
    }

    /// Snapshot of the result log, most recent first.
    pub async fn results(&self) -> Vec<ProbeResult> {
        self.state.read().await.results.iter().cloned().collect()
    }

    pub async fn summary(&self) -> Summary {
        summarize(&self.state.read().await.results)
    }

    fn validate_scope(&self, scope: &Scope) -> Result<(), SchedulerError> {
        match scope.target_id() {
            Some(id) if self.registry.target(id).is_none() => {
                Err(SchedulerError::UnknownTarget(id.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn run(&self, scope: Scope, mut abort_rx: broadcast::Receiver<()>) -> RunReport {
        let probes: Vec<ProbeDescriptor> = self
            .registry
            .list_probes(scope.target_id())
            .into_iter()
            .cloned()
            .collect();

        tracing::info!("Starting run over {} probes (scope: {})", probes.len(), scope);

        let mut results = Vec::with_capacity(probes.len());
        let mut aborted = false;

        for (i, probe) in probes.iter().enumerate() {
            if !matches!(abort_rx.try_recv(), Err(TryRecvError::Empty)) {
                aborted = true;
                break;
            }

            results.push(self.probe(probe).await);

            if i + 1 < probes.len() {
                tokio::select! {
                    _ = abort_rx.recv() => {
                        aborted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.probe_delay) => {}
                }
            }
        }

        {
            let mut state = self.state.write().await;
            // abort_run sends under the read lock, so nothing can be
            // acknowledged after this check.
            if !aborted && !matches!(abort_rx.try_recv(), Err(TryRecvError::Empty)) {
                aborted = true;
            }
            state.run_state = RunState::Idle;
            state.abort_tx = None;
        }

        let report = RunReport {
            scope,
            probes_run: results.len(),
            aborted,
            summary: summarize(&results),
        };

        if aborted {
            tracing::warn!(
                "Run aborted after {} of {} probes (scope: {})",
                report.probes_run,
                probes.len(),
                report.scope
            );
        } else {
            tracing::info!(
                "Run finished (scope: {}): {} succeeded, {} failed",
                report.scope,
                report.summary.success_count,
                report.summary.error_count
            );
        }

        report
    }

    /// Log a pending entry, execute, then swap in the terminal result.
    async fn probe(&self, descriptor: &ProbeDescriptor) -> ProbeResult {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let in_flight = self.executor.issue(id, descriptor);

        self.state
            .write()
            .await
            .results
            .push_front(in_flight.pending().clone());

        let result = in_flight.settle().await;

        let mut state = self.state.write().await;
        match state
            .results
            .iter_mut()
            .find(|r| r.id == id && !r.is_terminal())
        {
            Some(entry) => *entry = result.clone(),
            None => tracing::debug!(
                "Result for {}/{} settled after the log was cleared",
                result.target,
                result.probe_name
            ),
        }

        result
    }
}

/// Pick the scope implied by fresh availability, or None to keep the current one.
///
/// All targets up selects everything. Otherwise a target scope that is still
/// reachable is kept and anything else falls to the first reachable target.
fn narrow_scope(current: &Scope, status: &TargetStatus, targets: &[Target]) -> Option<Scope> {
    let available: Vec<&str> = targets
        .iter()
        .filter(|t| status.get(&t.id).copied().unwrap_or(false))
        .map(|t| t.id.as_str())
        .collect();

    if available.is_empty() {
        return None;
    }

    if available.len() == targets.len() {
        return Some(Scope::All);
    }

    if let Some(id) = current.target_id() {
        if available.contains(&id) {
            return None;
        }
    }

    Some(Scope::Target(available[0].to_string()))
}
