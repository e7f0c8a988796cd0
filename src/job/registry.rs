use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::abort::AbortSignal;
use crate::gate::{RunState, StateCell, StepGate};
use crate::signal::SignalStore;

use super::{Relaxation, RelaxationParams, RelaxationResult, Runner, StepWindow};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("run not found: {0}")]
    NotFound(String),
    #[error("steps must be at least 1")]
    NoSteps,
    #[error("invalid parameters: {0}")]
    Invalid(String),
    #[error("run still active: {0}")]
    Active(String),
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunEntry {
    pub id: String,
    pub state: RunState,
    /// Last step reported by the worker.
    pub step: Option<usize>,
    pub total_steps: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RelaxationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Outcome {
    finished_at: Option<DateTime<Utc>>,
    result: Option<RelaxationResult>,
    error: Option<String>,
}

#[derive(Debug)]
struct Run {
    id: String,
    total_steps: usize,
    started_at: DateTime<Utc>,
    state: StateCell,
    abort: AbortSignal,
    // Zero means no step reported yet; otherwise the step index plus one.
    reported: AtomicUsize,
    outcome: Mutex<Outcome>,
}

impl Run {
    fn is_finished(&self) -> bool {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finished_at
            .is_some()
    }

    fn entry(&self) -> RunEntry {
        let outcome = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        RunEntry {
            id: self.id.clone(),
            state: self.state.get(),
            step: self.reported.load(Ordering::SeqCst).checked_sub(1),
            total_steps: self.total_steps,
            started_at: self.started_at,
            finished_at: outcome.finished_at,
            result: outcome.result.clone(),
            error: outcome.error.clone(),
        }
    }
}

/// Bounds applied to runs started through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobLimits {
    pub max_steps: usize,
    pub max_size: usize,
    /// Finished runs kept for status queries; older ones are evicted on start.
    pub max_finished_runs: usize,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            max_size: 1 << 20,
            max_finished_runs: 64,
        }
    }
}

impl JobLimits {
    fn validate(&self, params: &RelaxationParams) -> Result<(), RegistryError> {
        if params.steps == 0 {
            return Err(RegistryError::NoSteps);
        }
        if params.steps > self.max_steps {
            return Err(RegistryError::Invalid(format!(
                "steps must be at most {}",
                self.max_steps
            )));
        }
        if params.size == 0 || params.size > self.max_size {
            return Err(RegistryError::Invalid(format!(
                "size must be between 1 and {}",
                self.max_size
            )));
        }
        Ok(())
    }
}

/// Tracks job runs started through the control surface. Each run gets its own
/// worker thread, abort signal and state cell; all runs share one signal store.
pub struct JobRegistry {
    store: Arc<SignalStore>,
    poll_interval: Duration,
    limits: JobLimits,
    runs: Mutex<HashMap<String, Arc<Run>>>,
}

impl JobRegistry {
    pub fn new(store: Arc<SignalStore>, poll_interval: Duration, limits: JobLimits) -> Self {
        Self {
            store,
            poll_interval,
            limits,
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn start(&self, params: RelaxationParams) -> Result<RunEntry, RegistryError> {
        self.limits.validate(&params)?;

        let id = uuid::Uuid::new_v4().to_string();
        let run = Arc::new(Run {
            id: id.clone(),
            total_steps: params.steps,
            started_at: Utc::now(),
            state: StateCell::default(),
            abort: AbortSignal::new(),
            reported: AtomicUsize::new(0),
            outcome: Mutex::new(Outcome::default()),
        });

        let gate = StepGate::new(self.store.clone(), run.abort.clone())
            .with_poll_interval(self.poll_interval)
            .with_state(run.state.clone());
        let runner = Runner::new(gate).with_window(StepWindow::new(
            params.start_at_step,
            params.end_at_step,
        ));
        let job = Relaxation::from(&params);

        let worker_run = run.clone();
        thread::Builder::new()
            .name(format!("job-{}", &id[..8]))
            .spawn(move || {
                let progress = worker_run.clone();
                let result = runner.run(job, move |event| {
                    progress
                        .reported
                        .store(event.step_index + 1, Ordering::SeqCst);
                    log::debug!(
                        "Run {} step {}/{} (residual {:.3e})",
                        progress.id,
                        event.step_index + 1,
                        event.total_steps,
                        event.payload
                    );
                });

                let mut outcome = worker_run
                    .outcome
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                outcome.finished_at = Some(Utc::now());
                match result {
                    Ok(result) => outcome.result = Some(result),
                    Err(e) => outcome.error = Some(e.to_string()),
                }
            })?;

        log::info!("Started run {} ({} steps)", id, params.steps);
        let entry = run.entry();
        let mut runs = self.lock_runs();
        evict_finished(&mut runs, self.limits.max_finished_runs);
        runs.insert(id, run);
        Ok(entry)
    }

    /// Removes a finished run. Active runs must be interrupted first.
    pub fn remove(&self, id: &str) -> Result<RunEntry, RegistryError> {
        let mut runs = self.lock_runs();
        let run = runs
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if !run.is_finished() {
            return Err(RegistryError::Active(id.to_string()));
        }
        let entry = run.entry();
        runs.remove(id);
        log::info!("Removed run {}", id);
        Ok(entry)
    }

    pub fn get(&self, id: &str) -> Result<RunEntry, RegistryError> {
        self.lock_runs()
            .get(id)
            .map(|run| run.entry())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<RunEntry> {
        let mut entries: Vec<RunEntry> = self.lock_runs().values().map(|r| r.entry()).collect();
        entries.sort_by_key(|e| e.started_at);
        entries
    }

    pub fn interrupt(&self, id: &str) -> Result<RunEntry, RegistryError> {
        let runs = self.lock_runs();
        let run = runs
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        run.abort.raise("interrupted by operator");
        log::info!("Interrupt requested for run {}", id);
        Ok(run.entry())
    }

    /// Raises the abort signal of every run that has not finished. Returns how
    /// many runs were signalled.
    pub fn interrupt_all(&self) -> usize {
        let runs = self.lock_runs();
        let mut count = 0;
        for run in runs.values().filter(|r| !r.state.get().is_terminal()) {
            run.abort.raise("interrupted by operator");
            count += 1;
        }
        log::info!("Interrupt requested for {} active run(s)", count);
        count
    }

    fn lock_runs(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Run>>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops the oldest finished runs so that at most `keep` remain.
fn evict_finished(runs: &mut HashMap<String, Arc<Run>>, keep: usize) {
    let mut finished: Vec<(DateTime<Utc>, String)> = runs
        .values()
        .filter(|r| r.is_finished())
        .map(|r| (r.started_at, r.id.clone()))
        .collect();
    if finished.len() <= keep {
        return;
    }
    finished.sort();
    let excess = finished.len() - keep;
    for (_, id) in finished.into_iter().take(excess) {
        runs.remove(&id);
        log::debug!("Evicted finished run {}", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Command;
    use std::time::Instant;

    fn params(steps: usize, step_delay_ms: u64) -> RelaxationParams {
        RelaxationParams {
            steps,
            size: 8,
            step_delay_ms,
            start_at_step: None,
            end_at_step: None,
        }
    }

    fn registry(limits: JobLimits) -> JobRegistry {
        JobRegistry::new(Arc::new(SignalStore::new()), Duration::from_millis(20), limits)
    }

    fn wait_for<F: Fn(&RunEntry) -> bool>(registry: &JobRegistry, id: &str, f: F) -> RunEntry {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let entry = registry.get(id).unwrap();
            if f(&entry) || Instant::now() > deadline {
                return entry;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn run_completes_with_result() {
        let registry = registry(JobLimits::default());
        let started = registry.start(params(3, 0)).unwrap();

        let entry = wait_for(&registry, &started.id, |e| e.finished_at.is_some());
        assert_eq!(entry.state, RunState::Done);
        assert_eq!(entry.step, Some(2));
        assert!(entry.result.is_some());
        assert!(entry.finished_at.is_some());
        assert!(entry.error.is_none());
    }

    #[test]
    fn paused_run_can_be_interrupted() {
        let store = Arc::new(SignalStore::new());
        store.set_command(Command::Pause);
        let registry =
            JobRegistry::new(store.clone(), Duration::from_millis(20), JobLimits::default());
        let started = registry.start(params(10, 0)).unwrap();

        let entry = wait_for(&registry, &started.id, |e| e.state == RunState::Paused);
        assert_eq!(entry.state, RunState::Paused);
        assert_eq!(entry.step, Some(0));

        assert_eq!(registry.interrupt_all(), 1);
        let entry = wait_for(&registry, &started.id, |e| e.finished_at.is_some());
        assert_eq!(entry.state, RunState::Aborted);
        assert!(entry.result.is_none());
        assert_eq!(
            entry.error.as_deref(),
            Some("aborted at step 0: interrupted by operator")
        );
    }

    #[test]
    fn unknown_run_is_not_found() {
        let registry = registry(JobLimits::default());
        assert!(matches!(
            registry.interrupt("missing"),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(registry.get("missing"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn zero_steps_are_rejected() {
        let registry = registry(JobLimits::default());
        assert!(matches!(
            registry.start(params(0, 0)),
            Err(RegistryError::NoSteps)
        ));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn oversized_params_are_rejected_before_allocating() {
        let registry = registry(JobLimits::default());

        let mut huge = params(1, 0);
        huge.size = usize::MAX;
        assert!(matches!(registry.start(huge), Err(RegistryError::Invalid(_))));

        let mut empty = params(1, 0);
        empty.size = 0;
        assert!(matches!(registry.start(empty), Err(RegistryError::Invalid(_))));

        assert!(matches!(
            registry.start(params(10_001, 0)),
            Err(RegistryError::Invalid(_))
        ));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn finished_run_can_be_removed() {
        let registry = registry(JobLimits::default());
        let started = registry.start(params(2, 0)).unwrap();
        wait_for(&registry, &started.id, |e| e.finished_at.is_some());

        let removed = registry.remove(&started.id).unwrap();
        assert_eq!(removed.state, RunState::Done);
        assert!(matches!(
            registry.get(&started.id),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn active_run_cannot_be_removed() {
        let store = Arc::new(SignalStore::new());
        store.set_command(Command::Pause);
        let registry = JobRegistry::new(store, Duration::from_millis(20), JobLimits::default());
        let started = registry.start(params(3, 0)).unwrap();

        assert!(matches!(
            registry.remove(&started.id),
            Err(RegistryError::Active(_))
        ));

        registry.interrupt(&started.id).unwrap();
        wait_for(&registry, &started.id, |e| e.finished_at.is_some());
        assert!(registry.remove(&started.id).is_ok());
    }

    #[test]
    fn oldest_finished_runs_are_evicted() {
        let registry = registry(JobLimits {
            max_finished_runs: 2,
            ..JobLimits::default()
        });

        let mut ids = Vec::new();
        for _ in 0..4 {
            let started = registry.start(params(1, 0)).unwrap();
            wait_for(&registry, &started.id, |e| e.finished_at.is_some());
            ids.push(started.id);
            // Distinct start times keep eviction order deterministic.
            thread::sleep(Duration::from_millis(5));
        }

        // Eviction runs before each insert, so the newest run sits on top of the cap.
        let kept: Vec<String> = registry.list().into_iter().map(|e| e.id).collect();
        assert_eq!(kept, ids[1..].to_vec());
    }
}
