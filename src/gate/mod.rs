mod state;

pub use state::{RunState, StateCell};

use std::sync::Arc;
use std::time::Duration;

use crate::abort::{AbortSignal, Aborted};
use crate::signal::{Command, SignalStore};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a gate check that did not abort. Aborts arrive as `Err(Aborted)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
}

/// Cooperative suspension point for one job run.
///
/// Call [`StepGate::check`] once per iteration. It reports progress, then blocks
/// the calling thread for as long as the shared command is `Pause`. While
/// blocked it wakes at least every `poll_interval` to look at the run's abort
/// signal, and returns the abort as an error instead of resuming.
pub struct StepGate {
    store: Arc<SignalStore>,
    abort: AbortSignal,
    poll_interval: Duration,
    state: StateCell,
}

impl StepGate {
    pub fn new(store: Arc<SignalStore>, abort: AbortSignal) -> Self {
        Self {
            store,
            abort,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: StateCell::default(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Publish run state transitions into an externally owned cell.
    pub fn with_state(mut self, state: StateCell) -> Self {
        self.state = state;
        self
    }

    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    pub fn state(&self) -> &StateCell {
        &self.state
    }

    pub fn check<F>(
        &self,
        step_index: usize,
        total_steps: usize,
        mut on_progress: F,
    ) -> Result<Outcome, Aborted>
    where
        F: FnMut(usize, usize),
    {
        on_progress(step_index, total_steps);

        if self.store.command() != Command::Pause {
            return Ok(Outcome::Continue);
        }

        log::info!(
            "Paused at step {}/{}. Waiting...",
            step_index + 1,
            total_steps
        );
        self.state.set(RunState::Paused);

        loop {
            self.abort.check(step_index)?;
            if self.store.wait_while_paused(self.poll_interval) != Command::Pause {
                break;
            }
        }
        // A resume and an abort can land in the same interval; the abort wins.
        self.abort.check(step_index)?;

        self.state.set(RunState::Running);
        log::info!("Resumed at step {}/{}", step_index + 1, total_steps);
        Ok(Outcome::Continue)
    }
}
