use std::ops::Range;

use thiserror::Error;

use crate::abort::Aborted;
use crate::gate::{RunState, StepGate};

use super::{IterativeJob, ProgressEvent};

/// Sub-range of a job's steps to execute. `end` is clamped to the job's total;
/// a window with `start >= end` runs nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepWindow {
    pub start: usize,
    pub end: Option<usize>,
}

impl StepWindow {
    pub const FULL: StepWindow = StepWindow {
        start: 0,
        end: None,
    };

    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self {
            start: start.unwrap_or(0),
            end,
        }
    }

    fn range(&self, total_steps: usize) -> Range<usize> {
        let end = self.end.map_or(total_steps, |e| e.min(total_steps));
        self.start.min(end)..end
    }
}

impl Default for StepWindow {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Aborted(#[from] Aborted),
    #[error("job has no steps")]
    NoSteps,
    #[error("step {step} failed: {source}")]
    Step {
        step: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type RunnerResult<T> = Result<T, RunnerError>;

pub struct Runner {
    pub gate: StepGate,
    pub window: StepWindow,
}

impl Runner {
    pub fn new(gate: StepGate) -> Self {
        Self {
            gate,
            window: StepWindow::FULL,
        }
    }

    pub fn with_window(mut self, window: StepWindow) -> Self {
        self.window = window;
        self
    }

    /// Drives `job` through the window, checking the gate before every step.
    ///
    /// On abort the job and its partial state are dropped and the abort is
    /// returned unchanged. The gate's state cell ends as `Done` or `Aborted`.
    pub fn run<J, O>(self, job: J, observer: O) -> RunnerResult<J::Output>
    where
        J: IterativeJob,
        O: FnMut(ProgressEvent<'_, J::Payload>),
    {
        let state = self.gate.state().clone();
        state.set(RunState::Running);

        let result = self.drive(job, observer);
        match &result {
            Ok(_) => {
                state.set(RunState::Done);
                log::info!("Job completed");
            }
            Err(RunnerError::Aborted(aborted)) => {
                state.set(RunState::Aborted);
                log::warn!("System interrupt, {}", aborted);
            }
            Err(e) => {
                state.set(RunState::Aborted);
                log::error!("Job failed: {}", e);
            }
        }
        result
    }

    fn drive<J, O>(&self, mut job: J, mut observer: O) -> RunnerResult<J::Output>
    where
        J: IterativeJob,
        O: FnMut(ProgressEvent<'_, J::Payload>),
    {
        let total_steps = job.total_steps();
        if total_steps == 0 {
            return Err(RunnerError::NoSteps);
        }

        let steps = self.window.range(total_steps);
        log::info!(
            "Running steps {}..{} of {}",
            steps.start,
            steps.end,
            total_steps
        );

        for step_index in steps {
            self.gate.abort_signal().check(step_index)?;

            let payload = job.payload();
            self.gate.check(step_index, total_steps, |i, total| {
                observer(ProgressEvent {
                    step_index: i,
                    total_steps: total,
                    payload: &payload,
                })
            })?;

            job.step(step_index).map_err(|e| RunnerError::Step {
                step: step_index,
                source: Box::new(e),
            })?;
        }

        Ok(job.finish())
    }
}
