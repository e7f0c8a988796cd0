pub mod registry;
pub mod relax;
pub mod runner;

pub use registry::{JobLimits, JobRegistry, RegistryError, RunEntry};
pub use relax::{Relaxation, RelaxationParams, RelaxationResult};
pub use runner::{Runner, RunnerError, StepWindow};

/// An iterative computation that can be suspended between steps.
///
/// The runner drives `step` once per index in its window and hands observers a
/// `payload` snapshot before each step. A job is consumed by `finish` only when
/// every step in the window has run; an aborted job is dropped instead.
pub trait IterativeJob {
    type Payload;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    fn total_steps(&self) -> usize;

    fn payload(&self) -> Self::Payload;

    fn step(&mut self, step_index: usize) -> Result<(), Self::Error>;

    fn finish(self) -> Self::Output;
}

/// Per-iteration notification handed to progress observers.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a, P> {
    pub step_index: usize,
    pub total_steps: usize,
    pub payload: &'a P,
}
