use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::IterativeJob;

/// Parameters for a [`Relaxation`] run.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RelaxationParams {
    pub steps: usize,
    #[serde(default = "default_size")]
    pub size: usize,
    /// Artificial per-step work time, in milliseconds.
    #[serde(default)]
    pub step_delay_ms: u64,
    #[serde(default)]
    pub start_at_step: Option<usize>,
    #[serde(default)]
    pub end_at_step: Option<usize>,
}

fn default_size() -> usize {
    64
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RelaxationResult {
    pub values: Vec<f64>,
    pub residual: f64,
}

/// Repeated neighbour averaging over a 1D buffer with fixed endpoints.
///
/// Starts from a unit step (zeros then ones); each step replaces every interior
/// point with the mean of itself and its neighbours. The residual is the largest
/// change made by the last step.
#[derive(Debug, Clone)]
pub struct Relaxation {
    values: Vec<f64>,
    scratch: Vec<f64>,
    steps: usize,
    step_delay: Duration,
    residual: f64,
}

impl Relaxation {
    pub fn new(size: usize, steps: usize) -> Self {
        let values: Vec<f64> = (0..size)
            .map(|i| if i < size / 2 { 0.0 } else { 1.0 })
            .collect();
        Self {
            scratch: values.clone(),
            values,
            steps,
            step_delay: Duration::ZERO,
            residual: f64::INFINITY,
        }
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }
}

impl From<&RelaxationParams> for Relaxation {
    fn from(params: &RelaxationParams) -> Self {
        Relaxation::new(params.size, params.steps)
            .with_step_delay(Duration::from_millis(params.step_delay_ms))
    }
}

impl IterativeJob for Relaxation {
    type Payload = f64;
    type Output = RelaxationResult;
    type Error = Infallible;

    fn total_steps(&self) -> usize {
        self.steps
    }

    fn payload(&self) -> f64 {
        self.residual
    }

    fn step(&mut self, _step_index: usize) -> Result<(), Infallible> {
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }

        let n = self.values.len();
        let mut residual: f64 = 0.0;
        for i in 1..n.saturating_sub(1) {
            let next = (self.values[i - 1] + self.values[i] + self.values[i + 1]) / 3.0;
            residual = residual.max((next - self.values[i]).abs());
            self.scratch[i] = next;
        }
        std::mem::swap(&mut self.values, &mut self.scratch);
        // Keep the untouched endpoints in sync for the next swap.
        self.scratch.copy_from_slice(&self.values);
        self.residual = residual;
        Ok(())
    }

    fn finish(self) -> RelaxationResult {
        RelaxationResult {
            values: self.values,
            residual: self.residual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(mut job: Relaxation) -> RelaxationResult {
        for i in 0..job.total_steps() {
            job.step(i).unwrap();
        }
        job.finish()
    }

    #[test]
    fn residual_shrinks_and_endpoints_stay_fixed() {
        let short = run(Relaxation::new(16, 5));
        let long = run(Relaxation::new(16, 200));

        assert!(long.residual < short.residual);
        assert_eq!(long.values[0], 0.0);
        assert_eq!(long.values[15], 1.0);
        assert!(long.values.windows(2).all(|w| w[0] <= w[1] + 1e-12));
    }

    #[test]
    fn tiny_buffers_are_left_alone() {
        let out = run(Relaxation::new(2, 3));
        assert_eq!(out.values, vec![0.0, 1.0]);
        assert_eq!(out.residual, 0.0);
    }

    #[test]
    fn params_apply_defaults() {
        let params: RelaxationParams = serde_json::from_str(r#"{"steps": 4}"#).unwrap();
        assert_eq!(params.size, 64);
        assert_eq!(params.step_delay_ms, 0);
        assert!(params.start_at_step.is_none());
        assert_eq!(Relaxation::from(&params).total_steps(), 4);
    }
}
