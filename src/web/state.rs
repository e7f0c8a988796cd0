use std::sync::Arc;

use crate::job::{JobLimits, JobRegistry};
use crate::signal::SignalStore;

use super::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub signals: Arc<SignalStore>,
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let signals = Arc::new(SignalStore::new());
        let limits = JobLimits {
            max_steps: config.jobs.max_steps,
            max_size: config.jobs.max_size,
            max_finished_runs: config.jobs.max_finished_runs,
        };
        let jobs = JobRegistry::new(signals.clone(), config.gate.poll_interval, limits);
        Self {
            config: Arc::new(config),
            signals,
            jobs: Arc::new(jobs),
        }
    }
}
