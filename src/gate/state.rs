use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Running,
    Paused,
    Aborted,
    Done,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Aborted | RunState::Done)
    }
}

/// Shared view of a run's state, written by the worker and read by status queries.
#[derive(Debug, Clone, Default)]
pub struct StateCell(Arc<Mutex<RunState>>);

impl StateCell {
    pub fn get(&self) -> RunState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, state: RunState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}
