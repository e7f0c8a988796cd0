use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::Command;

/// Shared holder of the current [`Command`].
///
/// Constructed once and handed out behind an `Arc` to every control handler and
/// every job runner. Critical sections copy a single value, and writers wake any
/// gate blocked in [`SignalStore::wait_while_paused`].
#[derive(Debug, Default)]
pub struct SignalStore {
    command: Mutex<Command>,
    changed: Condvar,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_command(&self, command: Command) {
        *self.lock() = command;
        self.changed.notify_all();
    }

    pub fn command(&self) -> Command {
        *self.lock()
    }

    /// Blocks for at most `timeout` while the command is `Pause` and returns the
    /// command seen on wake. The lock is released for the duration of the wait.
    pub fn wait_while_paused(&self, timeout: Duration) -> Command {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |command| *command == Command::Pause)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    // The guarded value is a plain enum, so a poisoned lock still holds a valid command.
    fn lock(&self) -> MutexGuard<'_, Command> {
        self.command.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
