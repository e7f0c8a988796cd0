use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

/// Raised when a job run is interrupted. Carries the step the worker was at
/// when it observed the signal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("aborted at step {step}: {reason}")]
pub struct Aborted {
    pub step: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
struct Inner {
    raised: AtomicBool,
    reason: Mutex<Option<String>>,
}

/// Abort signal sent when a job run should be terminated.
/// Can be raised by any control path (interrupt endpoint, CLI, tests); every
/// clone observes the same state. Once raised it stays raised.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    inner: Arc<Inner>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// First reason wins; raising again is a no-op.
    pub fn raise(&self, reason: impl Into<String>) {
        let mut slot = self
            .inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(reason.into());
        }
        self.inner.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Returns `Err` if the signal has been raised, tagging it with `step`.
    pub fn check(&self, step: usize) -> Result<(), Aborted> {
        if !self.is_raised() {
            return Ok(());
        }
        let reason = self
            .inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| "interrupted".to_string());
        Err(Aborted { step, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let signal = AbortSignal::new();
        let other = signal.clone();
        assert!(signal.check(0).is_ok());

        other.raise("operator request");
        assert!(signal.is_raised());
        assert_eq!(
            signal.check(3),
            Err(Aborted {
                step: 3,
                reason: "operator request".into()
            })
        );
    }

    #[test]
    fn first_reason_is_kept() {
        let signal = AbortSignal::new();
        signal.raise("first");
        signal.raise("second");
        assert_eq!(signal.check(0).unwrap_err().reason, "first");
    }
}
