//! Operator interruption (SIGINT/SIGTERM).
//!
//! The first signal requests cancellation: the pipeline stops before the
//! next stage and reports the run as failed. A terminal SIGINT also reaches
//! the foreground child, so a blocking dnf or mkisofs call returns promptly.
//! SIGTERM only reaches us; the per-package loops in the dnf collaborators
//! call [`CancelToken::check`] so they stop after the current package. A
//! second signal exits immediately.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Error returned by work abandoned because of a cancellation request.
#[derive(Debug, thiserror::Error)]
#[error("interrupted by operator")]
pub struct Interrupted;

/// Exit status for any failed or interrupted run.
pub const EXIT_FAILURE: i32 = 1;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    signals: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cancellation request. Returns how many were received so far.
    pub fn cancel(&self) -> u8 {
        self.signals
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1)
    }

    pub fn is_cancelled(&self) -> bool {
        self.signals.load(Ordering::SeqCst) > 0
    }

    /// `Err(Interrupted)` once cancellation was requested.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Route SIGINT/SIGTERM to this token. Call once at startup.
    pub fn install_signal_handler(&self) -> Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            if token.cancel() == 1 {
                eprintln!("\nInterrupted! Stopping after the current step (press Ctrl+C again to exit now)...");
            } else {
                eprintln!("\nInterrupted again, exiting.");
                std::process::exit(EXIT_FAILURE);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        assert_eq!(token.cancel(), 1);
        assert!(clone.is_cancelled());
        assert_eq!(clone.cancel(), 2);
    }

    #[test]
    fn test_check_fails_once_cancelled() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());

        token.cancel();
        let err = token.check().unwrap_err();
        assert_eq!(err.to_string(), "interrupted by operator");
    }
}
