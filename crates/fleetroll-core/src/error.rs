//! Error taxonomy for fleetroll.

use thiserror::Error;

/// Result type alias for rollout operations.
pub type RolloutResult<T> = Result<T, RolloutError>;

/// Errors that can occur during a rollout.
///
/// Policy, applied by callers:
/// - `NotFound` at initial validation aborts the run; mid-run it is a
///   staleness condition the surrounding wait loop polls past.
/// - `Transient` read failures are retried by the next loop iteration;
///   transient *mutation* failures are never retried — the caller
///   escalates them to `Fatal`.
/// - `Fatal` terminates the process with a non-zero status.
/// - `Hook` failures block-and-retry for the up-check and are logged
///   and ignored for the down hooks.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient control-plane error: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("hook failed: {0}")]
    Hook(String),
}

impl RolloutError {
    /// Escalate any error into a `Fatal` with added context. Used by
    /// mutation paths, where retrying is not an option.
    pub fn into_fatal(self, context: &str) -> RolloutError {
        RolloutError::Fatal(format!("{context}: {self}"))
    }
}
