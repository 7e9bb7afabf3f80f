//! The convergence-wait primitive.
//!
//! External fleet and traffic-source state exposes no push mechanism,
//! so every wait in fleetroll is a fixed-interval poll. This module
//! provides the one loop shape all of them share: probe, retry past
//! transient read failures, sleep, repeat — with an optional deadline
//! for callers that want a bounded wait.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{RolloutError, RolloutResult};

/// Poll `probe` every `interval` until it yields a value.
///
/// The probe returns `Ok(Some(v))` when the awaited condition holds,
/// `Ok(None)` to keep waiting, or `Err` for a failed read — which is
/// logged and retried on the next tick, per the read-path error
/// policy. With `deadline: None` the wait is unbounded, which is the
/// rollout's default: an operator watching the logs is the timeout.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    interval: Duration,
    deadline: Option<Duration>,
    mut probe: F,
) -> RolloutResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RolloutResult<Option<T>>>,
{
    let started = Instant::now();
    loop {
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => debug!(what, "condition not met yet"),
            Err(err) => warn!(what, error = %err, "probe failed, will retry"),
        }

        if let Some(limit) = deadline {
            if started.elapsed() >= limit {
                return Err(RolloutError::Fatal(format!(
                    "timed out after {limit:?} waiting for {what}"
                )));
            }
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_on_first_success() {
        let result = poll_until("nothing", Duration::from_secs(10), None, || async {
            Ok(Some(42))
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_polling_until_condition_holds() {
        let polls = AtomicU32::new(0);
        let result = poll_until("third time", Duration::from_secs(10), None, || {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(if n >= 2 { Some(n) } else { None }) }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let polls = AtomicU32::new(0);
        let result = poll_until("flaky read", Duration::from_secs(10), None, || {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(RolloutError::Transient("api timeout".to_string()))
                } else {
                    Ok(Some(()))
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_yields_fatal() {
        let result: RolloutResult<()> = poll_until(
            "never",
            Duration::from_secs(10),
            Some(Duration::from_secs(25)),
            || async { Ok(None) },
        )
        .await;
        match result {
            Err(RolloutError::Fatal(msg)) => assert!(msg.contains("never")),
            other => panic!("expected fatal timeout, got {other:?}"),
        }
    }
}
