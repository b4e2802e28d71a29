//! Retry wrapper for routing provider calls.
//!
//! Adapted from a `CircuitBreaker` (stateful, shared across many calls, opens
//! after a failure threshold and half-opens after a cooldown) into a
//! stateless, per-call retry loop: this retry policy is scoped to one
//! provider call, not to the health of a service over time.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry `call` up to `max_attempts` times with exponential backoff,
/// returning `None` once attempts are exhausted rather than propagating the
/// error — provider failures degrade locally (Haversine fallback, mode
/// downgrade) and never bubble past the call site.
///
/// Honors `cancel`: if cancellation fires while waiting out a backoff delay,
/// the wait is aborted and `None` is returned immediately.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut call: F,
    max_attempts: u32,
    base_delay: Duration,
    cancel: &CancellationToken,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return None;
        }

        match call().await {
            Ok(value) => return Some(value),
            Err(err) => {
                warn!(attempt, max_attempts, error = %err, "provider call failed");
                if attempt >= max_attempts {
                    return None;
                }
                let delay = base_delay * 2u32.pow(attempt - 1);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return None,
                }
            }
        }
    }
}
