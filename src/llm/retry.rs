//! Exponential backoff for recoverable generation failures.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::{debug, warn};

/// 3 total attempts, waits of 2s then 4s, capped at 30s.
pub const MAX_ATTEMPTS: u32 = 3;
const INITIAL_INTERVAL_SECS: u64 = 2;
const MAX_INTERVAL_SECS: u64 = 30;

fn backoff_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        randomization_factor: 0.0,
        multiplier: 2.0,
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// Retry an async operation while it fails with a recoverable error.
///
/// `attempt` is called up to `MAX_ATTEMPTS` times. An error for which
/// `is_recoverable` returns false is returned immediately, unwrapped. When
/// every attempt fails, `wrap_exhausted` converts the last error.
pub async fn retry_with_backoff<T, E, Fut, F, R, W>(
    mut attempt: F,
    is_recoverable: R,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    W: FnOnce(E) -> E,
    E: std::fmt::Display,
{
    let mut backoff = backoff_policy();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !is_recoverable(&err) {
            debug!("Not retrying: {err}");
            return Err(err);
        }
        if attempts >= MAX_ATTEMPTS {
            return Err(wrap_exhausted(err));
        }

        let wait = backoff
            .next_backoff()
            .unwrap_or(Duration::from_secs(MAX_INTERVAL_SECS));
        warn!(
            "Attempt {attempts}/{MAX_ATTEMPTS} failed: {err}. Retrying in {}s",
            wait.as_secs()
        );
        tokio::time::sleep(wait).await;
    }
}
