//! Bounded polling for the repository index lock.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::VcsError;

use super::VersionControl;

/// How long to wait for a foreign `index.lock` to disappear.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Delay between lock checks.
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Wait until the index lock is released, polling every `interval`.
///
/// Returns how long the wait took, or `VcsError::LockContention` once
/// `timeout` has elapsed with the lock still present.
pub async fn wait_for_index_unlock<V>(
    vcs: &V,
    timeout: Duration,
    interval: Duration,
) -> Result<Duration, VcsError>
where
    V: VersionControl + ?Sized,
{
    let started = Instant::now();

    while vcs.index_locked() {
        let waited = started.elapsed();
        if waited >= timeout {
            return Err(VcsError::LockContention {
                waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            });
        }
        tokio::time::sleep(interval.min(timeout - waited)).await;
    }

    let waited = started.elapsed();
    if !waited.is_zero() {
        debug!("Index lock released after {}ms", waited.as_millis());
    }
    Ok(waited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockVersionControl;

    #[tokio::test(start_paused = true)]
    async fn test_returns_immediately_without_lock() {
        let mut vcs = MockVersionControl::new();
        vcs.expect_index_locked().times(1).return_const(false);

        let waited = wait_for_index_unlock(&vcs, DEFAULT_LOCK_TIMEOUT, DEFAULT_LOCK_POLL_INTERVAL)
            .await
            .unwrap();
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_when_lock_removed_mid_wait() {
        let started = Instant::now();
        let mut vcs = MockVersionControl::new();
        vcs.expect_index_locked()
            .returning(move || started.elapsed() < Duration::from_millis(50));

        let waited = wait_for_index_unlock(&vcs, DEFAULT_LOCK_TIMEOUT, DEFAULT_LOCK_POLL_INTERVAL)
            .await
            .unwrap();
        assert!(waited >= Duration::from_millis(50));
        assert!(waited <= DEFAULT_LOCK_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_lock_persists() {
        let mut vcs = MockVersionControl::new();
        vcs.expect_index_locked().return_const(true);

        let err = wait_for_index_unlock(&vcs, DEFAULT_LOCK_TIMEOUT, DEFAULT_LOCK_POLL_INTERVAL)
            .await
            .unwrap_err();
        match err {
            VcsError::LockContention { waited_ms } => assert_eq!(waited_ms, 250),
            other => panic!("Expected LockContention, got: {other:?}"),
        }
    }
}
