//! Bounded fixed-delay retry for chain writes.
//!
//! Every failed attempt except the last is followed by a sleep of
//! [`RetryPolicy::delay`]. No delay follows the final attempt, and an
//! error the caller marks as not retryable ends the run at once.

use std::future::Future;
use std::time::Duration;

/// Attempts allowed per task, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// The last error and how many attempts were made.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    /// Call `f(attempt)` until it succeeds or `max_attempts` is reached.
    /// `attempt` is 1-based.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, f: F) -> Result<T, RetryExhausted<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_while(operation, |_| true, f).await
    }

    /// Like [`run()`](Self::run), but stops after any error for which
    /// `retryable` returns `false`.
    pub async fn run_while<T, E, R, F, Fut>(
        &self,
        operation: &str,
        retryable: R,
        mut f: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        E: std::fmt::Display,
        R: Fn(&E) -> bool,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match f(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts || !retryable(&e) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
                Err(e) => {
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        "attempt failed, retrying in {:?}: {e}",
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn always_failing_stops_at_three_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();
        let policy = RetryPolicy::default();

        let result: Result<(), _> = policy
            .run("anchor_credential", |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("node unreachable")
                }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two gaps of 30s, none after the last attempt.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let policy = RetryPolicy::default();
        let value = policy
            .run("register_did", |attempt| async move {
                if attempt < 3 {
                    Err("connection refused")
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_ends_the_run() {
        let started = tokio::time::Instant::now();
        let calls = AtomicU32::new(0);
        let exhausted = RetryPolicy::default()
            .run_while(
                "revoke_credential",
                |e: &&str| !e.starts_with("accepted"),
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>("accepted by node, not recorded") }
                },
            )
            .await
            .unwrap_err();
        assert_eq!(exhausted.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        let calls = AtomicU32::new(0);
        let _ = policy
            .run("x", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("nope") }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
