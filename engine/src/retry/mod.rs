//! Retry/backoff policy for transient I/O
//!
//! This module provides the bounded-retry wrapper used by REST-based
//! adapters (and by browser adapters around session establishment). The
//! policy retries transient faults with exponential backoff plus random
//! jitter, and escalates authentication failures immediately without
//! retry.
//!
//! Defaults match the platform adapters' needs:
//!
//! - up to **3** total attempts per logical request
//! - backoff starting at **1 s**, doubling each retry
//! - bounded random jitter of **0..500 ms** added to each wait, so
//!   concurrent callers do not produce synchronized retry storms

use rand::Rng;
use sdk::errors::EngineError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Default number of total attempts per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default initial backoff delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for per-wait random jitter.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(500);

/// Reusable retry policy parameterized over any fallible async operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Backoff before the first retry; doubles on each further retry
    pub base_delay: Duration,

    /// Upper bound of the uniform random jitter added to each wait
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with explicit bounds.
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// The deterministic part of the wait after `completed_attempts`
    /// attempts: `base_delay * 2^(completed_attempts - 1)`.
    pub fn backoff_delay(&self, completed_attempts: u32) -> Duration {
        let exponent = completed_attempts.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    fn jitter(&self) -> Duration {
        let bound_ms = self.max_jitter.as_millis() as u64;
        if bound_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..bound_ms))
    }

    /// Run `op` under this policy with the default transient-fault
    /// predicate ([`is_transient`]).
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, EngineError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        self.run_with(op, is_transient).await
    }

    /// Run `op` under this policy with a caller-supplied retryable
    /// predicate.
    ///
    /// `op` receives the 1-based attempt number. Non-retryable errors
    /// (per the predicate) surface immediately; retryable ones are
    /// retried until attempts are exhausted and then surfaced as
    /// [`EngineError::RetriesExhausted`]. The caller decides whether
    /// that aborts the whole run or just the current item.
    pub async fn run_with<T, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, EngineError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
        P: Fn(&EngineError) -> bool,
    {
        let mut attempt = 1u32;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !retryable(&err) => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    return Err(EngineError::RetriesExhausted {
                        attempts: attempt,
                        last: err.to_string(),
                    });
                }
                Err(err) => {
                    let wait = self.backoff_delay(attempt) + self.jitter();
                    debug!(
                        "Attempt {}/{} failed ({}); retrying in {:?}",
                        attempt, self.max_attempts, err, wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Default retryable predicate: request timeouts and server errors.
///
/// Authentication failures (401/403) are deliberately not transient:
/// they surface to the caller on the first attempt.
pub fn is_transient(err: &EngineError) -> bool {
    match err {
        EngineError::Timeout(_) => true,
        EngineError::Http { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Map an HTTP response status into the error taxonomy.
///
/// 401/403 become an authentication fault distinct from transient faults;
/// everything else keeps its status for the retry predicate to inspect.
pub fn status_error(status: u16, message: impl Into<String>) -> EngineError {
    match status {
        401 | 403 => EngineError::AuthRejected(format!("status {}", status)),
        _ => EngineError::Http {
            status,
            message: message.into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(8));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&EngineError::Timeout("t".to_string())));
        assert!(is_transient(&EngineError::Http {
            status: 500,
            message: String::new()
        }));
        assert!(is_transient(&EngineError::Http {
            status: 503,
            message: String::new()
        }));
        assert!(!is_transient(&EngineError::Http {
            status: 404,
            message: String::new()
        }));
        assert!(!is_transient(&EngineError::AuthRejected("401".to_string())));
        assert!(!is_transient(&EngineError::Config("c".to_string())));
    }

    #[test]
    fn test_status_error_maps_auth() {
        assert!(matches!(
            status_error(401, "unauthorized"),
            EngineError::AuthRejected(_)
        ));
        assert!(matches!(
            status_error(403, "forbidden"),
            EngineError::AuthRejected(_)
        ));
        assert!(matches!(
            status_error(502, "bad gateway"),
            EngineError::Http { status: 502, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_transient_then_succeeds() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|_attempt| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(EngineError::Timeout(format!("attempt {}", n)))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exhausts_into_retries_exhausted() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(EngineError::Http {
                        status: 500,
                        message: "boom".to_string(),
                    })
                }
            })
            .await;

        match result {
            Err(EngineError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RetriesExhausted, got {:?}", other.err()),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(status_error(401, "unauthorized")) }
            })
            .await;

        assert!(matches!(result, Err(EngineError::AuthRejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "401 must not be retried");
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_predicate_retries_browser_faults() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10), Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result = policy
            .run_with(
                |_attempt| {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n == 1 {
                            Err(EngineError::Browser("chrome crashed".to_string()))
                        } else {
                            Ok("connected")
                        }
                    }
                },
                |e| matches!(e, EngineError::Browser(_)),
            )
            .await;

        assert_eq!(result.expect("second attempt succeeds"), "connected");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
