//! Exponential backoff for transient failures
//!
//! Providers define a single request attempt; [`retry_with_exponential_backoff`]
//! repeats it while the failure looks transient and the attempt budget lasts.

use crate::error::ImportError;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Default number of attempts, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default waits between attempts
pub const DEFAULT_DELAYS: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_millis(1000),
    Duration::from_millis(2000),
];

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts (at least one is always made)
    pub max_attempts: u32,
    /// Wait after the n-th failed attempt; the last entry repeats
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delays: DEFAULT_DELAYS.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom attempts and delays
    pub fn new(max_attempts: u32, delays: Vec<Duration>) -> Self {
        Self {
            max_attempts,
            delays,
        }
    }

    /// Single attempt, never retry
    pub fn no_retry() -> Self {
        Self::new(1, Vec::new())
    }

    /// Delay after the failed attempt at `attempt_index` (0-based)
    pub fn delay_for(&self, attempt_index: usize) -> Duration {
        self.delays
            .get(attempt_index)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or_default()
    }
}

/// The last error, together with how many attempts were made
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed after {} attempt(s): {}", self.attempts, self.error)
    }
}

impl<E> std::error::Error for RetryExhausted<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Call `attempt` until it succeeds, fails permanently, or the budget runs out
///
/// After a failure, stops immediately if it was the last attempt or
/// `is_transient` rejects the error. Otherwise sleeps `policy.delay_for(n)`.
pub async fn retry_with_exponential_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut attempt: F,
    is_transient: P,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempts >= max_attempts || !is_transient(&error) {
                    return Err(RetryExhausted { attempts, error });
                }
                let delay = policy.delay_for((attempts - 1) as usize);
                tracing::debug!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Network failures, timeouts, HTTP 5xx and 429 are worth retrying
pub fn is_transient_error(error: &ImportError) -> bool {
    match error {
        ImportError::Network(_) | ImportError::Timeout(_) => true,
        ImportError::Http { status, message } => {
            is_transient_status(*status) || message_has_transient_status(message)
        }
        ImportError::ContentFetch { source, .. } => is_transient_error(source),
        _ => false,
    }
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Looks for a standalone 5xx or 429 code inside free-form text
fn message_has_transient_status(message: &str) -> bool {
    message
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 3)
        .filter_map(|token| token.parse::<u16>().ok())
        .any(is_transient_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// The paused clock may round timer deadlines up to the next millisecond
    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(5),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    fn transient() -> ImportError {
        ImportError::Http {
            status: 503,
            message: "Service Unavailable".to_string(),
        }
    }

    #[test]
    fn test_delay_for_clamps_to_last() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(7), Duration::from_millis(2000));
        assert_eq!(RetryPolicy::no_retry().delay_for(0), Duration::ZERO);
    }

    #[test]
    fn test_is_transient_error() {
        assert!(is_transient_error(&ImportError::Network("reset".into())));
        assert!(is_transient_error(&ImportError::Timeout("slow".into())));
        assert!(is_transient_error(&ImportError::Http {
            status: 429,
            message: String::new()
        }));
        assert!(is_transient_error(&ImportError::Http {
            status: 502,
            message: String::new()
        }));
        assert!(!is_transient_error(&ImportError::Http {
            status: 401,
            message: "invalid api key".into()
        }));
        assert!(!is_transient_error(&ImportError::Http {
            status: 400,
            message: "malformed request".into()
        }));
        assert!(!is_transient_error(&ImportError::Parse("bad".into())));
        assert!(!is_transient_error(&ImportError::NotInCategory("movie".into())));
    }

    #[test]
    fn test_status_embedded_in_message() {
        assert!(is_transient_error(&ImportError::Http {
            status: 400,
            message: "upstream returned 503 from gateway".into()
        }));
        assert!(!message_has_transient_status("error code 4290"));
        assert!(!message_has_transient_status("bad request 400"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_uses_all_attempts() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = retry_with_exponential_backoff(
            &RetryPolicy::default(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            },
            is_transient_error,
        )
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 500ms after the first failure, 1000ms after the second
        assert_elapsed(start, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_stops_immediately() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = retry_with_exponential_backoff(
            &RetryPolicy::default(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ImportError::Http {
                        status: 401,
                        message: "Unauthorized".to_string(),
                    })
                }
            },
            is_transient_error,
        )
        .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);

        let result = retry_with_exponential_backoff(
            &RetryPolicy::default(),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(transient())
                    } else {
                        Ok("done")
                    }
                }
            },
            is_transient_error,
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_index_clamped_beyond_configured_delays() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let policy = RetryPolicy::new(5, vec![Duration::from_millis(100)]);

        let result: Result<(), _> = retry_with_exponential_backoff(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ImportError::Network("reset".to_string())) }
            },
            is_transient_error,
        )
        .await;

        assert_eq!(result.unwrap_err().attempts, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_elapsed(start, Duration::from_millis(400));
    }

    #[test]
    fn test_exhausted_display() {
        let exhausted = RetryExhausted {
            attempts: 2,
            error: ImportError::Network("reset".to_string()),
        };
        assert_eq!(
            exhausted.to_string(),
            "failed after 2 attempt(s): Network error: reset"
        );
    }
}
