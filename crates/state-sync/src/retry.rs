//! Fixed-delay bounded retry.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u8 },
    Exhausted { attempts: u8, last_error: E },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u8 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }

    pub fn ok(self) -> Option<T> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }
}

/// Runs `op` up to `max_attempts` times (at least once), sleeping `delay`
/// between failed attempts. `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(max_attempts: u8, delay: Duration, mut op: F) -> RetryOutcome<T, E>
where
    F: FnMut(u8) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Debug,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                }
            }
            Err(last_error) if attempt >= max_attempts => {
                return RetryOutcome::Exhausted {
                    attempts: attempt,
                    last_error,
                }
            }
            Err(err) => {
                debug!(attempt, max_attempts, "attempt failed: {:?}", err);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let calls = Cell::new(0u8);
        let outcome: RetryOutcome<&str, &str> = retry(3, Duration::from_millis(100), |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt == 2 {
                    Ok("done")
                } else {
                    Err("not yet")
                }
            }
        })
        .await;
        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                value: "done",
                attempts: 2
            }
        );
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_bound_with_fixed_delays() {
        let started = Instant::now();
        let outcome: RetryOutcome<(), u8> =
            retry(3, Duration::from_millis(100), |attempt| async move { Err(attempt) }).await;
        assert_eq!(
            outcome,
            RetryOutcome::Exhausted {
                attempts: 3,
                last_error: 3
            }
        );
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(250), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let outcome: RetryOutcome<(), ()> =
            retry(0, Duration::from_millis(100), |_| async { Err(()) }).await;
        assert_eq!(outcome.attempts(), 1);
        assert!(!outcome.is_success());
        assert_eq!(outcome.ok(), None);
    }
}
