//! Waiting for external activation
//!
//! Every wait in the provisioning chain goes through a `Sleeper`, so tests can
//! substitute `RecordingSleeper` and assert the schedule without real delays.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Suspends the current task for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Outcome of a single readiness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// The awaited condition holds; polling stops with this value
    Ready(T),
    /// Not yet; poll again after the interval
    Pending,
}

/// Why `poll_until` stopped without a ready value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    /// Every attempt in the budget returned `Pending`
    #[error("condition not met after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// A check failed outright; polling stops immediately
    #[error("check failed: {0}")]
    Check(E),
}

/// Run `check` until it reports `Ready`, at most `max_attempts` times.
///
/// Checks are spaced `interval` apart: the sleeper is called between two
/// consecutive checks, never before the first nor after the last. A budget of
/// zero attempts times out without calling `check`.
///
/// The check receives the 1-based attempt number.
///
/// # Errors
///
/// Returns `PollError::Timeout` once the budget is spent, or
/// `PollError::Check` with the first error a check returns.
pub async fn poll_until<T, E, F, Fut>(
    sleeper: &dyn Sleeper,
    interval: Duration,
    max_attempts: u32,
    mut check: F,
) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, E>>,
{
    for attempt in 1..=max_attempts {
        if attempt > 1 {
            sleeper.sleep(interval).await;
        }
        match check(attempt).await.map_err(PollError::Check)? {
            PollStatus::Ready(value) => return Ok(value),
            PollStatus::Pending => {
                debug!(attempt, max_attempts, "Condition not met yet");
            }
        }
    }
    Err(PollError::Timeout {
        attempts: max_attempts,
    })
}

/// Fixed wait for eventually-consistent permission changes to take effect
pub async fn await_propagation(sleeper: &dyn Sleeper, delay: Duration, reason: &str) {
    if delay.is_zero() {
        return;
    }
    debug!(delay_secs = delay.as_secs(), reason, "Waiting for propagation");
    sleeper.sleep(delay).await;
}

/// Zero-duration sleeper that records every requested wait
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingSleeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration passed to `sleep`, in call order
    pub fn recorded(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Sum of every requested wait
    pub fn total(&self) -> Duration {
        self.recorded().iter().sum()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const INTERVAL: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn ready_on_first_check_never_sleeps() {
        let sleeper = RecordingSleeper::new();
        let result: Result<&str, PollError<()>> =
            poll_until(&sleeper, INTERVAL, 30, |_| async { Ok(PollStatus::Ready("up")) }).await;

        assert_eq!(result, Ok("up"));
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn stops_as_soon_as_ready() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let result: Result<u32, PollError<()>> = poll_until(&sleeper, INTERVAL, 30, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 4 {
                    Ok(PollStatus::Ready(attempt))
                } else {
                    Ok(PollStatus::Pending)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.recorded(), vec![INTERVAL; 3]);
    }

    #[tokio::test]
    async fn times_out_after_exact_budget() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let result: Result<(), PollError<()>> = poll_until(&sleeper, INTERVAL, 30, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(PollStatus::Pending) }
        })
        .await;

        assert_eq!(result, Err(PollError::Timeout { attempts: 30 }));
        assert_eq!(calls.load(Ordering::SeqCst), 30);
        assert_eq!(sleeper.recorded().len(), 29);
        assert!(sleeper.recorded().iter().all(|d| *d == INTERVAL));
    }

    #[tokio::test]
    async fn check_error_stops_polling() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let result: Result<(), PollError<String>> = poll_until(&sleeper, INTERVAL, 30, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 2 {
                    Err("service unavailable".to_string())
                } else {
                    Ok(PollStatus::Pending)
                }
            }
        })
        .await;

        assert_eq!(
            result,
            Err(PollError::Check("service unavailable".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_budget_times_out_without_checking() {
        let sleeper = RecordingSleeper::new();
        let result: Result<(), PollError<()>> =
            poll_until(&sleeper, INTERVAL, 0, |_| async { Ok(PollStatus::Ready(())) }).await;
        assert_eq!(result, Err(PollError::Timeout { attempts: 0 }));
    }

    #[tokio::test]
    async fn propagation_skips_zero_delay() {
        let sleeper = RecordingSleeper::new();
        await_propagation(&sleeper, Duration::ZERO, "test").await;
        await_propagation(&sleeper, Duration::from_secs(60), "test").await;
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(60)]);
    }
}
