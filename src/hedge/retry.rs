//! Bounded retry with exponential backoff for venue calls.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;
use crate::exchange::VenueError;

/// Decides whether a failed call is worth repeating.
pub type ErrorClassifier = Arc<dyn Fn(&VenueError) -> bool + Send + Sync>;

/// Retry policy applied to individual remote calls.
///
/// Only errors accepted by the classifier are retried; everything else is
/// returned on the first failure.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff: f64,
    max_delay: Duration,
    classifier: ErrorClassifier,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("backoff", &self.backoff)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl RetryPolicy {
    /// Policy using [`VenueError::is_transient`] as classifier.
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff: backoff.max(1.0),
            max_delay,
            classifier: Arc::new(VenueError::is_transient),
        }
    }

    /// Schedule for quotes, position reads, cancels and limit orders.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
            config.backoff,
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Longer schedule for taker market orders.
    pub fn for_market_orders(config: &RetryConfig) -> Self {
        Self::new(
            config.market_order_attempts,
            Duration::from_millis(config.initial_delay_ms),
            config.market_order_backoff,
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, 1.0, Duration::ZERO)
    }

    /// Replace the transient-error classifier.
    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&VenueError) -> bool + Send + Sync + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the `failures`-th failed attempt (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.backoff.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    /// Run `operation`, retrying transient failures.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, VenueError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VenueError>>,
    {
        let mut failures = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    failures += 1;
                    if failures >= self.max_attempts || !(self.classifier)(&err) {
                        return Err(err);
                    }

                    let delay = self.delay_after(failures);
                    warn!(
                        operation,
                        attempt = failures,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient venue error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::TransportKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn timeout() -> VenueError {
        VenueError::Transport {
            kind: TransportKind::Timeout,
            message: "operation timed out".to_string(),
        }
    }

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO, 2.0, Duration::ZERO)
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2), 1.5, Duration::from_secs(4));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(3));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4)); // capped
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = quick(3)
            .run("ping", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(timeout())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = quick(3)
            .run("ping", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = quick(5)
            .run("ping", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(VenueError::Rejected("insufficient margin".to_string()))
            })
            .await;

        assert!(matches!(result, Err(VenueError::Rejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_classifier() {
        let calls = AtomicU32::new(0);
        let policy = quick(4).with_classifier(|err| matches!(err, VenueError::Rejected(_)));
        let result: Result<(), _> = policy
            .run("ping", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(VenueError::Rejected("busy".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
