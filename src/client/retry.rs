//! Retry policy applied to every outgoing request

use std::{fmt, sync::Arc, time::Duration};

use super::config::RequestConfig;

/// What happened on a single request attempt, as seen by a [RetryPolicy]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A response arrived with this status code
    Status(u16),
    /// No response: connection failure, timeout or a broken request
    TransportFailure,
}

pub type RetryPredicate = Arc<dyn Fn(&AttemptOutcome) -> bool + Send + Sync>;

/// Bounded retry with exponential backoff
///
/// Which outcomes are retried is decided by a predicate; the default retries
/// transport failures and `429 Too Many Requests` and nothing else.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    predicate: RetryPredicate,
}

/// Default retry predicate: transport failures and rate limiting
pub fn retry_on_transport_error_or_rate_limit(outcome: &AttemptOutcome) -> bool {
    match outcome {
        AttemptOutcome::TransportFailure => true,
        AttemptOutcome::Status(status) => *status == 429,
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            predicate: Arc::new(retry_on_transport_error_or_rate_limit),
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&AttemptOutcome) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Retries allowed after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether another attempt should follow `outcome`, given that
    /// `retries_so_far` retries have already been made
    ///
    /// The predicate sees every outcome, including the one of the last
    /// allowed attempt.
    pub fn should_retry(&self, retries_so_far: u32, outcome: &AttemptOutcome) -> bool {
        (self.predicate)(outcome) && retries_so_far < self.max_retries
    }

    /// Delay before retry number `retries_so_far + 1`
    ///
    /// A server-provided `Retry-After` wins over the computed delay but is
    /// still capped at the maximum backoff.
    pub fn backoff(&self, retries_so_far: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(retry_after) = retry_after {
            return retry_after.min(self.max_backoff);
        }

        let factor = 1u32.checked_shl(retries_so_far).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RequestConfig::default())
    }
}

impl From<&RequestConfig> for RetryPolicy {
    fn from(config: &RequestConfig) -> Self {
        Self::new(config.max_retries).with_backoff(config.initial_backoff, config.max_backoff)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .finish_non_exhaustive()
    }
}
