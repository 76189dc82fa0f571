//! The single shared retry/backoff policy for extraction-time fetches.
//!
//! Transient failures (timeouts, connection faults, 5xx, 429) may be
//! retried with exponential backoff and jitter; everything else fails on
//! the spot. The default policy performs exactly one attempt, so retries
//! only happen when the operator asks for them.

use std::time::Duration;

use rand::Rng;

/// Default base delay for exponential backoff.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays.
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay; `attempt` is the next attempt number.
    Retry { delay: Duration, attempt: u32 },
    /// Give up and surface the failure.
    DoNotRetry { reason: String },
}

/// Configuration for fetch retry behavior.
///
/// Delay calculation: `min(base * multiplier^(attempt-1), max) + jitter`.
#[derive(Debug, Clone)]
pub struct FetchRetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for FetchRetryPolicy {
    /// Single attempt: extraction fetches are not retried unless asked.
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl FetchRetryPolicy {
    /// Creates a policy allowing `max_attempts` total attempts (min 1),
    /// with default backoff settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether attempt number `attempt` (1-indexed, just failed)
    /// should be followed by another.
    #[must_use]
    pub fn should_retry(&self, transient: bool, attempt: u32) -> RetryDecision {
        if !transient {
            return RetryDecision::DoNotRetry {
                reason: "failure is not transient".to_string(),
            };
        }
        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("attempt budget exhausted ({} attempts)", self.max_attempts),
            };
        }
        RetryDecision::Retry {
            delay: self.delay_for_attempt(attempt),
            attempt: attempt + 1,
        }
    }

    /// Exponential delay with jitter for the attempt that just failed.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = self.backoff_multiplier.powi(i32::try_from(exponent).unwrap_or(16));
        let base = self.base_delay.mul_f32(factor).min(self.max_delay);
        #[allow(clippy::cast_possible_truncation)]
        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }
}
