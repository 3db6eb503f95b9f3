//! Retry backoff strategies with jitter.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterError;
use crate::config::UnifiedClientConfig;

/// Backoff strategy for retrying failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// `base * attempt`
    Linear,
    /// `base * multiplier ^ (attempt - 1)`, capped at the max delay.
    Exponential,
    /// `base * fib(attempt)`, capped at the max delay.
    Fibonacci,
}

impl RetryStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::Fibonacci => "fibonacci",
        }
    }
}

impl Display for RetryStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            "fibonacci" => Ok(Self::Fibonacci),
            other => Err(format!(
                "invalid retry strategy '{other}', expected one of linear, exponential, fibonacci"
            )),
        }
    }
}

/// Backoff computation and retry-eligibility rules for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub strategy: RetryStrategy,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Exponential,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &UnifiedClientConfig) -> Self {
        Self {
            strategy: config.retry_strategy,
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            multiplier: config.backoff_multiplier,
            max_retries: config.max_retries,
        }
    }

    /// Backoff before the given retry attempt (1-based), without jitter.
    ///
    /// Non-decreasing in `attempt` and never above `max_delay`.
    pub fn raw_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let seconds = match self.strategy {
            RetryStrategy::Linear => self.base_delay.as_secs_f64() * f64::from(attempt),
            RetryStrategy::Exponential => {
                let scale = self.multiplier.powi(attempt as i32 - 1);
                self.base_delay.as_secs_f64() * scale
            }
            RetryStrategy::Fibonacci => self.base_delay.as_secs_f64() * fib(attempt) as f64,
        };
        let capped = seconds.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }

    /// Backoff with bounded jitter (+/- 10%) to avoid synchronized retry
    /// storms across concurrent callers.
    pub fn delay(&self, attempt: u32) -> Duration {
        let raw = self.raw_delay(attempt);
        let factor = 0.9 + fastrand::f64() * 0.2;
        Duration::from_secs_f64(raw.as_secs_f64() * factor)
    }

    /// Backoff for the next attempt, honoring a server-provided hint.
    ///
    /// A quota error's `retry_after` overrides the computed curve.
    pub fn next_delay(&self, attempt: u32, error: &AdapterError) -> Duration {
        error.retry_after().unwrap_or_else(|| self.delay(attempt))
    }

    /// Whether another attempt against the same adapter is allowed.
    ///
    /// `attempt` is the number of attempts already made; the budget is spent
    /// once it reaches `max_retries`. Terminal error classes are never
    /// retried regardless of remaining budget.
    pub fn should_retry(&self, attempt: u32, error: &AdapterError) -> bool {
        error.retryable() && attempt < self.max_retries
    }
}

fn fib(n: u32) -> u64 {
    let (mut previous, mut current) = (0_u64, 1_u64);
    for _ in 0..n {
        let next = previous.saturating_add(current);
        previous = current;
        current = next;
    }
    previous
}
