use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterId;
use crate::operation::OperationType;
use crate::retry::RetryStrategy;

/// Immutable configuration snapshot for the unified client.
///
/// Loaded once and treated as read-only by every component. Changing the
/// global preference at runtime swaps in a fresh snapshot rather than
/// mutating a shared one.
///
/// # Environment Variables
///
/// [`UnifiedClientConfig::from_env`] reads each field from a prefixed
/// variable first and an unprefixed fallback second:
///
/// | Field | Primary Env Var | Fallback Env Var |
/// |-------|----------------|------------------|
/// | `api_preference` | `ADMUX_API_PREFERENCE` | `API_PREFERENCE` |
/// | `performance_threshold` | `ADMUX_PERFORMANCE_THRESHOLD` | `PERFORMANCE_THRESHOLD` |
/// | `complexity_threshold` | `ADMUX_COMPLEXITY_THRESHOLD` | `COMPLEXITY_THRESHOLD` |
/// | `circuit_breaker_threshold` | `ADMUX_CIRCUIT_BREAKER_THRESHOLD` | `CIRCUIT_BREAKER_THRESHOLD` |
/// | `circuit_breaker_timeout` (s) | `ADMUX_CIRCUIT_BREAKER_TIMEOUT` | `CIRCUIT_BREAKER_TIMEOUT` |
/// | `max_retries` | `ADMUX_MAX_RETRIES` | `MAX_RETRIES` |
/// | `base_delay` (s) | `ADMUX_BASE_DELAY` | `BASE_DELAY` |
/// | `max_delay` (s) | `ADMUX_MAX_DELAY` | `MAX_DELAY` |
/// | `backoff_multiplier` | `ADMUX_BACKOFF_MULTIPLIER` | `BACKOFF_MULTIPLIER` |
/// | `retry_strategy` | `ADMUX_RETRY_STRATEGY` | `RETRY_STRATEGY` |
/// | `enable_fallback` | `ADMUX_ENABLE_FALLBACK` | `ENABLE_FALLBACK` |
/// | `default_timeout` (s) | `ADMUX_DEFAULT_TIMEOUT` | `DEFAULT_TIMEOUT` |
///
/// Malformed values fall back to the documented default for that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedClientConfig {
    /// Global adapter preference; `None` lets routing rules decide.
    pub api_preference: Option<AdapterId>,
    /// Success rate (0..1) below which an adapter counts as unhealthy.
    pub performance_threshold: f64,
    /// Complexity score at or above which bulk routing applies.
    pub complexity_threshold: u32,
    /// Consecutive failures that open an adapter's circuit.
    pub circuit_breaker_threshold: u32,
    /// Cool-down before an open circuit admits its half-open probe.
    pub circuit_breaker_timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub retry_strategy: RetryStrategy,
    pub enable_fallback: bool,
    /// Per-operation adapter overrides; these win over every routing rule
    /// except exclusivity.
    pub operation_preferences: HashMap<OperationType, AdapterId>,
    /// Per-operation deadlines; `default_timeout` applies otherwise.
    pub operation_timeouts: HashMap<OperationType, Duration>,
    pub default_timeout: Duration,
}

impl Default for UnifiedClientConfig {
    fn default() -> Self {
        Self {
            api_preference: None,
            performance_threshold: 0.8,
            complexity_threshold: 10,
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_secs(60),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            retry_strategy: RetryStrategy::Exponential,
            enable_fallback: true,
            operation_preferences: HashMap::new(),
            operation_timeouts: HashMap::new(),
            default_timeout: Duration::from_secs(30),
        }
    }
}

impl UnifiedClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or malformed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_preference: env_parse::<AdapterId>("API_PREFERENCE"),
            performance_threshold: env_parse("PERFORMANCE_THRESHOLD")
                .filter(|value| (0.0..=1.0).contains(value))
                .unwrap_or(defaults.performance_threshold),
            complexity_threshold: env_parse("COMPLEXITY_THRESHOLD")
                .unwrap_or(defaults.complexity_threshold),
            circuit_breaker_threshold: env_parse("CIRCUIT_BREAKER_THRESHOLD")
                .filter(|value| *value > 0)
                .unwrap_or(defaults.circuit_breaker_threshold),
            circuit_breaker_timeout: env_seconds("CIRCUIT_BREAKER_TIMEOUT")
                .unwrap_or(defaults.circuit_breaker_timeout),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(defaults.max_retries),
            base_delay: env_seconds("BASE_DELAY").unwrap_or(defaults.base_delay),
            max_delay: env_seconds("MAX_DELAY").unwrap_or(defaults.max_delay),
            backoff_multiplier: env_parse("BACKOFF_MULTIPLIER")
                .filter(|value| *value >= 1.0)
                .unwrap_or(defaults.backoff_multiplier),
            retry_strategy: env_parse("RETRY_STRATEGY").unwrap_or(defaults.retry_strategy),
            enable_fallback: env_parse("ENABLE_FALLBACK").unwrap_or(defaults.enable_fallback),
            operation_preferences: HashMap::new(),
            operation_timeouts: HashMap::new(),
            default_timeout: env_seconds("DEFAULT_TIMEOUT").unwrap_or(defaults.default_timeout),
        }
    }

    pub fn with_api_preference(mut self, preference: Option<AdapterId>) -> Self {
        self.api_preference = preference;
        self
    }

    pub fn with_fallback_enabled(mut self, enabled: bool) -> Self {
        self.enable_fallback = enabled;
        self
    }

    pub fn with_operation_preference(
        mut self,
        operation: OperationType,
        adapter: AdapterId,
    ) -> Self {
        self.operation_preferences.insert(operation, adapter);
        self
    }

    pub fn with_operation_timeout(
        mut self,
        operation: OperationType,
        timeout: Duration,
    ) -> Self {
        self.operation_timeouts.insert(operation, timeout);
        self
    }

    pub fn with_retry(
        mut self,
        strategy: RetryStrategy,
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        self.retry_strategy = strategy;
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_circuit_breaker(mut self, threshold: u32, timeout: Duration) -> Self {
        self.circuit_breaker_threshold = threshold;
        self.circuit_breaker_timeout = timeout;
        self
    }

    /// Deadline for one attempt at the given operation.
    pub fn timeout_for(&self, operation: OperationType) -> Duration {
        self.operation_timeouts
            .get(&operation)
            .copied()
            .unwrap_or(self.default_timeout)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("ADMUX_{name}"))
        .or_else(|_| env::var(name))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|value| value.trim().parse().ok())
}

fn env_seconds(name: &str) -> Option<Duration> {
    env_parse::<f64>(name)
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(Duration::from_secs_f64)
}
