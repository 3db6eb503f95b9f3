use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::adapter::{AdapterError, AdapterId};
use crate::config::UnifiedClientConfig;

/// Bounded sliding window size for recent latencies and outcomes.
pub const RECENT_WINDOW: usize = 50;

/// Runtime circuit state for one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct AdapterState {
    total_calls: u64,
    successes: u64,
    failures: u64,
    recent_latencies: VecDeque<Duration>,
    recent_outcomes: VecDeque<bool>,
    consecutive_failures: u32,
    circuit: CircuitState,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl AdapterState {
    fn new() -> Self {
        Self {
            total_calls: 0,
            successes: 0,
            failures: 0,
            recent_latencies: VecDeque::with_capacity(RECENT_WINDOW),
            recent_outcomes: VecDeque::with_capacity(RECENT_WINDOW),
            consecutive_failures: 0,
            circuit: CircuitState::Closed,
            opened_at: None,
            probe_in_flight: false,
        }
    }

    fn push_outcome(&mut self, success: bool) {
        if self.recent_outcomes.len() == RECENT_WINDOW {
            self.recent_outcomes.pop_front();
        }
        self.recent_outcomes.push_back(success);
    }

    fn push_latency(&mut self, latency: Duration) {
        if self.recent_latencies.len() == RECENT_WINDOW {
            self.recent_latencies.pop_front();
        }
        self.recent_latencies.push_back(latency);
    }

    fn success_rate(&self, window: usize) -> Option<f64> {
        let sampled = self.recent_outcomes.len().min(window);
        if sampled == 0 {
            return None;
        }
        let successes = self
            .recent_outcomes
            .iter()
            .rev()
            .take(sampled)
            .filter(|outcome| **outcome)
            .count();
        Some(successes as f64 / sampled as f64)
    }

    fn average_latency(&self) -> Option<Duration> {
        if self.recent_latencies.is_empty() {
            return None;
        }
        let total: Duration = self.recent_latencies.iter().sum();
        Some(total / self.recent_latencies.len() as u32)
    }
}

/// Per-adapter health summary, observability only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSummary {
    pub adapter: AdapterId,
    pub total_calls: u64,
    pub successes: u64,
    pub failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_latency_ms: Option<u64>,
    pub consecutive_failures: u32,
    pub circuit_state: CircuitState,
}

/// Snapshot of all adapter metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub generated_at: String,
    pub adapters: Vec<AdapterSummary>,
}

/// Single source of truth for adapter health and circuit breaking.
///
/// State transitions for one adapter are serialized behind that adapter's
/// lock; the orchestrator never mutates counters directly. Locks are held
/// only for the duration of a transition, never across awaits.
#[derive(Debug)]
pub struct MetricsStore {
    failure_threshold: u32,
    open_timeout: Duration,
    states: [Mutex<AdapterState>; 2],
}

impl MetricsStore {
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            open_timeout,
            states: [
                Mutex::new(AdapterState::new()),
                Mutex::new(AdapterState::new()),
            ],
        }
    }

    pub fn from_config(config: &UnifiedClientConfig) -> Self {
        Self::new(
            config.circuit_breaker_threshold,
            config.circuit_breaker_timeout,
        )
    }

    fn state(&self, adapter: AdapterId) -> std::sync::MutexGuard<'_, AdapterState> {
        let index = match adapter {
            AdapterId::Legacy => 0,
            AdapterId::Modern => 1,
        };
        self.states[index]
            .lock()
            .expect("adapter metrics lock is not poisoned")
    }

    /// Admits or rejects a call against the adapter's circuit.
    ///
    /// An open circuit rejects immediately until its cool-down elapses, at
    /// which point the next caller is admitted as the single half-open probe.
    /// While that probe is in flight every other caller is rejected. The
    /// returned permit must be resolved with [`CallPermit::record_success`]
    /// or [`CallPermit::record_failure`]; a permit dropped unresolved reverts
    /// an admitted probe to OPEN so a cancelled caller cannot wedge the
    /// circuit in half-open forever.
    pub fn acquire(&self, adapter: AdapterId) -> Result<CallPermit<'_>, AdapterError> {
        let mut state = self.state(adapter);
        let probe = match state.circuit {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => {
                if state.probe_in_flight {
                    return Err(AdapterError::circuit_open(adapter));
                }
                state.probe_in_flight = true;
                true
            }
            CircuitState::Open => {
                let cooled_down = state
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= self.open_timeout)
                    .unwrap_or(false);
                if !cooled_down {
                    return Err(AdapterError::circuit_open(adapter));
                }
                state.circuit = CircuitState::HalfOpen;
                state.opened_at = None;
                state.probe_in_flight = true;
                true
            }
        };
        Ok(CallPermit {
            metrics: self,
            adapter,
            probe,
            resolved: false,
        })
    }

    pub fn record_success(&self, adapter: AdapterId, latency: Duration) {
        let mut state = self.state(adapter);
        state.total_calls += 1;
        state.successes += 1;
        state.consecutive_failures = 0;
        state.push_outcome(true);
        state.push_latency(latency);
        state.circuit = CircuitState::Closed;
        state.opened_at = None;
        state.probe_in_flight = false;
    }

    pub fn record_failure(&self, adapter: AdapterId) {
        let mut state = self.state(adapter);
        state.total_calls += 1;
        state.failures += 1;
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.push_outcome(false);

        let failed_probe = state.circuit == CircuitState::HalfOpen;
        if failed_probe || state.consecutive_failures >= self.failure_threshold {
            state.circuit = CircuitState::Open;
            state.opened_at = Some(Instant::now());
        }
        state.probe_in_flight = false;
    }

    pub fn circuit_state(&self, adapter: AdapterId) -> CircuitState {
        self.state(adapter).circuit
    }

    /// Whether selection may route to this adapter.
    ///
    /// An open circuit that has finished its cool-down still counts as
    /// available so the half-open probe can be attempted; the transition
    /// itself happens in [`MetricsStore::acquire`].
    pub fn is_available(&self, adapter: AdapterId) -> bool {
        let state = self.state(adapter);
        match state.circuit {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => !state.probe_in_flight,
            CircuitState::Open => state
                .opened_at
                .map(|opened_at| opened_at.elapsed() >= self.open_timeout)
                .unwrap_or(false),
        }
    }

    pub fn consecutive_failures(&self, adapter: AdapterId) -> u32 {
        self.state(adapter).consecutive_failures
    }

    /// Success rate over the most recent `window` outcomes.
    ///
    /// `None` means no samples yet; callers must not read that as unhealthy.
    pub fn success_rate(&self, adapter: AdapterId, window: usize) -> Option<f64> {
        self.state(adapter).success_rate(window)
    }

    pub fn summary(&self) -> MetricsSummary {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let adapters = AdapterId::ALL
            .iter()
            .map(|adapter| {
                let state = self.state(*adapter);
                AdapterSummary {
                    adapter: *adapter,
                    total_calls: state.total_calls,
                    successes: state.successes,
                    failures: state.failures,
                    success_rate: state.success_rate(RECENT_WINDOW),
                    average_latency_ms: state
                        .average_latency()
                        .map(|latency| latency.as_millis().min(u128::from(u64::MAX)) as u64),
                    consecutive_failures: state.consecutive_failures,
                    circuit_state: state.circuit,
                }
            })
            .collect();

        MetricsSummary {
            generated_at,
            adapters,
        }
    }

    /// Clears all counters and forces every circuit closed.
    ///
    /// Explicit operator action, never triggered automatically.
    pub fn reset(&self) {
        for adapter in AdapterId::ALL {
            *self.state(adapter) = AdapterState::new();
        }
    }
}

/// Admission ticket for one call against one adapter.
///
/// Resolving the permit records the call's outcome. An unresolved drop while
/// the permit holds the half-open probe slot reverts the circuit to OPEN with
/// a fresh cool-down, so the adapter becomes probeable again on schedule.
#[derive(Debug)]
pub struct CallPermit<'a> {
    metrics: &'a MetricsStore,
    adapter: AdapterId,
    probe: bool,
    resolved: bool,
}

impl CallPermit<'_> {
    /// Whether this permit holds the single half-open probe slot.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self, latency: Duration) {
        self.resolved = true;
        self.metrics.record_success(self.adapter, latency);
    }

    pub fn record_failure(mut self) {
        self.resolved = true;
        self.metrics.record_failure(self.adapter);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.resolved || !self.probe {
            return;
        }
        let mut state = self.metrics.state(self.adapter);
        // An abandoned probe resolves nothing about the adapter's health;
        // restart the cool-down instead of leaving the slot occupied.
        if state.circuit == CircuitState::HalfOpen && state.probe_in_flight {
            state.circuit = CircuitState::Open;
            state.opened_at = Some(Instant::now());
            state.probe_in_flight = false;
        }
    }
}
