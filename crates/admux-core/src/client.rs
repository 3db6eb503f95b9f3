use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde_json::Value;
use uuid::Uuid;

use crate::adapter::{AdAdapter, AdapterError, AdapterId};
use crate::config::UnifiedClientConfig;
use crate::error::{AdapterAttempt, ClientError};
use crate::metrics::{MetricsStore, MetricsSummary};
use crate::operation::{self, OperationProfile, OperationType};
use crate::retry::RetryPolicy;
use crate::selector;

/// Successful unified call.
///
/// Carries the adapter chain that was walked and the errors absorbed along
/// the way, so a fallback success is still diagnosable.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub data: Value,
    pub selected_adapter: AdapterId,
    pub adapter_chain: Vec<AdapterId>,
    pub attempt_errors: Vec<AdapterAttempt>,
    pub latency_ms: u64,
    pub request_id: Uuid,
}

/// Unified client over the two competing backend adapters.
///
/// Every logical operation flows through the same path: classify, select an
/// adapter order, run the primary under the retry policy, fall back to the
/// alternate on exhaustion, and keep the metrics store as the single record
/// of adapter health. Dropping a returned future cancels the call outright;
/// no retry or fallback happens on behalf of a caller that has gone away.
pub struct UnifiedClient {
    adapters: HashMap<AdapterId, Arc<dyn AdAdapter>>,
    config: RwLock<Arc<UnifiedClientConfig>>,
    metrics: Arc<MetricsStore>,
}

impl UnifiedClient {
    pub fn new(adapters: Vec<Arc<dyn AdAdapter>>, config: UnifiedClientConfig) -> Self {
        let metrics = Arc::new(MetricsStore::from_config(&config));
        Self::with_metrics(adapters, config, metrics)
    }

    /// Constructor with an injected metrics store, for tests that assert
    /// state transitions on an isolated instance.
    pub fn with_metrics(
        adapters: Vec<Arc<dyn AdAdapter>>,
        config: UnifiedClientConfig,
        metrics: Arc<MetricsStore>,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self {
            adapters,
            config: RwLock::new(Arc::new(config)),
            metrics,
        }
    }

    /// Executes an operation by name; the entry point for dynamic callers.
    pub async fn execute(&self, operation_name: &str, payload: Value) -> Result<Outcome, ClientError> {
        let profile = operation::classify(operation_name)?;
        self.run(profile, payload).await
    }

    pub async fn create_report(&self, payload: Value) -> Result<Outcome, ClientError> {
        self.run_operation(OperationType::CreateReport, payload).await
    }

    pub async fn get_report(&self, payload: Value) -> Result<Outcome, ClientError> {
        self.run_operation(OperationType::GetReport, payload).await
    }

    pub async fn list_reports(&self, payload: Value) -> Result<Outcome, ClientError> {
        self.run_operation(OperationType::ListReports, payload).await
    }

    pub async fn get_line_items(&self, payload: Value) -> Result<Outcome, ClientError> {
        self.run_operation(OperationType::GetLineItems, payload).await
    }

    pub async fn get_ad_units(&self, payload: Value) -> Result<Outcome, ClientError> {
        self.run_operation(OperationType::GetAdUnits, payload).await
    }

    pub async fn test_connection(&self) -> Result<Outcome, ClientError> {
        self.run_operation(OperationType::TestConnection, Value::Null)
            .await
    }

    /// Metrics snapshot for observability; never used for control flow.
    pub fn performance_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// Clears all counters and closes every circuit. Operator action.
    pub fn reset_performance_stats(&self) {
        self.metrics.reset();
    }

    /// Swaps in a config snapshot with a new global preference.
    ///
    /// In-flight calls keep the snapshot they started with.
    pub fn configure_api_preference(&self, preference: Option<AdapterId>) {
        let mut config = self
            .config
            .write()
            .expect("config lock is not poisoned");
        let updated = (**config).clone().with_api_preference(preference);
        *config = Arc::new(updated);
    }

    pub fn metrics(&self) -> &MetricsStore {
        &self.metrics
    }

    fn config_snapshot(&self) -> Arc<UnifiedClientConfig> {
        Arc::clone(
            &self
                .config
                .read()
                .expect("config lock is not poisoned"),
        )
    }

    async fn run_operation(
        &self,
        operation: OperationType,
        payload: Value,
    ) -> Result<Outcome, ClientError> {
        self.run(OperationProfile::for_type(operation), payload).await
    }

    async fn run(&self, profile: OperationProfile, payload: Value) -> Result<Outcome, ClientError> {
        let started = Instant::now();
        let config = self.config_snapshot();
        let policy = RetryPolicy::from_config(&config);
        let timeout = config.timeout_for(profile.operation);
        let order = selector::select(&profile, &config, &self.metrics)?;

        let mut adapter_chain = Vec::with_capacity(order.len());
        let mut attempt_errors = Vec::new();

        for adapter_id in order {
            adapter_chain.push(adapter_id);
            let Some(adapter) = self.adapters.get(&adapter_id) else {
                attempt_errors.push(AdapterAttempt::new(
                    adapter_id,
                    AdapterError::api(format!("adapter '{adapter_id}' is not registered")),
                ));
                continue;
            };

            match self
                .call_adapter(adapter.as_ref(), adapter_id, profile.operation, &payload, timeout, &policy)
                .await
            {
                Ok(data) => {
                    return Ok(Outcome {
                        data,
                        selected_adapter: adapter_id,
                        adapter_chain,
                        attempt_errors,
                        latency_ms: elapsed_ms(started),
                        request_id: Uuid::new_v4(),
                    });
                }
                Err(error) => {
                    let fallback_eligible = error.fallback_eligible();
                    attempt_errors.push(AdapterAttempt::new(adapter_id, error.clone()));
                    // A malformed request or a dead credential fails the same
                    // way everywhere; surface it instead of burning fallback.
                    if !fallback_eligible {
                        return Err(ClientError::Adapter(error));
                    }
                }
            }
        }

        Err(ClientError::AllAdaptersFailed {
            operation: profile.operation,
            attempts: attempt_errors,
        })
    }

    /// Retry loop against a single adapter.
    ///
    /// The circuit is consulted once up front: an open circuit skips the
    /// adapter without a network attempt and without counting as a fresh
    /// failure (that would keep extending the cool-down). A half-open probe
    /// gets exactly one attempt, no retry budget; its first failure reopens
    /// the circuit. The permit resolves the outcome, so a caller that drops
    /// the future mid-probe hands the slot back instead of wedging the
    /// circuit. One terminal failure is recorded per adapter per call, on
    /// exhaustion.
    async fn call_adapter(
        &self,
        adapter: &dyn AdAdapter,
        adapter_id: AdapterId,
        operation: OperationType,
        payload: &Value,
        timeout: Duration,
        policy: &RetryPolicy,
    ) -> Result<Value, AdapterError> {
        let permit = self.metrics.acquire(adapter_id)?;

        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            let attempt_started = Instant::now();
            let result = match tokio::time::timeout(timeout, adapter.invoke(operation, payload)).await
            {
                Ok(result) => result,
                Err(_) => Err(AdapterError::timeout(operation, timeout)),
            };

            match result {
                Ok(data) => {
                    permit.record_success(attempt_started.elapsed());
                    return Ok(data);
                }
                Err(error) => {
                    if !permit.is_probe() && policy.should_retry(attempt, &error) {
                        tokio::time::sleep(policy.next_delay(attempt, &error)).await;
                        continue;
                    }
                    permit.record_failure();
                    return Err(error);
                }
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

/// Synchronous twin of [`UnifiedClient`] for callers without a runtime.
pub mod blocking {
    use std::sync::Arc;

    use serde_json::Value;

    use crate::adapter::{AdAdapter, AdapterId};
    use crate::config::UnifiedClientConfig;
    use crate::error::ClientError;
    use crate::metrics::MetricsSummary;

    use super::Outcome;

    /// Blocking unified client owning a single-threaded runtime.
    pub struct UnifiedClient {
        inner: super::UnifiedClient,
        runtime: tokio::runtime::Runtime,
    }

    impl UnifiedClient {
        pub fn new(
            adapters: Vec<Arc<dyn AdAdapter>>,
            config: UnifiedClientConfig,
        ) -> std::io::Result<Self> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Ok(Self {
                inner: super::UnifiedClient::new(adapters, config),
                runtime,
            })
        }

        pub fn execute(&self, operation_name: &str, payload: Value) -> Result<Outcome, ClientError> {
            self.runtime.block_on(self.inner.execute(operation_name, payload))
        }

        pub fn create_report(&self, payload: Value) -> Result<Outcome, ClientError> {
            self.runtime.block_on(self.inner.create_report(payload))
        }

        pub fn get_report(&self, payload: Value) -> Result<Outcome, ClientError> {
            self.runtime.block_on(self.inner.get_report(payload))
        }

        pub fn list_reports(&self, payload: Value) -> Result<Outcome, ClientError> {
            self.runtime.block_on(self.inner.list_reports(payload))
        }

        pub fn get_line_items(&self, payload: Value) -> Result<Outcome, ClientError> {
            self.runtime.block_on(self.inner.get_line_items(payload))
        }

        pub fn get_ad_units(&self, payload: Value) -> Result<Outcome, ClientError> {
            self.runtime.block_on(self.inner.get_ad_units(payload))
        }

        pub fn test_connection(&self) -> Result<Outcome, ClientError> {
            self.runtime.block_on(self.inner.test_connection())
        }

        pub fn performance_summary(&self) -> MetricsSummary {
            self.inner.performance_summary()
        }

        pub fn reset_performance_stats(&self) {
            self.inner.reset_performance_stats();
        }

        pub fn configure_api_preference(&self, preference: Option<AdapterId>) {
            self.inner.configure_api_preference(preference);
        }
    }
}
