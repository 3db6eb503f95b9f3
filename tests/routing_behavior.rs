//! Behavior-driven tests for adapter routing.
//!
//! These tests verify HOW the unified client chooses between the legacy and
//! modern adapters: preference rules, exclusivity constraints, complexity
//! routing, and fallback ordering.

use std::time::Duration;

use admux_tests::{
    fast_config, AdapterError, AdapterId, FakeAdapter, OperationType, UnifiedClient,
    UnifiedClientConfig,
};
use serde_json::Value;

// =============================================================================
// Routing: Preference Rules
// =============================================================================

#[tokio::test]
async fn when_no_preference_is_set_system_routes_to_the_modern_adapter() {
    // Given: Both adapters healthy and no configured preference
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::healthy(AdapterId::Modern);
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], fast_config());

    // When: A simple operation is executed
    let outcome = client.get_report(Value::Null).await.expect("call succeeds");

    // Then: The modern adapter serves it and legacy is never touched
    assert_eq!(outcome.selected_adapter, AdapterId::Modern);
    assert_eq!(legacy.calls(), 0);
}

#[tokio::test]
async fn when_global_preference_is_legacy_system_honors_it() {
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::healthy(AdapterId::Modern);
    let config = fast_config().with_api_preference(Some(AdapterId::Legacy));
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], config);

    let outcome = client.get_report(Value::Null).await.expect("call succeeds");

    assert_eq!(outcome.selected_adapter, AdapterId::Legacy);
    assert_eq!(modern.calls(), 0);
}

#[tokio::test]
async fn when_metrics_are_unchanged_selection_is_deterministic() {
    // Given: A fixed metrics snapshot (no calls recorded at all)
    let config = fast_config();
    let client = UnifiedClient::new(
        vec![
            FakeAdapter::healthy(AdapterId::Legacy),
            FakeAdapter::healthy(AdapterId::Modern),
        ],
        config,
    );

    // When/Then: Repeated identical calls select the same adapter
    for _ in 0..5 {
        let outcome = client
            .test_connection()
            .await
            .expect("probe succeeds");
        assert_eq!(outcome.selected_adapter, AdapterId::Modern);
    }
}

// =============================================================================
// Routing: Complexity and Overrides
// =============================================================================

#[tokio::test]
async fn when_operation_is_complex_system_routes_to_legacy_despite_modern_preference() {
    // Given: complexity_threshold = 10 and create_report scores 12
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::healthy(AdapterId::Modern);
    let config = fast_config().with_api_preference(Some(AdapterId::Modern));
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], config);

    // When: The bulk operation runs
    let outcome = client
        .create_report(serde_json::json!({ "dimensions": ["DATE", "AD_UNIT"] }))
        .await
        .expect("call succeeds");

    // Then: The legacy adapter is primary regardless of the global preference
    assert_eq!(outcome.selected_adapter, AdapterId::Legacy);
    assert_eq!(modern.calls(), 0);
}

#[tokio::test]
async fn when_operation_preference_overrides_complexity_the_override_wins() {
    // Given: An explicit per-operation override back to modern
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::healthy(AdapterId::Modern);
    let config = fast_config()
        .with_api_preference(Some(AdapterId::Modern))
        .with_operation_preference(OperationType::CreateReport, AdapterId::Modern);
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], config);

    // When: The same bulk operation runs
    let outcome = client
        .create_report(Value::Null)
        .await
        .expect("call succeeds");

    // Then: The override beats complexity routing
    assert_eq!(outcome.selected_adapter, AdapterId::Modern);
    assert_eq!(legacy.calls(), 0);
}

// =============================================================================
// Routing: Exclusivity Constraints
// =============================================================================

#[tokio::test]
async fn when_operation_is_adapter_exclusive_preference_cannot_redirect_it() {
    // Given: get_line_items exists only on the legacy backend, but the
    // operator prefers modern globally
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::healthy(AdapterId::Modern);
    let config = fast_config().with_api_preference(Some(AdapterId::Modern));
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], config);

    // When: The exclusive operation runs
    let outcome = client
        .get_line_items(Value::Null)
        .await
        .expect("call succeeds");

    // Then: The exclusivity constraint wins and no fallback entry exists
    assert_eq!(outcome.selected_adapter, AdapterId::Legacy);
    assert_eq!(outcome.adapter_chain, vec![AdapterId::Legacy]);
    assert_eq!(modern.calls(), 0);
}

#[tokio::test]
async fn when_modern_exclusive_operation_runs_legacy_is_never_invoked() {
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::healthy(AdapterId::Modern);
    let config = fast_config().with_api_preference(Some(AdapterId::Legacy));
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], config);

    let outcome = client
        .get_ad_units(Value::Null)
        .await
        .expect("call succeeds");

    assert_eq!(outcome.selected_adapter, AdapterId::Modern);
    assert_eq!(legacy.calls(), 0);
}

// =============================================================================
// Routing: Fallback
// =============================================================================

#[tokio::test]
async fn when_primary_is_exhausted_system_falls_back_to_the_alternate() {
    // Given: The modern adapter fails every attempt
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::failing_times(
        AdapterId::Modern,
        10,
        AdapterError::network("connection reset"),
    );
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], fast_config());

    // When: An operation both adapters support runs
    let outcome = client
        .list_reports(Value::Null)
        .await
        .expect("fallback succeeds");

    // Then: The legacy adapter serves it and the walked chain is recorded
    assert_eq!(outcome.selected_adapter, AdapterId::Legacy);
    assert_eq!(
        outcome.adapter_chain,
        vec![AdapterId::Modern, AdapterId::Legacy]
    );
    assert_eq!(outcome.attempt_errors.len(), 1);
    assert_eq!(outcome.attempt_errors[0].adapter, AdapterId::Modern);
}

#[tokio::test]
async fn when_fallback_is_disabled_failure_surfaces_after_the_primary() {
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::failing_times(
        AdapterId::Modern,
        10,
        AdapterError::network("connection reset"),
    );
    let config = fast_config().with_fallback_enabled(false);
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], config);

    let error = client
        .list_reports(Value::Null)
        .await
        .expect_err("no fallback configured");

    assert_eq!(error.attempts().len(), 1);
    assert_eq!(error.attempts()[0].adapter, AdapterId::Modern);
    assert_eq!(legacy.calls(), 0);
}

#[tokio::test]
async fn when_both_adapters_fail_the_error_names_each_failure() {
    // Given: Both adapters failing with distinct errors
    let legacy = FakeAdapter::failing_times(
        AdapterId::Legacy,
        10,
        AdapterError::api("backend 500"),
    );
    let modern = FakeAdapter::failing_times(
        AdapterId::Modern,
        10,
        AdapterError::network("connection reset"),
    );
    let client = UnifiedClient::new(vec![legacy, modern], fast_config());

    // When: The call exhausts both
    let error = client
        .get_report(Value::Null)
        .await
        .expect_err("both adapters exhausted");

    // Then: The aggregated error reports each adapter's reason
    let rendered = error.to_string();
    assert!(rendered.contains("modern"));
    assert!(rendered.contains("legacy"));
    assert!(rendered.contains("connection reset"));
    assert!(rendered.contains("backend 500"));
}

// =============================================================================
// Routing: Performance-Adaptive Selection
// =============================================================================

#[tokio::test]
async fn when_modern_success_rate_degrades_system_shifts_traffic_to_legacy() {
    // Given: A breaker threshold high enough that circuits stay closed, and
    // a modern adapter that fails far more than the performance threshold
    // tolerates
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::failing_times(
        AdapterId::Modern,
        20,
        AdapterError::api("flaky backend"),
    );
    let config = UnifiedClientConfig {
        circuit_breaker_threshold: 1_000,
        ..fast_config()
    };
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], config);

    // When: A run of calls fails over to legacy and degrades modern's rate
    for _ in 0..5 {
        let _ = client.get_report(Value::Null).await;
    }
    let calls_before = modern.calls();
    let outcome = client.get_report(Value::Null).await.expect("call succeeds");

    // Then: Performance routing now picks legacy outright
    assert_eq!(outcome.selected_adapter, AdapterId::Legacy);
    assert_eq!(outcome.adapter_chain[0], AdapterId::Legacy);
    assert_eq!(modern.calls(), calls_before);
}

// =============================================================================
// Routing: Operation Registry
// =============================================================================

#[tokio::test]
async fn when_operation_name_is_unknown_the_call_fails_without_any_dispatch() {
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::healthy(AdapterId::Modern);
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], fast_config());

    let error = client
        .execute("nuke_inventory", Value::Null)
        .await
        .expect_err("unknown operation is fatal");

    assert!(error.to_string().contains("unknown operation"));
    assert_eq!(legacy.calls() + modern.calls(), 0);
}

#[tokio::test]
async fn when_operation_timeout_is_configured_it_bounds_each_attempt() {
    // Given: A modern adapter slower than the operation's deadline
    let legacy = FakeAdapter::healthy(AdapterId::Legacy);
    let modern = FakeAdapter::slow(AdapterId::Modern, Duration::from_millis(200));
    let config = fast_config()
        .with_operation_timeout(OperationType::GetReport, Duration::from_millis(20));
    let client = UnifiedClient::new(vec![legacy.clone(), modern.clone()], config);

    // When: The operation runs
    let outcome = client.get_report(Value::Null).await.expect("fallback succeeds");

    // Then: The timeouts count as failures and the call falls back
    assert_eq!(outcome.selected_adapter, AdapterId::Legacy);
    assert_eq!(outcome.attempt_errors[0].adapter, AdapterId::Modern);
    assert!(outcome.attempt_errors[0]
        .error
        .to_string()
        .contains("deadline"));
}
