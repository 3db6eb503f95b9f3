//! Adapter selection rules.
//!
//! Pure decision logic: given an operation profile, the configuration
//! snapshot, and the current metrics, produce the ordered adapter preference
//! list. The orchestrator never branches on adapter identity outside of
//! these rules.

use crate::adapter::AdapterId;
use crate::config::UnifiedClientConfig;
use crate::error::ClientError;
use crate::metrics::{MetricsStore, RECENT_WINDOW};
use crate::operation::OperationProfile;

/// Produces the ordered adapter candidates for one call.
///
/// Priority order for the primary, first matching rule wins; a rule whose
/// adapter is unavailable (circuit open and still cooling down) is skipped
/// and the remaining rules are re-evaluated:
///
/// 1. exclusivity (hard constraint, never a fallback entry)
/// 2. explicit per-operation override
/// 3. complexity routing to the legacy adapter for bulk operations
/// 4. global `api_preference`
/// 5. performance routing to the healthier adapter
/// 6. default to the modern adapter
///
/// The remaining supported adapter is appended as fallback when fallback is
/// enabled. Fails with [`ClientError::NoAvailableAdapter`] when every
/// supported adapter is unavailable.
pub fn select(
    profile: &OperationProfile,
    config: &UnifiedClientConfig,
    metrics: &MetricsStore,
) -> Result<Vec<AdapterId>, ClientError> {
    if let Some(sole) = profile.exclusive_adapter() {
        if !metrics.is_available(sole) {
            return Err(ClientError::NoAvailableAdapter {
                operation: profile.operation,
            });
        }
        return Ok(vec![sole]);
    }

    let primary = pick_primary(profile, config, metrics).ok_or(
        ClientError::NoAvailableAdapter {
            operation: profile.operation,
        },
    )?;

    let mut order = vec![primary];
    let alternate = primary.other();
    if config.enable_fallback && profile.supports(alternate) && metrics.is_available(alternate) {
        order.push(alternate);
    }
    Ok(order)
}

fn pick_primary(
    profile: &OperationProfile,
    config: &UnifiedClientConfig,
    metrics: &MetricsStore,
) -> Option<AdapterId> {
    let usable = |adapter: AdapterId| profile.supports(adapter) && metrics.is_available(adapter);

    if let Some(&preferred) = config.operation_preferences.get(&profile.operation) {
        if usable(preferred) {
            return Some(preferred);
        }
    }

    // The legacy backend tolerates bulk and multi-entity requests better;
    // only an explicit per-operation override outranks this.
    if profile.complexity >= config.complexity_threshold && usable(AdapterId::Legacy) {
        return Some(AdapterId::Legacy);
    }

    if let Some(preferred) = config.api_preference {
        if usable(preferred) {
            return Some(preferred);
        }
    }

    if let Some(healthier) = performance_pick(config, metrics) {
        if usable(healthier) {
            return Some(healthier);
        }
    }

    if usable(AdapterId::Modern) {
        return Some(AdapterId::Modern);
    }
    if usable(AdapterId::Legacy) {
        return Some(AdapterId::Legacy);
    }
    None
}

/// Prefers the healthier adapter when exactly one of the two is running
/// below the performance threshold. No samples means no signal, and both
/// below threshold falls through to the default rule.
fn performance_pick(config: &UnifiedClientConfig, metrics: &MetricsStore) -> Option<AdapterId> {
    let below = |adapter: AdapterId| {
        metrics
            .success_rate(adapter, RECENT_WINDOW)
            .map(|rate| rate < config.performance_threshold)
            .unwrap_or(false)
    };

    match (below(AdapterId::Legacy), below(AdapterId::Modern)) {
        (true, false) => Some(AdapterId::Modern),
        (false, true) => Some(AdapterId::Legacy),
        _ => None,
    }
}
