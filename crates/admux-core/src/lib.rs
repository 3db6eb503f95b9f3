//! # Admux Core
//!
//! Routing, fallback, and resilience core for the unified ad API client.
//!
//! ## Overview
//!
//! Two competing backend adapters reach the same vendor advertising API: a
//! **legacy** request/response integration and a **modern** one. This crate
//! decides which adapter handles each logical operation and how failures are
//! absorbed:
//!
//! - **Operation registry** with static complexity scores and per-adapter
//!   support constraints
//! - **Adapter contract** (`supports`/`invoke`) with a structured error
//!   taxonomy
//! - **Metrics store** holding rolling per-adapter counters and the
//!   circuit-breaker state machine
//! - **Retry policies** (linear, exponential, fibonacci) with bounded jitter
//! - **Strategy selector** producing the ordered adapter preference list
//! - **Unified client** orchestrating retry, fallback, and metrics updates
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Adapter trait, identifiers, and error taxonomy |
//! | [`client`] | Unified client orchestrator (async and blocking) |
//! | [`config`] | Immutable client configuration and env loading |
//! | [`error`] | Crate-level error types |
//! | [`metrics`] | Adapter metrics and circuit breaker |
//! | [`operation`] | Operation registry and classifier |
//! | [`retry`] | Backoff strategies with jitter |
//! | [`selector`] | Adapter selection rules |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use admux_core::{UnifiedClient, UnifiedClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = UnifiedClient::new(
//!         vec![Arc::new(legacy_adapter), Arc::new(modern_adapter)],
//!         UnifiedClientConfig::from_env(),
//!     );
//!
//!     let outcome = client
//!         .create_report(serde_json::json!({ "dimensions": ["DATE"] }))
//!         .await?;
//!     println!("served by {} in {}ms", outcome.selected_adapter, outcome.latency_ms);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Caller         │
//! └────────┬────────┘
//!          │ operation + payload
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Unified Client  │────▶│ Classifier       │
//! └────────┬────────┘     └──────────────────┘
//!          │                       │ profile
//!          ▼                       ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Metrics Store   │◀───▶│ Selector         │
//! │ (circuits)      │     └──────────────────┘
//! └─────────────────┘              │ adapter order
//!          ▲                       ▼
//!          │              ┌──────────────────┐
//!          └──────────────│ Adapter (trait)  │
//!            outcomes     │ legacy / modern  │
//!                         └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Transient failures (network, timeout, quota) are absorbed by the retry
//! policy and, failing that, by fallback to the alternate adapter. Terminal
//! failures (authentication, validation) surface immediately; only the
//! exhaustion of both adapters surfaces as an aggregated error that names
//! every adapter tried and why it failed.

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod operation;
pub mod retry;
pub mod selector;

// Re-export commonly used types at crate root for convenience

// Adapter contract
pub use adapter::{AdAdapter, AdapterError, AdapterErrorKind, AdapterId, InvokeFuture};

// Unified client
pub use client::{blocking, Outcome, UnifiedClient};

// Configuration
pub use config::UnifiedClientConfig;

// Error types
pub use error::{AdapterAttempt, ClientError};

// Metrics and circuit breaker
pub use metrics::{
    AdapterSummary, CallPermit, CircuitState, MetricsStore, MetricsSummary, RECENT_WINDOW,
};

// Operation registry
pub use operation::{classify, OperationProfile, OperationType};

// Retry policies
pub use retry::{RetryPolicy, RetryStrategy};

// Selection
pub use selector::select;
