use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operation::OperationType;

/// Canonical adapter identifiers used in selection and call outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterId {
    Legacy,
    Modern,
}

impl AdapterId {
    pub const ALL: [Self; 2] = [Self::Legacy, Self::Modern];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Modern => "modern",
        }
    }

    /// The competing adapter.
    pub const fn other(self) -> Self {
        match self {
            Self::Legacy => Self::Modern,
            Self::Modern => Self::Legacy,
        }
    }
}

impl Display for AdapterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterId {
    type Err = crate::error::ClientError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "modern" => Ok(Self::Modern),
            other => Err(crate::error::ClientError::UnknownAdapter {
                name: other.to_owned(),
            }),
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    Authentication,
    Network,
    Timeout,
    QuotaExceeded,
    Validation,
    Api,
    CircuitOpen,
}

/// Structured adapter error used by retry and fallback decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterError {
    kind: AdapterErrorKind,
    message: String,
    retry_after: Option<Duration>,
}

impl AdapterError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::Authentication,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::Network,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn timeout(operation: OperationType, limit: Duration) -> Self {
        Self {
            kind: AdapterErrorKind::Timeout,
            message: format!(
                "operation '{operation}' exceeded its {}ms deadline",
                limit.as_millis()
            ),
            retry_after: None,
        }
    }

    pub fn quota_exceeded(message: impl Into<String>, retry_after: Duration) -> Self {
        Self {
            kind: AdapterErrorKind::QuotaExceeded,
            message: message.into(),
            retry_after: Some(retry_after),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::Validation,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::Api,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn circuit_open(adapter: AdapterId) -> Self {
        Self {
            kind: AdapterErrorKind::CircuitOpen,
            message: format!("circuit for adapter '{adapter}' is open"),
            retry_after: None,
        }
    }

    pub const fn kind(&self) -> AdapterErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Server-provided backoff hint, present on quota errors.
    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Whether the same request may succeed on a later attempt.
    ///
    /// Authentication and validation failures would fail identically on
    /// retry; a circuit-open signal must skip the adapter, not hammer it.
    pub const fn retryable(&self) -> bool {
        match self.kind {
            AdapterErrorKind::Network
            | AdapterErrorKind::Timeout
            | AdapterErrorKind::QuotaExceeded
            | AdapterErrorKind::Api => true,
            AdapterErrorKind::Authentication
            | AdapterErrorKind::Validation
            | AdapterErrorKind::CircuitOpen => false,
        }
    }

    /// Whether the alternate adapter is worth trying after this failure.
    ///
    /// A malformed request fails the same way on either backend, and an
    /// expired credential must surface immediately rather than burn the
    /// fallback's budget.
    pub const fn fallback_eligible(&self) -> bool {
        !matches!(
            self.kind,
            AdapterErrorKind::Authentication | AdapterErrorKind::Validation
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            AdapterErrorKind::Authentication => "adapter.authentication",
            AdapterErrorKind::Network => "adapter.network",
            AdapterErrorKind::Timeout => "adapter.timeout",
            AdapterErrorKind::QuotaExceeded => "adapter.quota_exceeded",
            AdapterErrorKind::Validation => "adapter.validation",
            AdapterErrorKind::Api => "adapter.api",
            AdapterErrorKind::CircuitOpen => "adapter.circuit_open",
        }
    }
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for AdapterError {}

pub type InvokeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AdapterError>> + Send + 'a>>;

/// Backend adapter contract.
///
/// Each adapter wraps one vendor protocol and owns the actual network I/O.
/// The orchestrator applies deadlines, retries, and circuit breaking around
/// `invoke`; adapters report failures through the [`AdapterError`] taxonomy
/// and never retry internally.
pub trait AdAdapter: Send + Sync {
    fn id(&self) -> AdapterId;
    fn supports(&self, operation: OperationType) -> bool;
    fn invoke<'a>(&'a self, operation: OperationType, payload: &'a Value)
        -> InvokeFuture<'a, Value>;
}
