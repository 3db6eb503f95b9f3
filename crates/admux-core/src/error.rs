use thiserror::Error;

use crate::adapter::{AdapterError, AdapterId};
use crate::operation::OperationType;

/// One failed attempt against one adapter, kept for operator diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterAttempt {
    pub adapter: AdapterId,
    pub error: AdapterError,
}

impl AdapterAttempt {
    pub fn new(adapter: AdapterId, error: AdapterError) -> Self {
        Self { adapter, error }
    }
}

impl std::fmt::Display for AdapterAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.adapter, self.error)
    }
}

/// Top-level error type for unified client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unknown operation '{name}'")]
    UnknownOperation { name: String },

    #[error("unknown adapter '{name}', expected one of legacy, modern")]
    UnknownAdapter { name: String },

    #[error("no adapter available for operation '{operation}': all circuits are open")]
    NoAvailableAdapter { operation: OperationType },

    #[error("operation '{operation}' failed on every adapter: {}", format_attempts(.attempts))]
    AllAdaptersFailed {
        operation: OperationType,
        attempts: Vec<AdapterAttempt>,
    },

    /// Terminal adapter failure surfaced directly, without fallback.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl ClientError {
    /// Per-adapter failure reasons, when this error aggregates any.
    pub fn attempts(&self) -> &[AdapterAttempt] {
        match self {
            Self::AllAdaptersFailed { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

fn format_attempts(attempts: &[AdapterAttempt]) -> String {
    attempts
        .iter()
        .map(AdapterAttempt::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
