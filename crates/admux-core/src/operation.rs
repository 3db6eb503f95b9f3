use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterId;
use crate::error::ClientError;

/// Logical operation type used for routing and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    CreateReport,
    GetReport,
    ListReports,
    GetLineItems,
    GetAdUnits,
    TestConnection,
}

impl OperationType {
    pub const ALL: [Self; 6] = [
        Self::CreateReport,
        Self::GetReport,
        Self::ListReports,
        Self::GetLineItems,
        Self::GetAdUnits,
        Self::TestConnection,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateReport => "create_report",
            Self::GetReport => "get_report",
            Self::ListReports => "list_reports",
            Self::GetLineItems => "get_line_items",
            Self::GetAdUnits => "get_ad_units",
            Self::TestConnection => "test_connection",
        }
    }
}

impl Display for OperationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = ClientError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create_report" => Ok(Self::CreateReport),
            "get_report" => Ok(Self::GetReport),
            "list_reports" => Ok(Self::ListReports),
            "get_line_items" => Ok(Self::GetLineItems),
            "get_ad_units" => Ok(Self::GetAdUnits),
            "test_connection" => Ok(Self::TestConnection),
            other => Err(ClientError::UnknownOperation {
                name: other.to_owned(),
            }),
        }
    }
}

/// Static routing profile for one operation type.
///
/// Complexity is a small cost/fragility score maintained alongside the
/// registry; it is never derived from the payload. Support flags are hard
/// constraints: an operation is only ever dispatched to an adapter that
/// implements it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationProfile {
    pub operation: OperationType,
    pub complexity: u32,
    pub supports_legacy: bool,
    pub supports_modern: bool,
}

impl OperationProfile {
    /// Profile lookup for a known operation type.
    ///
    /// Bulk and multi-entity operations score high; probes score low.
    /// `get_line_items` exists only on the legacy backend and `get_ad_units`
    /// only on the modern one.
    pub const fn for_type(operation: OperationType) -> Self {
        match operation {
            OperationType::CreateReport => Self::new(operation, 12, true, true),
            OperationType::GetReport => Self::new(operation, 3, true, true),
            OperationType::ListReports => Self::new(operation, 6, true, true),
            OperationType::GetLineItems => Self::new(operation, 8, true, false),
            OperationType::GetAdUnits => Self::new(operation, 5, false, true),
            OperationType::TestConnection => Self::new(operation, 1, true, true),
        }
    }

    const fn new(
        operation: OperationType,
        complexity: u32,
        supports_legacy: bool,
        supports_modern: bool,
    ) -> Self {
        Self {
            operation,
            complexity,
            supports_legacy,
            supports_modern,
        }
    }

    pub const fn supports(self, adapter: AdapterId) -> bool {
        match adapter {
            AdapterId::Legacy => self.supports_legacy,
            AdapterId::Modern => self.supports_modern,
        }
    }

    /// The sole supported adapter, when the operation is adapter-exclusive.
    pub const fn exclusive_adapter(self) -> Option<AdapterId> {
        match (self.supports_legacy, self.supports_modern) {
            (true, false) => Some(AdapterId::Legacy),
            (false, true) => Some(AdapterId::Modern),
            _ => None,
        }
    }

    pub fn supported_adapters(self) -> Vec<AdapterId> {
        let mut adapters = Vec::with_capacity(2);
        if self.supports_legacy {
            adapters.push(AdapterId::Legacy);
        }
        if self.supports_modern {
            adapters.push(AdapterId::Modern);
        }
        adapters
    }
}

/// Classifies an operation name into its routing profile.
///
/// Pure and total over the registered operation set; an unregistered name is
/// fatal and never retried.
pub fn classify(operation_name: &str) -> Result<OperationProfile, ClientError> {
    let operation = OperationType::from_str(operation_name)?;
    Ok(OperationProfile::for_type(operation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_total_over_registered_operations() {
        for operation in OperationType::ALL {
            let profile = classify(operation.as_str()).expect("registered operation");
            assert_eq!(profile.operation, operation);
            assert!(profile.complexity >= 1);
            assert!(profile.supports_legacy || profile.supports_modern);
        }
    }

    #[test]
    fn classify_rejects_unknown_operation() {
        let error = classify("delete_everything").expect_err("unregistered name");
        assert!(matches!(error, ClientError::UnknownOperation { .. }));
    }

    #[test]
    fn classify_normalizes_case_and_whitespace() {
        let profile = classify("  Create_Report ").expect("normalized name");
        assert_eq!(profile.operation, OperationType::CreateReport);
    }

    #[test]
    fn line_items_are_legacy_exclusive() {
        let profile = OperationProfile::for_type(OperationType::GetLineItems);
        assert_eq!(profile.exclusive_adapter(), Some(AdapterId::Legacy));
        assert!(!profile.supports(AdapterId::Modern));
    }

    #[test]
    fn ad_units_are_modern_exclusive() {
        let profile = OperationProfile::for_type(OperationType::GetAdUnits);
        assert_eq!(profile.exclusive_adapter(), Some(AdapterId::Modern));
        assert_eq!(profile.supported_adapters(), vec![AdapterId::Modern]);
    }

    #[test]
    fn bulk_report_creation_scores_highest() {
        let create = OperationProfile::for_type(OperationType::CreateReport);
        for operation in OperationType::ALL {
            assert!(create.complexity >= OperationProfile::for_type(operation).complexity);
        }
        assert_eq!(create.exclusive_adapter(), None);
    }
}
