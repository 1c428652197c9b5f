//! Validation issue types.
//!
//! Issues are data: the engine accumulates every one it finds and the caller
//! decides, through a [`SeverityPolicy`](crate::SeverityPolicy), which of them
//! block a dataset.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity assigned to an issue by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Blocks the dataset from being used.
    Fatal,
    /// Reported only.
    Warning,
}

impl Severity {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fatal => "Fatal",
            Self::Warning => "Warning",
        }
    }
}

/// Kind of data-quality problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueKind {
    /// Value cannot be interpreted as the declared datatype.
    TypeMismatch,
    /// Required value is null, absent or empty.
    MissingValue,
    /// Value is outside the declared domain.
    DomainViolation,
    /// Raw value does not fully match the declared pattern.
    PatternViolation,
    /// Numeric value is outside the declared range.
    RangeViolation,
    /// A hierarchy member rolls up to more than one parent path.
    HierarchyInconsistency,
    /// A domain member never occurs in the data.
    UnusedDomainValue,
    /// A dimension's spread of values in one segment is far from the rest.
    Anomaly,
}

impl IssueKind {
    pub const ALL: [IssueKind; 8] = [
        IssueKind::TypeMismatch,
        IssueKind::MissingValue,
        IssueKind::DomainViolation,
        IssueKind::PatternViolation,
        IssueKind::RangeViolation,
        IssueKind::HierarchyInconsistency,
        IssueKind::UnusedDomainValue,
        IssueKind::Anomaly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::TypeMismatch => "TypeMismatch",
            IssueKind::MissingValue => "MissingValue",
            IssueKind::DomainViolation => "DomainViolation",
            IssueKind::PatternViolation => "PatternViolation",
            IssueKind::RangeViolation => "RangeViolation",
            IssueKind::HierarchyInconsistency => "HierarchyInconsistency",
            IssueKind::UnusedDomainValue => "UnusedDomainValue",
            IssueKind::Anomaly => "Anomaly",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One problem found in the data.
///
/// `row` is the zero-based index of the offending record; dataset-level
/// issues (hierarchy consistency, unused domain values, anomalies) have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub row: Option<usize>,
    pub column: String,
    pub kind: IssueKind,
    pub value: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub(crate) fn at_row(
        row: usize,
        column: &str,
        kind: IssueKind,
        value: Option<String>,
        message: String,
    ) -> Self {
        Self {
            row: Some(row),
            column: column.to_string(),
            kind,
            value,
            message,
        }
    }

    pub(crate) fn dataset(column: &str, kind: IssueKind, value: String, message: String) -> Self {
        Self {
            row: None,
            column: column.to_string(),
            kind,
            value: Some(value),
            message,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {row}: {}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}
