//! Data-quality validation.
//!
//! [`validate`] checks every value of every selected column against its
//! declared datatype, domain, pattern and range, and returns all problems as
//! a [`ValidationReport`]. Hierarchy consistency, unused domain members and
//! anomalies across segments are optional dataset-level checks. Whether a
//! report blocks a dataset is decided by a [`SeverityPolicy`].

mod anomaly;
mod checks;
mod engine;
pub mod error;
mod hierarchy;
pub mod issue;
pub mod policy;
pub mod report;

pub use anomaly::ANOMALY_THRESHOLD;
pub use engine::{ValidationOptions, validate, validate_rows};
pub use error::OptionsError;
pub use issue::{IssueKind, Severity, ValidationIssue};
pub use policy::SeverityPolicy;
pub use report::ValidationReport;
