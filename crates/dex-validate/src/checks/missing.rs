//! Null and empty value checks.

use dex_model::ColumnMetadata;

use crate::issue::{IssueKind, ValidationIssue};

/// Report an absent, null or empty value unless the column is nullable.
pub fn check(column: &ColumnMetadata, row: usize) -> Option<ValidationIssue> {
    if column.nullable {
        return None;
    }
    Some(ValidationIssue::at_row(
        row,
        &column.name,
        IssueKind::MissingValue,
        None,
        format!("'{}' has no value", column.name),
    ))
}
