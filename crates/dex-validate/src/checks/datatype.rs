//! Datatype checks.

use dex_model::{ColumnMetadata, RawValue, Value};

use crate::issue::{IssueKind, ValidationIssue};

/// Coerce the value to the declared type. On failure the coerced value is
/// `None` and a `TypeMismatch` is returned.
pub fn check(
    column: &ColumnMetadata,
    row: usize,
    raw: &RawValue,
) -> (Option<Value>, Option<ValidationIssue>) {
    match Value::coerce(raw, column.datatype) {
        Ok(value) => (Some(value), None),
        Err(err) => {
            let issue = ValidationIssue::at_row(
                row,
                &column.name,
                IssueKind::TypeMismatch,
                Some(err.value.clone()),
                format!("'{}': {err}", column.name),
            );
            (None, Some(issue))
        }
    }
}
