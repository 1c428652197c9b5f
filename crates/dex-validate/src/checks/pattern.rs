//! Pattern checks against the raw string form of a value.

use dex_model::{ColumnMetadata, RawValue};

use crate::issue::{IssueKind, ValidationIssue};

pub fn check(column: &ColumnMetadata, row: usize, raw: &RawValue) -> Option<ValidationIssue> {
    let pattern = column.pattern.as_ref()?;
    let text = raw.as_text();
    if pattern.is_match(&text) {
        return None;
    }
    let message = format!(
        "'{}': '{text}' does not match the pattern '{}'",
        column.name,
        pattern.as_str()
    );
    Some(ValidationIssue::at_row(
        row,
        &column.name,
        IssueKind::PatternViolation,
        Some(text.into_owned()),
        message,
    ))
}
