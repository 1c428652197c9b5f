//! Inclusive numeric range checks.

use dex_common::{format_numeric, parse_f64};
use dex_model::{ColumnMetadata, RawValue, Value};

use crate::issue::{IssueKind, ValidationIssue};

/// Numeric interpretation of a value: its coerced form when numeric, else the
/// raw value read as a number.
fn numeric(raw: &RawValue, coerced: Option<&Value>) -> Option<f64> {
    if let Some(number) = coerced.and_then(Value::as_f64) {
        return Some(number);
    }
    match raw {
        RawValue::Integer(value) => Some(*value as f64),
        RawValue::Float(value) if value.is_finite() => Some(*value),
        RawValue::Text(text) => parse_f64(text),
        _ => None,
    }
}

pub fn check(
    column: &ColumnMetadata,
    row: usize,
    raw: &RawValue,
    coerced: Option<&Value>,
) -> Option<ValidationIssue> {
    let range = column.range?;
    let number = numeric(raw, coerced)?;
    if range.contains(number) {
        return None;
    }
    let (relation, bound) = if number < range.min {
        ("less than", range.min)
    } else {
        ("greater than", range.max)
    };
    let text = raw.as_text().into_owned();
    let message = format!(
        "'{}': '{text}' is {relation} '{}'",
        column.name,
        format_numeric(bound)
    );
    Some(ValidationIssue::at_row(
        row,
        &column.name,
        IssueKind::RangeViolation,
        Some(text),
        message,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_model::{DataType, ValueRange};

    fn discount() -> ColumnMetadata {
        ColumnMetadata::new("Discount")
            .with_datatype(DataType::Double)
            .with_range(ValueRange::new(0.0, 0.2).expect("range"))
    }

    #[test]
    fn bounds_are_inclusive() {
        let column = discount();
        for value in [0.0, 0.2] {
            let raw = RawValue::Float(value);
            let coerced = Value::coerce(&raw, column.datatype).ok();
            assert!(check(&column, 0, &raw, coerced.as_ref()).is_none());
        }
    }

    #[test]
    fn reports_side_of_violation() {
        let column = discount();
        let raw = RawValue::from("0.5");
        let coerced = Value::coerce(&raw, column.datatype).ok();
        let issue = check(&column, 2, &raw, coerced.as_ref()).expect("violation");
        assert_eq!(issue.message, "'Discount': '0.5' is greater than '0.2'");
    }

    #[test]
    fn non_numeric_values_are_skipped() {
        let column = discount();
        assert!(check(&column, 0, &RawValue::from("n/a"), None).is_none());
    }
}
