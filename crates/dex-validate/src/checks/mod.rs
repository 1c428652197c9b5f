//! Per-value validation checks.
//!
//! Each module performs one kind of check against a single value. The engine
//! runs them all; none of them short-circuits another, except that a missing
//! value is only reported as missing.

pub(crate) mod datatype;
pub(crate) mod domain;
pub(crate) mod missing;
pub(crate) mod pattern;
pub(crate) mod range;

use dex_model::{ColumnMetadata, RawValue, Row};

use self::domain::DomainSet;

/// A column prepared for validation: its metadata plus the domain members
/// coerced once up front.
pub(crate) struct ColumnPlan<'a> {
    pub column: &'a ColumnMetadata,
    pub domain: Option<DomainSet>,
}

impl<'a> ColumnPlan<'a> {
    pub fn new(column: &'a ColumnMetadata) -> Self {
        let domain = column
            .domain
            .as_deref()
            .map(|members| DomainSet::new(members, column.datatype));
        Self { column, domain }
    }

    pub fn value_in<'r>(&self, row: &'r Row) -> Option<&'r RawValue> {
        value_of(self.column, row)
    }

    /// Whether the column declares any constraint beyond its type.
    pub fn has_quality_rules(&self) -> bool {
        self.column.domain.is_some() || self.column.pattern.is_some() || self.column.range.is_some()
    }
}

/// Value of `column` in `row`; rows keyed by physical name are accepted too.
pub(crate) fn value_of<'r>(column: &ColumnMetadata, row: &'r Row) -> Option<&'r RawValue> {
    row.get(&column.name)
        .or_else(|| row.get(column.physical_name()))
}
