//! The validation pass.

use std::time::Instant;

use tracing::{debug, info, warn};

use dex_model::{ColumnMetadata, DatasetSpecification, MetadataSchema, Row};

use crate::anomaly;
use crate::checks::{ColumnPlan, datatype, domain, missing, pattern, range};
use crate::error::OptionsError;
use crate::hierarchy;
use crate::report::ValidationReport;

/// Optional dataset-level checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Check that hierarchy levels form a tree.
    pub check_hierarchies: bool,
    /// Report domain members that never occur in the data.
    pub report_unused_domain_values: bool,
    /// Column to segment dimensions by when looking for anomalies.
    pub anomaly_segmentation: Option<String>,
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_check_hierarchies(mut self, enabled: bool) -> Self {
        self.check_hierarchies = enabled;
        self
    }

    #[must_use]
    pub fn with_unused_domain_values(mut self, enabled: bool) -> Self {
        self.report_unused_domain_values = enabled;
        self
    }

    /// Look for anomalous dimensions across the values of `segmentation`.
    #[must_use]
    pub fn with_anomalies(mut self, segmentation: impl Into<String>) -> Self {
        self.anomaly_segmentation = Some(segmentation.into());
        self
    }

    /// Switch anomaly detection on or off. Turning it on needs a
    /// segmentation column.
    pub fn with_anomaly_detection(
        mut self,
        enabled: bool,
        segmentation: Option<String>,
    ) -> Result<Self, OptionsError> {
        self.anomaly_segmentation = match (enabled, segmentation) {
            (false, _) => None,
            (true, Some(column)) => Some(column),
            (true, None) => return Err(OptionsError::MissingSegmentation),
        };
        Ok(self)
    }

    /// Check the options against the schema they will be used with.
    pub fn check(&self, schema: &MetadataSchema) -> Result<(), OptionsError> {
        if let Some(column) = &self.anomaly_segmentation
            && !schema
                .columns()
                .iter()
                .any(|c| c.name == *column || c.physical_name() == column.as_str())
        {
            return Err(OptionsError::UnknownSegmentation {
                column: column.clone(),
            });
        }
        Ok(())
    }
}

/// Validate every schema column against `rows` with default options.
pub fn validate_rows(schema: &MetadataSchema, rows: &[Row]) -> ValidationReport {
    validate(schema, None, rows, &ValidationOptions::default())
}

/// Validate `rows` against the constraints of the columns `spec` selects, or
/// of every schema column when there is no spec.
///
/// Every check runs on every value; the report holds all issues found.
/// Computed columns are skipped.
pub fn validate(
    schema: &MetadataSchema,
    spec: Option<&DatasetSpecification>,
    rows: &[Row],
    options: &ValidationOptions,
) -> ValidationReport {
    let start = Instant::now();
    let dataset = spec.map_or_else(|| schema.name(), DatasetSpecification::name);
    let selected = selected_columns(schema, spec);
    let mut plans: Vec<ColumnPlan<'_>> = selected
        .iter()
        .copied()
        .filter(|column| !column.is_computed())
        .map(ColumnPlan::new)
        .collect();

    for plan in plans.iter().filter(|plan| !plan.has_quality_rules()) {
        warn!(dataset, column = %plan.column.name, "column has no quality rules");
    }

    let mut report = ValidationReport::new(dataset);
    report.rows_checked = rows.len();

    for (index, row) in rows.iter().enumerate() {
        for plan in &mut plans {
            validate_value(plan, index, row, &mut report);
        }
    }

    if options.report_unused_domain_values {
        for plan in &plans {
            if let Some(members) = &plan.domain {
                report.extend(domain::unused(plan.column, members));
            }
        }
    }

    if options.check_hierarchies {
        report.extend(hierarchy::check(schema, &selected, rows));
    }

    if let Some(segmentation) = &options.anomaly_segmentation {
        report.extend(anomaly::check(schema, spec, &selected, segmentation, rows));
    }

    for (kind, count) in report.counts_by_kind() {
        debug!(dataset, kind = %kind, count, "validation issues");
    }
    info!(
        dataset,
        rows = rows.len(),
        columns = plans.len(),
        issues = report.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "validation complete"
    );
    report
}

fn validate_value(plan: &mut ColumnPlan<'_>, index: usize, row: &Row, report: &mut ValidationReport) {
    let column = plan.column;
    let raw = match plan.value_in(row) {
        Some(raw) if !raw.is_missing() => raw,
        _ => {
            report.extend(missing::check(column, index));
            return;
        }
    };

    let (coerced, mismatch) = datatype::check(column, index, raw);
    report.extend(mismatch);
    if let Some(members) = plan.domain.as_mut() {
        report.extend(domain::check(column, members, index, raw, coerced.as_ref()));
    }
    report.extend(pattern::check(column, index, raw));
    report.extend(range::check(column, index, raw, coerced.as_ref()));
}

fn selected_columns<'a>(
    schema: &'a MetadataSchema,
    spec: Option<&DatasetSpecification>,
) -> Vec<&'a ColumnMetadata> {
    match spec {
        Some(spec) => spec.columns().filter_map(|name| schema.get(name)).collect(),
        None => schema.columns().iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueKind;
    use crate::policy::SeverityPolicy;
    use dex_model::{DataType, Pattern, ValueRange};

    #[test]
    fn missing_value_suppresses_other_kinds() {
        let schema = MetadataSchema::new(
            "s",
            vec![
                ColumnMetadata::new("Discount")
                    .with_datatype(DataType::Double)
                    .with_range(ValueRange::new(0.0, 0.2).expect("range"))
                    .with_pattern(Pattern::new(r"\d\.\d+").expect("pattern")),
            ],
        )
        .expect("schema");
        let rows = vec![Row::new().with("Discount", ""), Row::new()];
        let report = validate_rows(&schema, &rows);
        assert_eq!(report.len(), 2);
        assert!(report.issues.iter().all(|i| i.kind == IssueKind::MissingValue));
        assert_eq!(report.issues[1].row, Some(1));
    }

    #[test]
    fn whitespace_reaches_the_pattern_check() {
        let schema = MetadataSchema::new(
            "s",
            vec![
                ColumnMetadata::new("Padding").with_pattern(Pattern::new(r"\s+").expect("pattern")),
                ColumnMetadata::new("Code").with_pattern(Pattern::new(r"[A-Z]{2}").expect("pattern")),
            ],
        )
        .expect("schema");
        let rows = vec![Row::new().with("Padding", "   ").with("Code", " ")];
        let report = validate_rows(&schema, &rows);
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues[0].column, "Code");
        assert_eq!(report.issues[0].kind, IssueKind::PatternViolation);
        assert!(report.is_usable(&SeverityPolicy::soft()));
    }

    #[test]
    fn anomaly_detection_needs_a_known_segmentation() {
        let schema = MetadataSchema::new(
            "s",
            vec![ColumnMetadata::new("Year").with_physical_name("yr")],
        )
        .expect("schema");
        assert_eq!(
            ValidationOptions::new().with_anomaly_detection(true, None),
            Err(OptionsError::MissingSegmentation)
        );
        let off = ValidationOptions::new()
            .with_anomaly_detection(false, Some("Year".into()))
            .expect("off");
        assert_eq!(off.anomaly_segmentation, None);

        assert!(ValidationOptions::new().with_anomalies("yr").check(&schema).is_ok());
        assert_eq!(
            ValidationOptions::new().with_anomalies("Month").check(&schema),
            Err(OptionsError::UnknownSegmentation {
                column: "Month".into()
            })
        );
    }

    #[test]
    fn nullable_and_computed_columns_are_not_missing() {
        let schema = MetadataSchema::new(
            "s",
            vec![
                ColumnMetadata::new("Postal Code").with_nullable(true),
                ColumnMetadata::new("Profit Ratio")
                    .with_datatype(DataType::Double)
                    .with_formula("SUM([Profit])/SUM([Sales])"),
            ],
        )
        .expect("schema");
        let report = validate_rows(&schema, &[Row::new()]);
        assert!(report.is_empty());
        assert!(report.is_usable(&SeverityPolicy::strict()));
    }

    #[test]
    fn rows_keyed_by_physical_name_are_accepted() {
        let schema = MetadataSchema::new(
            "s",
            vec![
                ColumnMetadata::new("Quantity")
                    .with_physical_name("qty")
                    .with_datatype(DataType::Integer),
            ],
        )
        .expect("schema");
        let report = validate_rows(&schema, &[Row::new().with("qty", "three")]);
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::TypeMismatch);
        assert_eq!(report.issues[0].column, "Quantity");
    }
}
