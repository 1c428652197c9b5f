//! Category anomalies across segments.
//!
//! For each dimension the distinct values are counted per segment, e.g. per
//! year. A segment whose count lies more than [`ANOMALY_THRESHOLD`] sample
//! standard deviations from the mean suggests categories appeared, vanished
//! or were recoded there.

use std::collections::{BTreeMap, HashSet};

use dex_model::{ColumnMetadata, DatasetSpecification, MetadataSchema, Row};

use crate::checks::value_of;
use crate::issue::{IssueKind, ValidationIssue};

/// Absolute z-score above which a segment is anomalous.
pub const ANOMALY_THRESHOLD: f64 = 1.75;

/// Check every dimension among `selected` against `segmentation`, a column
/// name or physical name.
///
/// Without a spec every selected column counts as a dimension. Computed
/// columns and the segmentation column itself are skipped, as are rows with
/// no segment.
pub(crate) fn check(
    schema: &MetadataSchema,
    spec: Option<&DatasetSpecification>,
    selected: &[&ColumnMetadata],
    segmentation: &str,
    rows: &[Row],
) -> Vec<ValidationIssue> {
    let segment_column = schema.get(segmentation).or_else(|| {
        schema
            .columns()
            .iter()
            .find(|column| column.physical_name() == segmentation)
    });
    let segment_name = segment_column.map_or(segmentation, |column| column.name.as_str());
    let segment_of = |row: &Row| -> Option<String> {
        segment_column
            .and_then(|column| value_of(column, row))
            .or_else(|| row.get(segmentation))
            .filter(|raw| !raw.is_missing())
            .map(|raw| raw.as_text().into_owned())
    };

    selected
        .iter()
        .filter(|column| !column.is_computed() && column.name != segment_name)
        .filter(|column| spec.is_none_or(|spec| spec.dimensions().contains(&column.name)))
        .filter_map(|column| {
            let counts = distinct_per_segment(column, rows, &segment_of);
            outlier(&counts).map(|outlier| issue(column, segment_name, &outlier))
        })
        .collect()
}

fn distinct_per_segment(
    column: &ColumnMetadata,
    rows: &[Row],
    segment_of: &impl Fn(&Row) -> Option<String>,
) -> BTreeMap<String, usize> {
    let mut values: BTreeMap<String, HashSet<String>> = BTreeMap::new();
    for row in rows {
        let Some(segment) = segment_of(row) else {
            continue;
        };
        let seen = values.entry(segment).or_default();
        if let Some(raw) = value_of(column, row).filter(|raw| !raw.is_missing()) {
            seen.insert(raw.as_text().into_owned());
        }
    }
    values
        .into_iter()
        .map(|(segment, seen)| (segment, seen.len()))
        .collect()
}

#[derive(Debug, PartialEq)]
struct Outlier {
    segment: String,
    count: usize,
    mean: f64,
    z_score: f64,
}

/// The segment with the largest absolute z-score, if above the threshold.
fn outlier(counts: &BTreeMap<String, usize>) -> Option<Outlier> {
    let n = counts.len();
    if n < 2 {
        return None;
    }
    let mean = counts.values().map(|&c| c as f64).sum::<f64>() / n as f64;
    let variance = counts
        .values()
        .map(|&c| (c as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 || !std_dev.is_finite() {
        return None;
    }
    counts
        .iter()
        .map(|(segment, &count)| (segment, count, (count as f64 - mean) / std_dev))
        .filter(|(_, _, z)| z.abs() > ANOMALY_THRESHOLD)
        .max_by(|a, b| a.2.abs().total_cmp(&b.2.abs()))
        .map(|(segment, count, z_score)| Outlier {
            segment: segment.clone(),
            count,
            mean,
            z_score,
        })
}

fn issue(column: &ColumnMetadata, segmentation: &str, outlier: &Outlier) -> ValidationIssue {
    let message = format!(
        "'{}' has potentially anomalous data when segmented by '{segmentation}': \
         {} distinct value(s) in '{}' against a mean of {:.1} (z-score {:.2})",
        column.name, outlier.count, outlier.segment, outlier.mean, outlier.z_score
    );
    ValidationIssue::dataset(
        &column.name,
        IssueKind::Anomaly,
        outlier.segment.clone(),
        message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> MetadataSchema {
        MetadataSchema::new(
            "sales",
            vec![
                ColumnMetadata::new("Year"),
                ColumnMetadata::new("City"),
                ColumnMetadata::new("Segment"),
            ],
        )
        .expect("schema")
    }

    /// Two cities a year, six in `skewed_year`; one segment throughout.
    fn rows(skewed_year: Option<&str>) -> Vec<Row> {
        let mut rows = Vec::new();
        for year in ["2018", "2019", "2020", "2021", "2022", "2023"] {
            let cities = if Some(year) == skewed_year { 6 } else { 2 };
            for city in 0..cities {
                rows.push(
                    Row::new()
                        .with("Year", year)
                        .with("City", format!("City {city}"))
                        .with("Segment", "Consumer"),
                );
            }
        }
        rows
    }

    #[test]
    fn skewed_segment_is_reported() {
        let schema = schema();
        let selected: Vec<_> = schema.columns().iter().collect();
        let issues = check(&schema, None, &selected, "Year", &rows(Some("2023")));

        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.kind, IssueKind::Anomaly);
        assert_eq!(issue.column, "City");
        assert_eq!(issue.value.as_deref(), Some("2023"));
        assert_eq!(issue.row, None);
        assert!(issue.message.contains("segmented by 'Year'"));
        assert!(issue.message.contains("z-score 2.04"));
    }

    #[test]
    fn even_spread_is_quiet() {
        let schema = schema();
        let selected: Vec<_> = schema.columns().iter().collect();
        assert!(check(&schema, None, &selected, "Year", &rows(None)).is_empty());
    }

    #[test]
    fn few_segments_cannot_exceed_the_threshold() {
        // With n segments the largest sample z-score is (n - 1) / sqrt(n).
        let counts: BTreeMap<String, usize> =
            [("a", 1), ("b", 1), ("c", 50)].map(|(s, c)| (s.to_string(), c)).into();
        assert_eq!(outlier(&counts), None);
    }

    #[test]
    fn spec_dimensions_only() {
        let schema = schema();
        let spec = DatasetSpecification::builder("by year")
            .with_dimensions(["Year", "Segment"])
            .build(&schema)
            .expect("spec");
        let selected: Vec<_> = schema.columns().iter().collect();
        let issues = check(&schema, Some(&spec), &selected, "Year", &rows(Some("2023")));
        assert!(issues.is_empty());
    }
}
