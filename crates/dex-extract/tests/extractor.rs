//! Integration tests for cached extraction.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dex_extract::{
    DataExtractor, ExtractionError, ExtractorConfig, FetchRequest, Query, QueryRowSource,
    RowSource, SourceError, SubsetQueryBuilder,
};
use dex_model::{ColumnMetadata, Constraint, DataType, DatasetSpecification, MetadataSchema, Row};
use dex_validate::{IssueKind, SeverityPolicy};

/// Counts fetches and serves fixed rows.
struct CountingSource {
    fetches: Arc<AtomicUsize>,
    rows: Vec<Row>,
}

impl RowSource for CountingSource {
    fn describe(&self) -> String {
        "counting".to_string()
    }

    fn fetch(&self, _request: &FetchRequest<'_>) -> Result<Vec<Row>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}

struct FailingSource;

impl RowSource for FailingSource {
    fn describe(&self) -> String {
        "warehouse".to_string()
    }

    fn fetch(&self, _request: &FetchRequest<'_>) -> Result<Vec<Row>, SourceError> {
        Err(SourceError::MissingPath)
    }
}

fn superstore() -> (Arc<MetadataSchema>, Arc<DatasetSpecification>) {
    let schema = MetadataSchema::new(
        "superstore",
        vec![
            ColumnMetadata::new("Region").with_domain(["East", "West"]),
            ColumnMetadata::new("Ship Mode"),
            ColumnMetadata::new("Sales").with_datatype(DataType::Double),
        ],
    )
    .expect("schema");
    let spec = DatasetSpecification::builder("orders")
        .with_collection("retail")
        .with_dimensions(["Region", "Ship Mode"])
        .with_measures(["Sales"])
        .with_constraint(Constraint::new("Ship Mode", ["First Class", "Same Day"]))
        .build(&schema)
        .expect("spec");
    (Arc::new(schema), Arc::new(spec))
}

fn counting(rows: Vec<Row>) -> (CountingSource, Arc<AtomicUsize>) {
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        fetches: Arc::clone(&fetches),
        rows,
    };
    (source, fetches)
}

fn good_rows() -> Vec<Row> {
    vec![
        Row::new()
            .with("Region", "West")
            .with("Ship Mode", "Same Day")
            .with("Sales", "12.5"),
        Row::new()
            .with("Region", "East")
            .with("Ship Mode", "First Class")
            .with("Sales", 3.0),
    ]
}

#[test]
fn repeated_extraction_fetches_once() {
    let (schema, spec) = superstore();
    let (source, fetches) = counting(good_rows());
    let mut extractor = DataExtractor::new(ExtractorConfig::new(), spec, schema, source);

    extractor.extract().expect("first extract");
    extractor.extract().expect("second extract");
    assert!(extractor.validate_data().expect("validate"));
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(extractor.row_count(), 2);
}

#[test]
fn invalidate_forces_a_refetch() {
    let (schema, spec) = superstore();
    let (source, fetches) = counting(good_rows());
    let mut extractor = DataExtractor::new(ExtractorConfig::new(), spec, schema, source);

    extractor.extract().expect("extract");
    extractor.invalidate();
    assert!(!extractor.is_extracted());
    extractor.extract().expect("extract again");
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[test]
fn source_failure_is_an_extraction_error() {
    let (schema, spec) = superstore();
    let mut extractor = DataExtractor::new(ExtractorConfig::new(), spec, schema, FailingSource);

    let err = extractor.validate_data().expect_err("source fails");
    match err {
        ExtractionError::Source { source_name, .. } => assert_eq!(source_name, "warehouse"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(extractor.report().is_none());
}

#[test]
fn quality_failure_is_not_an_error() {
    let (schema, spec) = superstore();
    let rows = vec![
        Row::new()
            .with("Region", "North")
            .with("Ship Mode", "Same Day")
            .with("Sales", "lots"),
    ];
    let (source, _) = counting(rows);
    let mut extractor = DataExtractor::new(ExtractorConfig::new(), spec, schema, source);

    assert!(!extractor.validate_data().expect("extraction itself succeeds"));
    let report = extractor.report().expect("report cached");
    assert!(report.has_kind(IssueKind::TypeMismatch));
    assert!(report.has_kind(IssueKind::DomainViolation));
}

#[test]
fn policy_decides_the_verdict() {
    let (schema, spec) = superstore();
    let rows = vec![
        Row::new()
            .with("Region", "North")
            .with("Ship Mode", "Same Day")
            .with("Sales", 1.0),
    ];

    let (source, _) = counting(rows.clone());
    let mut soft = DataExtractor::new(
        ExtractorConfig::new(),
        Arc::clone(&spec),
        Arc::clone(&schema),
        source,
    );
    assert!(soft.validate_data().expect("soft"));

    let (source, _) = counting(rows);
    let mut strict = DataExtractor::new(ExtractorConfig::new(), spec, schema, source)
        .with_policy(SeverityPolicy::strict());
    assert!(!strict.validate_data().expect("strict"));
}

#[test]
fn query_builder_output_reaches_the_executor() {
    let (schema, spec) = superstore();
    let executor = QueryRowSource::new("warehouse", |query: &Query| {
        assert_eq!(query.parameter("Ship_Mode1"), Some("Same Day"));
        Ok::<_, std::io::Error>(good_rows())
    });
    let config = ExtractorConfig::new().with_view("orders").with_schema("sales");
    let mut extractor = DataExtractor::new(config, spec, schema, executor)
        .with_query_builder(SubsetQueryBuilder);

    assert!(extractor.validate_data().expect("extract"));
    let sql = extractor.query().expect("query built").sql.clone();
    assert!(sql.starts_with(r#"SELECT "Region","Ship Mode",SUM("Sales") AS "Sales" FROM "sales"."orders""#));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("orders.sql");
    extractor.save_query(&path).expect("save query");
    assert_eq!(std::fs::read_to_string(&path).expect("read"), sql);
}
