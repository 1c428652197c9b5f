//! End-to-end builds over an in-memory dataset.

use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dex_extract::{DataExtractor, ExtractorConfig, FetchRequest, RowSource, SourceError};
use dex_model::{
    CanonicalTable, ColumnMetadata, DataType, DatasetSpecification, MetadataSchema, OutputFormat,
    Pattern, Row,
};
use dex_output::{
    BuildError, BuildOptions, CsvRenderer, DatasetBuilder, RenderError, Renderer,
};
use dex_validate::SeverityPolicy;

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

/// Writes a little, then fails.
struct BrokenCsv;

impl Renderer for BrokenCsv {
    fn format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn render(&self, _table: &CanonicalTable, writer: &mut dyn Write) -> Result<(), RenderError> {
        writer.write_all(b"Region,")?;
        Err(RenderError::Message("disk full".into()))
    }
}

fn schema() -> MetadataSchema {
    MetadataSchema::new(
        "superstore",
        vec![
            ColumnMetadata::new("Region")
                .with_domain(["East", "West", "Central"])
                .with_group("Location"),
            ColumnMetadata::new("Postcode")
                .with_pattern(Pattern::new("[A-Z]{2}[0-9]").expect("pattern")),
            ColumnMetadata::new("Order Date").with_datatype(DataType::Date),
            ColumnMetadata::new("Sales")
                .with_datatype(DataType::Double)
                .with_physical_name("sales_amount"),
        ],
    )
    .expect("schema")
}

fn builder_for(rows: Vec<Row>, options: BuildOptions) -> (DatasetBuilder, Arc<AtomicUsize>) {
    let schema = schema();
    let spec = DatasetSpecification::builder("orders")
        .with_collection("ENQ-7")
        .with_dimensions(["Order Date", "Region", "Postcode"])
        .with_measures(["Sales"])
        .build(&schema)
        .expect("spec");
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        fetches: Arc::clone(&fetches),
        rows,
    };
    let extractor = DataExtractor::new(
        ExtractorConfig::new(),
        Arc::new(spec),
        Arc::new(schema),
        source,
    );
    (DatasetBuilder::new(extractor).with_options(options), fetches)
}

fn clean_rows() -> Vec<Row> {
    vec![
        Row::new()
            .with("Region", "West")
            .with("Postcode", "LS1")
            .with("Order Date", "2024-01-31")
            .with("sales_amount", "10.5"),
        Row::new()
            .with("Region", "North")
            .with("Postcode", "YO1")
            .with("Order Date", "2024-02-01")
            .with("sales_amount", 4.0),
    ]
}

fn dirty_rows() -> Vec<Row> {
    vec![
        Row::new()
            .with("Region", "West")
            .with("Postcode", "LS1")
            .with("Order Date", "2024-01-31")
            .with("sales_amount", "10.5"),
        Row::new()
            .with("Region", "East")
            .with("Postcode", "YO1")
            .with("Order Date", "yesterday")
            .with("sales_amount", "3"),
    ]
}

#[test]
fn fatal_issues_block_the_build() {
    let (mut builder, _) = builder_for(dirty_rows(), BuildOptions::default());
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("orders.csv");

    let err = builder.build(&path, OutputFormat::Csv).expect_err("blocked");
    match err {
        BuildError::Validation {
            dataset,
            fatal,
            warnings,
        } => {
            assert_eq!(dataset, "orders");
            assert_eq!(fatal, 1);
            assert_eq!(warnings, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[test]
fn forced_build_writes_despite_fatal_issues() {
    let options = BuildOptions::new().with_force(true);
    let (mut builder, _) = builder_for(dirty_rows(), options);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("orders.csv");

    let output = builder.build(&path, OutputFormat::Csv).expect("forced build");
    assert!(output.forced);
    assert_eq!(output.rows, 2);
    let csv = fs::read_to_string(&path).expect("read csv");
    insta::assert_snapshot!(csv, @r"
    Order Date,Region,Postcode,Sales
    2024-01-31,West,LS1,10.5
    yesterday,East,YO1,3
    ");
}

#[test]
fn warnings_do_not_block_and_builds_share_one_fetch() {
    let (mut builder, fetches) = builder_for(clean_rows(), BuildOptions::default());
    let dir = tempfile::tempdir().expect("tempdir");

    let csv = builder
        .build_into(dir.path(), OutputFormat::Csv)
        .expect("csv build");
    let xlsx = builder
        .build_into(dir.path(), OutputFormat::Xlsx)
        .expect("xlsx build");
    let info = builder
        .build_into(dir.path(), OutputFormat::Info)
        .expect("info build");

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert!(!csv.forced);
    assert_eq!(csv.path, dir.path().join("orders.csv"));
    assert_eq!(xlsx.path, dir.path().join("orders.xlsx"));
    assert_eq!(info.path, dir.path().join("orders-info.xlsx"));
    assert!(xlsx.bytes > 0 && info.bytes > 0);
    let report = builder.extractor().report().expect("report");
    assert_eq!(report.warning_count(builder.extractor().policy()), 1);
}

#[test]
fn unsupported_format_writes_nothing() {
    let (mut builder, fetches) = builder_for(clean_rows(), BuildOptions::default());
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("orders.hyper");

    let err = builder
        .build(&path, OutputFormat::Hyper)
        .expect_err("no renderer");
    assert!(matches!(
        err,
        BuildError::UnsupportedFormat {
            format: OutputFormat::Hyper
        }
    ));
    assert!(!path.exists());
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[test]
fn render_failure_keeps_cached_rows() {
    let (mut builder, fetches) = builder_for(clean_rows(), BuildOptions::default());
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("orders.csv");

    builder.register(BrokenCsv);
    let err = builder
        .build(&path, OutputFormat::Csv)
        .expect_err("render fails");
    assert!(matches!(err, BuildError::Render(RenderError::Message(_))));
    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);

    builder.register(CsvRenderer::default());
    builder.build(&path, OutputFormat::Csv).expect("second build");
    assert!(path.exists());
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[test]
fn table_follows_spec_order() {
    let (mut builder, _) = builder_for(clean_rows(), BuildOptions::new().with_row_numbers(true));
    assert!(builder.validate_metadata());

    let table = builder.table().expect("table");
    let names: Vec<_> = table.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Row", "Order Date", "Region", "Postcode", "Sales"]);
    assert_eq!(table.columns()[4].source_name, "sales_amount");
    assert_eq!(table.identity().collection, "ENQ-7");
}

#[test]
fn strict_policy_blocks_warnings() {
    let (builder, _) = builder_for(clean_rows(), BuildOptions::default());
    let extractor = builder.extractor();
    let strict = DataExtractor::new(
        extractor.config().clone(),
        Arc::clone(extractor.spec()),
        Arc::clone(extractor.schema()),
        CountingSource {
            fetches: Arc::new(AtomicUsize::new(0)),
            rows: clean_rows(),
        },
    )
    .with_policy(SeverityPolicy::strict());
    let mut builder = DatasetBuilder::new(strict);

    let dir = tempfile::tempdir().expect("tempdir");
    let err = builder
        .build_into(dir.path(), OutputFormat::Json)
        .expect_err("domain violation is fatal under strict");
    assert!(matches!(err, BuildError::Validation { fatal: 1, .. }));
}
