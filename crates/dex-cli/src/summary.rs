use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use dex_output::SplitSummary;
use dex_validate::{Severity, SeverityPolicy};

use crate::commands::DatasetResult;

/// Issues beyond this many are summarised in a final row.
const MAX_ISSUE_ROWS: usize = 200;

pub fn print_summary(result: &DatasetResult) {
    println!("Dataset: {}", result.dataset);
    println!("Source: {}", result.source.display());
    if let Some(path) = &result.query_file {
        println!("Query: {}", path.display());
    }
    println!("Fatal: {}", fatal_kinds_label(&result.policy));
    println!("{}", summary_table(result));
    if let Some(table) = issue_table(result) {
        println!();
        println!("Issues:");
        println!("{table}");
    }
    if result.blocked {
        eprintln!(
            "Dataset {} has {} fatal issue(s); rerun with --force to build anyway.",
            result.dataset,
            result.fatal_count()
        );
    }
}

pub fn print_split(summary: &SplitSummary) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Partition")]);
    apply_table_style(&mut table);
    for partition in &summary.partitions {
        table.add_row(vec![Cell::new(partition)]);
    }
    println!("{table}");
    println!(
        "Split {} CSV file(s) into {} partition(s); copied {} other file(s).",
        summary.files,
        summary.partitions.len(),
        summary.copied
    );
}

/// Issue kinds that block a build under `policy`.
pub fn fatal_kinds_label(policy: &SeverityPolicy) -> String {
    let kinds: Vec<&str> = policy.fatal_kinds().map(|kind| kind.label()).collect();
    if kinds.is_empty() {
        "nothing (every issue is a warning)".to_string()
    } else {
        kinds.join(", ")
    }
}

/// One row per written file, then totals.
pub fn summary_table(result: &DatasetResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Format"),
        header_cell("File"),
        header_cell("Rows"),
        header_cell("Bytes"),
        header_cell("Forced"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for output in &result.outputs {
        let file = output
            .path
            .file_name()
            .map_or_else(|| output.path.display().to_string(), |n| n.to_string_lossy().into_owned());
        table.add_row(vec![
            Cell::new(output.format).add_attribute(Attribute::Bold),
            Cell::new(file),
            Cell::new(output.rows),
            Cell::new(output.bytes),
            if output.forced {
                Cell::new("yes").fg(Color::Yellow)
            } else {
                dim_cell("-")
            },
        ]);
    }
    if result.outputs.is_empty() {
        table.add_row(vec![
            dim_cell("-"),
            dim_cell(if result.blocked { "blocked" } else { "none" }),
            Cell::new(result.rows),
            dim_cell("-"),
            dim_cell("-"),
        ]);
    }
    table.add_row(vec![
        Cell::new("Issues")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!(
            "{} fatal, {} warning",
            result.fatal_count(),
            result.warning_count()
        ))
        .fg(if result.fatal_count() > 0 {
            Color::Red
        } else if result.warning_count() > 0 {
            Color::Yellow
        } else {
            Color::Green
        }),
        Cell::new(result.report.rows_checked),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    table
}

/// Every issue, fatal first. `None` when the report is clean.
pub fn issue_table(result: &DatasetResult) -> Option<Table> {
    if result.report.is_empty() {
        return None;
    }
    let issues = result.report.sorted_by_severity(&result.policy);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Kind"),
        header_cell("Column"),
        header_cell("Row"),
        header_cell("Value"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);
    for (severity, issue) in issues.iter().take(MAX_ISSUE_ROWS) {
        table.add_row(vec![
            severity_cell(*severity),
            Cell::new(issue.kind),
            Cell::new(&issue.column),
            issue.row.map_or_else(|| dim_cell("-"), Cell::new),
            issue
                .value
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&issue.message),
        ]);
    }
    if issues.len() > MAX_ISSUE_ROWS {
        table.add_row(vec![
            dim_cell("..."),
            dim_cell(format!("{} more", issues.len() - MAX_ISSUE_ROWS)),
            dim_cell(""),
            dim_cell(""),
            dim_cell(""),
            dim_cell("every issue is also logged"),
        ]);
    }
    Some(table)
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    if table.column_count() >= 6 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(9)),
            ColumnConstraint::UpperBoundary(Width::Fixed(24)),
            ColumnConstraint::UpperBoundary(Width::Percentage(20)),
            ColumnConstraint::LowerBoundary(Width::Fixed(5)),
            ColumnConstraint::UpperBoundary(Width::Percentage(20)),
            ColumnConstraint::UpperBoundary(Width::Percentage(45)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Fatal => Cell::new(severity.label())
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        Severity::Warning => Cell::new(severity.label()).fg(Color::Yellow),
    }
}
