//! Hierarchy consistency.
//!
//! A hierarchy is consistent when every value at a level rolls up to exactly
//! one path of values at the levels above it.

use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

use dex_model::{ColumnMetadata, MetadataSchema, Row};

use crate::checks::value_of;
use crate::issue::{IssueKind, ValidationIssue};

/// Check every hierarchy with at least two of the `selected` columns.
pub(crate) fn check(
    schema: &MetadataSchema,
    selected: &[&ColumnMetadata],
    rows: &[Row],
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for hierarchy in schema.hierarchies() {
        let levels: Vec<&ColumnMetadata> = schema
            .columns_in_hierarchy(hierarchy)
            .into_iter()
            .filter(|column| selected.iter().any(|s| s.name == column.name))
            .collect();
        if levels.len() < 2 {
            continue;
        }
        for depth in 1..levels.len() {
            issues.extend(check_level(hierarchy, &levels[..=depth], rows));
        }
    }
    issues
}

/// Check the last column of `levels` against the columns above it.
fn check_level(hierarchy: &str, levels: &[&ColumnMetadata], rows: &[Row]) -> Vec<ValidationIssue> {
    let Some((leaf, _)) = levels.split_last() else {
        return Vec::new();
    };
    let mut parents: HashMap<String, Vec<String>> = HashMap::new();
    let mut reported = HashSet::new();
    let mut issues = Vec::new();

    for row in rows {
        let path: Option<Vec<String>> = levels
            .iter()
            .map(|column| {
                value_of(column, row)
                    .filter(|raw| !raw.is_missing())
                    .map(|raw| raw.as_text().into_owned())
            })
            .collect();
        let Some(mut path) = path else {
            continue;
        };
        let Some(value) = path.pop() else {
            continue;
        };
        match parents.entry(value) {
            Entry::Vacant(entry) => {
                entry.insert(path);
            }
            Entry::Occupied(entry) => {
                if *entry.get() != path && reported.insert(entry.key().clone()) {
                    let message = format!(
                        "inconsistent hierarchy '{hierarchy}': '{}' at level '{}' rolls up to both [{}] and [{}]",
                        entry.key(),
                        leaf.name,
                        entry.get().join(", "),
                        path.join(", ")
                    );
                    issues.push(ValidationIssue::dataset(
                        &leaf.name,
                        IssueKind::HierarchyInconsistency,
                        entry.key().clone(),
                        message,
                    ));
                }
            }
        }
    }
    issues
}
