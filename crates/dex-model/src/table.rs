//! The format-agnostic table every renderer consumes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::datatype::DataType;
use crate::error::{ModelError, Result};
use crate::value::Value;

/// Whether a column groups or aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Dimension,
    Measure,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Dimension => "dimension",
            ColumnRole::Measure => "measure",
        }
    }
}

/// Position of a column within a hierarchy that survives projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyPosition {
    pub hierarchy: String,
    pub level: i32,
}

/// Everything a renderer may know about one output column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub source_name: String,
    pub datatype: DataType,
    pub role: ColumnRole,
    pub format_hint: Option<String>,
    pub description: String,
    pub groups: Vec<String>,
    pub formula: Option<String>,
    pub hierarchies: Vec<HierarchyPosition>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, datatype: DataType, role: ColumnRole) -> Self {
        let name = name.into();
        Self {
            source_name: name.clone(),
            name,
            datatype,
            role,
            format_hint: None,
            description: String::new(),
            groups: Vec::new(),
            formula: None,
            hierarchies: Vec::new(),
        }
    }

    /// Computed columns have no values in the data.
    pub fn is_computed(&self) -> bool {
        self.formula.is_some()
    }
}

/// Name, destination and free-form properties of the dataset a table was
/// projected for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetIdentity {
    pub name: String,
    pub collection: String,
    pub properties: BTreeMap<String, String>,
}

/// Column descriptors plus rows of typed values aligned to them.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    identity: DatasetIdentity,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Value>>,
}

impl CanonicalTable {
    pub fn new(identity: DatasetIdentity, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            identity,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn identity(&self) -> &DatasetIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Indices of columns that carry data, i.e. everything but computed
    /// columns.
    pub fn sourced_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_computed())
            .map(|(index, _)| index)
            .collect()
    }

    /// Append a row. Its length must match the descriptors.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ModelError::RowShape {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Descriptors belonging to `hierarchy`, ascending by level.
    pub fn hierarchy(&self, hierarchy: &str) -> Vec<&ColumnDescriptor> {
        let mut members: Vec<(i32, &ColumnDescriptor)> = self
            .columns
            .iter()
            .filter_map(|c| {
                c.hierarchies
                    .iter()
                    .find(|h| h.hierarchy == hierarchy)
                    .map(|h| (h.level, c))
            })
            .collect();
        members.sort_by_key(|(level, _)| *level);
        members.into_iter().map(|(_, c)| c).collect()
    }

    /// Hierarchy names attached to descriptors, first-seen first.
    pub fn hierarchy_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for position in self.columns.iter().flat_map(|c| c.hierarchies.iter()) {
            if !names.contains(&position.hierarchy.as_str()) {
                names.push(position.hierarchy.as_str());
            }
        }
        names
    }
}
