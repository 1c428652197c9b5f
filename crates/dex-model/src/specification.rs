//! Dataset specifications: the named, ordered selection of schema columns
//! that forms one output dataset.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::metadata::MetadataSchema;

/// A filter on the values of one column, used by subset queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub column: String,
    pub allowed_values: Vec<String>,
}

impl Constraint {
    pub fn new<I, S>(column: impl Into<String>, allowed_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            allowed_values: allowed_values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Identity and column selection of a dataset.
///
/// Columns are dimensions followed by measures. Every referenced column is
/// checked against the schema when the specification is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpecification {
    name: String,
    #[serde(default)]
    collection: String,
    #[serde(default)]
    dimensions: Vec<String>,
    #[serde(default)]
    measures: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, String>,
}

impl DatasetSpecification {
    pub fn builder(name: impl Into<String>) -> SpecificationBuilder {
        SpecificationBuilder {
            spec: DatasetSpecification {
                name: name.into(),
                collection: String::new(),
                dimensions: Vec::new(),
                measures: Vec::new(),
                constraints: Vec::new(),
                properties: BTreeMap::new(),
            },
        }
    }

    /// Parse a JSON document and check it against `schema`.
    pub fn load(source: &str, schema: &MetadataSchema) -> Result<Self> {
        let spec: DatasetSpecification = serde_json::from_str(source)
            .map_err(|err| ModelError::parse(format!("invalid dataset specification: {err}")))?;
        spec.checked(schema)
    }

    pub fn load_file(path: impl AsRef<Path>, schema: &MetadataSchema) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| ModelError::io(path, err))?;
        Self::load(&source, schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Destination component the dataset is published under.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn measures(&self) -> &[String] {
        &self.measures
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Declared column order: dimensions, then measures.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.dimensions
            .iter()
            .chain(self.measures.iter())
            .map(String::as_str)
    }

    pub fn column_count(&self) -> usize {
        self.dimensions.len() + self.measures.len()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns().any(|c| c == column)
    }

    pub fn is_measure(&self, column: &str) -> bool {
        self.measures.iter().any(|m| m == column)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| ModelError::parse(format!("cannot serialize specification: {err}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|err| ModelError::io(path, err))
    }

    fn checked(self, schema: &MetadataSchema) -> Result<Self> {
        if self.name.trim().is_empty() {
            return Err(ModelError::parse("dataset name must not be empty"));
        }
        let mut seen = HashSet::new();
        for column in self.columns() {
            schema.lookup(column)?;
            if !seen.insert(column) {
                return Err(ModelError::parse(format!(
                    "column '{column}' is listed more than once in dataset '{}'",
                    self.name
                )));
            }
        }
        for constraint in &self.constraints {
            schema.lookup(&constraint.column)?;
        }
        Ok(self)
    }
}

/// Builder for [`DatasetSpecification`].
#[derive(Debug, Clone)]
pub struct SpecificationBuilder {
    spec: DatasetSpecification,
}

impl SpecificationBuilder {
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.spec.collection = collection.into();
        self
    }

    #[must_use]
    pub fn with_dimensions<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.dimensions.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_measures<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.measures.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.spec.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.properties.insert(key.into(), value.into());
        self
    }

    /// Finish, checking every column reference against `schema`.
    pub fn build(self, schema: &MetadataSchema) -> Result<DatasetSpecification> {
        self.spec.checked(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnMetadata;

    fn schema() -> MetadataSchema {
        MetadataSchema::new(
            "Superstore",
            vec![
                ColumnMetadata::new("Region"),
                ColumnMetadata::new("Category"),
                ColumnMetadata::new("Sales"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn dimensions_precede_measures() {
        let spec = DatasetSpecification::builder("orders")
            .with_measures(["Sales"])
            .with_dimensions(["Region", "Category"])
            .build(&schema())
            .unwrap();
        assert_eq!(
            spec.columns().collect::<Vec<_>>(),
            vec!["Region", "Category", "Sales"]
        );
        assert!(spec.is_measure("Sales"));
        assert!(!spec.is_measure("Region"));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = DatasetSpecification::builder("orders")
            .with_dimensions(["Region", "Colour"])
            .build(&schema())
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownColumn { name } if name == "Colour"));
    }

    #[test]
    fn unknown_constraint_column_is_rejected() {
        let err = DatasetSpecification::builder("orders")
            .with_dimensions(["Region"])
            .with_constraint(Constraint::new("Colour", ["red"]))
            .build(&schema())
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownColumn { .. }));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let err = DatasetSpecification::builder("orders")
            .with_dimensions(["Region"])
            .with_measures(["Region"])
            .build(&schema())
            .unwrap_err();
        assert!(matches!(err, ModelError::SchemaParse { .. }));
    }

    #[test]
    fn loads_json_document() {
        let spec = DatasetSpecification::load(
            r#"{"name": "orders", "collection": "Sales", "dimensions": ["Region"],
                "measures": ["Sales"], "properties": {"owner": "finance"}}"#,
            &schema(),
        )
        .unwrap();
        assert_eq!(spec.collection(), "Sales");
        assert_eq!(spec.property("owner"), Some("finance"));
        assert_eq!(spec.column_count(), 2);
    }
}
