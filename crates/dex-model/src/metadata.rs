//! Column-level metadata and the schema that owns it.
//!
//! A schema is loaded once from a JSON document and is immutable afterwards.
//! Two document shapes are accepted:
//!
//! ```json
//! {"collection": {"name": "Superstore", "items": [{"name": "Region", "datatype": "string"}]}}
//! {"datasource": {"name": "Superstore", "fields": [{"fieldName": "Region"}]}}
//! ```
//!
//! Keys not modelled by [`ColumnMetadata`] are preserved in its `properties`
//! map and written back by [`MetadataSchema::save`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::datatype::DataType;
use crate::error::{ModelError, Result};
use crate::value::RawValue;

/// A compiled, fully anchored regular expression.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{source})$"))
            .map_err(|err| ModelError::parse(format!("invalid pattern '{source}': {err}")))?;
        Ok(Self { source, regex })
    }

    /// True when the whole of `text` matches.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The expression as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(ModelError::parse(format!(
                "invalid range [{min}, {max}]: min must not exceed max"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Membership of a column in a named hierarchy. Lower levels sit higher in
/// the drill path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchyLevel {
    pub hierarchy: String,
    pub level: i32,
}

impl HierarchyLevel {
    pub fn new(hierarchy: impl Into<String>, level: i32) -> Self {
        Self {
            hierarchy: hierarchy.into(),
            level,
        }
    }
}

/// Metadata for one data field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub physical_name: Option<String>,
    pub description: String,
    pub datatype: DataType,
    pub domain: Option<Vec<RawValue>>,
    pub pattern: Option<Pattern>,
    pub range: Option<ValueRange>,
    pub formula: Option<String>,
    pub default_format: Option<String>,
    pub groups: Vec<String>,
    pub hierarchies: Vec<HierarchyLevel>,
    pub nullable: bool,
    pub properties: Map<String, JsonValue>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_datatype(mut self, datatype: DataType) -> Self {
        self.datatype = datatype;
        self
    }

    #[must_use]
    pub fn with_physical_name(mut self, physical_name: impl Into<String>) -> Self {
        self.physical_name = Some(physical_name.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_domain<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        self.domain = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    #[must_use]
    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    #[must_use]
    pub fn with_default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        let group = group.into();
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
        self
    }

    #[must_use]
    pub fn with_hierarchy(mut self, hierarchy: impl Into<String>, level: i32) -> Self {
        self.hierarchies.push(HierarchyLevel::new(hierarchy, level));
        self
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Name of the column in the row source.
    pub fn physical_name(&self) -> &str {
        self.physical_name.as_deref().unwrap_or(&self.name)
    }

    /// Computed columns carry a formula and are absent from raw rows.
    pub fn is_computed(&self) -> bool {
        self.formula.is_some()
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn level_in(&self, hierarchy: &str) -> Option<i32> {
        self.hierarchies
            .iter()
            .find(|h| h.hierarchy == hierarchy)
            .map(|h| h.level)
    }
}

/// Named collection of column metadata, keyed by unique column name and kept
/// in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataSchema {
    name: String,
    columns: Vec<ColumnMetadata>,
    index: HashMap<String, usize>,
}

impl MetadataSchema {
    /// Build a schema from columns, enforcing name and hierarchy-level
    /// uniqueness.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnMetadata>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        let mut levels = HashSet::new();
        for (position, column) in columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(ModelError::parse("column name must not be empty"));
            }
            if index.insert(column.name.clone(), position).is_some() {
                return Err(ModelError::parse(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
            for membership in &column.hierarchies {
                if !levels.insert((membership.hierarchy.as_str(), membership.level)) {
                    return Err(ModelError::parse(format!(
                        "hierarchy '{}' declares level {} more than once (column '{}')",
                        membership.hierarchy, membership.level, column.name
                    )));
                }
            }
        }
        Ok(Self {
            name: name.into(),
            columns,
            index,
        })
    }

    /// Parse a JSON document.
    pub fn load(source: &str) -> Result<Self> {
        let document: SchemaDocument = serde_json::from_str(source)
            .map_err(|err| ModelError::parse(format!("invalid metadata document: {err}")))?;
        let collection = document.collection;
        let columns = collection
            .items
            .into_iter()
            .map(ItemDocument::into_column)
            .collect::<Result<Vec<_>>>()?;
        Self::new(collection.name, columns)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| ModelError::io(path, err))?;
        Self::load(&source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, name: &str) -> Result<&ColumnMetadata> {
        self.get(name).ok_or_else(|| ModelError::UnknownColumn {
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&ColumnMetadata> {
        self.index.get(name).map(|&position| &self.columns[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns_in_group(&self, group: &str) -> Vec<&ColumnMetadata> {
        self.columns.iter().filter(|c| c.in_group(group)).collect()
    }

    /// Columns of a hierarchy, ascending by level. Ties keep declaration
    /// order.
    pub fn columns_in_hierarchy(&self, hierarchy: &str) -> Vec<&ColumnMetadata> {
        let mut members: Vec<(i32, &ColumnMetadata)> = self
            .columns
            .iter()
            .filter_map(|c| c.level_in(hierarchy).map(|level| (level, c)))
            .collect();
        members.sort_by_key(|(level, _)| *level);
        members.into_iter().map(|(_, column)| column).collect()
    }

    /// Distinct hierarchy names, first-declared first.
    pub fn hierarchies(&self) -> Vec<&str> {
        distinct(
            self.columns
                .iter()
                .flat_map(|c| c.hierarchies.iter().map(|h| h.hierarchy.as_str())),
        )
    }

    /// Distinct group tags, first-declared first.
    pub fn groups(&self) -> Vec<&str> {
        distinct(
            self.columns
                .iter()
                .flat_map(|c| c.groups.iter().map(String::as_str)),
        )
    }

    /// New schema holding this schema's columns followed by `other`'s.
    pub fn merge(&self, other: &MetadataSchema) -> Result<Self> {
        let columns = self
            .columns
            .iter()
            .chain(other.columns.iter())
            .cloned()
            .collect();
        Self::new(self.name.clone(), columns)
    }

    /// Serialize in the `collection` document shape.
    pub fn to_json(&self) -> Result<String> {
        let document = SchemaDocument {
            collection: CollectionDocument {
                name: self.name.clone(),
                items: self.columns.iter().map(ItemDocument::from_column).collect(),
            },
        };
        serde_json::to_string_pretty(&document)
            .map_err(|err| ModelError::parse(format!("cannot serialize metadata: {err}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|err| ModelError::io(path, err))
    }
}

fn distinct<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    names.filter(|name| seen.insert(*name)).collect()
}

#[derive(Serialize, Deserialize)]
struct SchemaDocument {
    #[serde(alias = "datasource")]
    collection: CollectionDocument,
}

#[derive(Serialize, Deserialize)]
struct CollectionDocument {
    #[serde(default)]
    name: String,
    #[serde(alias = "fields")]
    items: Vec<ItemDocument>,
}

#[derive(Serialize, Deserialize)]
struct ItemDocument {
    #[serde(alias = "fieldName")]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(
        default,
        alias = "physical_column_name",
        alias = "output_name",
        skip_serializing_if = "Option::is_none"
    )]
    physical_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<Vec<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hierarchies: Vec<HierarchyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nullable: Option<bool>,
    #[serde(flatten)]
    properties: Map<String, JsonValue>,
}

impl ItemDocument {
    fn into_column(self) -> Result<ColumnMetadata> {
        let pattern = self.pattern.map(Pattern::new).transpose()?;
        let range = self
            .range
            .map(|[min, max]| ValueRange::new(min, max))
            .transpose()
            .map_err(|err| match err {
                ModelError::SchemaParse { message } => {
                    ModelError::parse(format!("column '{}': {message}", self.name))
                }
                other => other,
            })?;
        let mut groups: Vec<String> = Vec::with_capacity(self.groups.len());
        for group in self.groups {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        Ok(ColumnMetadata {
            name: self.name,
            physical_name: self.physical_name,
            description: self.description,
            datatype: self.datatype.unwrap_or_default(),
            domain: self.domain,
            pattern,
            range,
            formula: self.formula,
            default_format: self.default_format,
            groups,
            hierarchies: self.hierarchies,
            nullable: self.nullable.unwrap_or(false),
            properties: self.properties,
        })
    }

    fn from_column(column: &ColumnMetadata) -> Self {
        Self {
            name: column.name.clone(),
            description: column.description.clone(),
            physical_name: column.physical_name.clone(),
            datatype: Some(column.datatype),
            domain: column.domain.clone(),
            pattern: column.pattern.as_ref().map(|p| p.as_str().to_string()),
            range: column.range.map(|r| [r.min, r.max]),
            formula: column.formula.clone(),
            default_format: column.default_format.clone(),
            groups: column.groups.clone(),
            hierarchies: column.hierarchies.clone(),
            nullable: column.nullable.then_some(true),
            properties: column.properties.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPERSTORE: &str = r#"{
        "collection": {
            "name": "Superstore",
            "items": [
                {"name": "Category", "description": "Product category",
                 "domain": ["Furniture", "Office Supplies", "Technology"],
                 "groups": ["Product"],
                 "hierarchies": [{"hierarchy": "Product", "level": 1}]},
                {"name": "Sub-Category", "groups": ["Product"],
                 "hierarchies": [{"hierarchy": "Product", "level": 2}]},
                {"name": "Order Identifier", "physical_column_name": "order_id",
                 "pattern": "(US|CA)-20\\d\\d-\\d{6}"},
                {"name": "Discount", "datatype": "double", "range": [0.0, 0.2]},
                {"name": "Profit Ratio", "datatype": "double", "formula": "SUM([Profit])/SUM([Sales])",
                 "default_format": "p0%", "owner": "finance"}
            ]
        }
    }"#;

    #[test]
    fn loads_collection_shape() {
        let schema = MetadataSchema::load(SUPERSTORE).unwrap();
        assert_eq!(schema.name(), "Superstore");
        assert_eq!(schema.len(), 5);

        let order = schema.lookup("Order Identifier").unwrap();
        assert_eq!(order.physical_name(), "order_id");
        assert!(order.pattern.as_ref().unwrap().is_match("US-2020-123456"));
        assert!(!order.pattern.as_ref().unwrap().is_match("xUS-2020-123456"));

        let ratio = schema.lookup("Profit Ratio").unwrap();
        assert!(ratio.is_computed());
        assert_eq!(ratio.properties.get("owner"), Some(&JsonValue::from("finance")));
        assert_eq!(schema.lookup("Category").unwrap().datatype, DataType::String);
    }

    #[test]
    fn loads_datasource_shape() {
        let schema = MetadataSchema::load(
            r#"{"datasource": {"name": "Orders", "fields": [{"fieldName": "Region", "description": "Sales region"}]}}"#,
        )
        .unwrap();
        assert_eq!(schema.name(), "Orders");
        assert_eq!(schema.lookup("Region").unwrap().description, "Sales region");
    }

    #[test]
    fn rejects_definition_errors() {
        let cases = [
            r#"{"collection": {"name": "x", "items": [{"name": "a", "datatype": "decimal128"}]}}"#,
            r#"{"collection": {"name": "x", "items": [{"name": "a"}, {"name": "a"}]}}"#,
            r#"{"collection": {"name": "x", "items": [{"name": "a", "pattern": "("}]}}"#,
            r#"{"collection": {"name": "x", "items": [{"name": "a", "range": [5, 1]}]}}"#,
            r#"{"collection": {"name": "x", "items": [
                {"name": "a", "hierarchies": [{"hierarchy": "h", "level": 1}]},
                {"name": "b", "hierarchies": [{"hierarchy": "h", "level": 1}]}]}}"#,
            r#"{"items": []}"#,
        ];
        for case in cases {
            let err = MetadataSchema::load(case).unwrap_err();
            assert!(matches!(err, ModelError::SchemaParse { .. }), "{case}: {err}");
        }
    }

    #[test]
    fn lookup_unknown_column() {
        let schema = MetadataSchema::load(SUPERSTORE).unwrap();
        let err = schema.lookup("Colour").unwrap_err();
        assert!(matches!(err, ModelError::UnknownColumn { name } if name == "Colour"));
    }

    #[test]
    fn groups_and_hierarchies_in_order() {
        let schema = MetadataSchema::load(SUPERSTORE).unwrap();
        assert_eq!(schema.groups(), vec!["Product"]);
        assert_eq!(schema.hierarchies(), vec!["Product"]);
        let names: Vec<_> = schema
            .columns_in_hierarchy("Product")
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Category", "Sub-Category"]);
        assert_eq!(schema.columns_in_group("Product").len(), 2);
        assert!(schema.columns_in_group("Shipping").is_empty());
    }

    #[test]
    fn save_round_trips_properties() {
        let schema = MetadataSchema::load(SUPERSTORE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        schema.save(&path).unwrap();
        let reloaded = MetadataSchema::load_file(&path).unwrap();
        assert_eq!(reloaded, schema);
    }

    #[test]
    fn merge_rejects_duplicates() {
        let a = MetadataSchema::new("a", vec![ColumnMetadata::new("x")]).unwrap();
        let b = MetadataSchema::new("b", vec![ColumnMetadata::new("y")]).unwrap();
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(a.merge(&a).is_err());
    }

    #[test]
    fn load_file_reports_path() {
        let err = MetadataSchema::load_file("/nonexistent/metadata.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/metadata.json"));
    }
}
