//! Projection of validated rows into a [`CanonicalTable`].

use std::collections::HashMap;

use tracing::debug;

use dex_model::{
    CanonicalTable, ColumnDescriptor, ColumnMetadata, ColumnRole, DataType, DatasetIdentity,
    DatasetSpecification, HierarchyPosition, MetadataSchema, ModelError, RawValue, Row, Value,
};

/// Name of the column prepended when row numbers are requested.
pub const ROW_NUMBER_COLUMN: &str = "Row";

/// Hierarchies with fewer than two members in the dataset are not attached
/// to descriptors.
pub fn effective_hierarchies<'a>(
    schema: &'a MetadataSchema,
    spec: &DatasetSpecification,
) -> Vec<&'a str> {
    schema
        .hierarchies()
        .into_iter()
        .filter(|hierarchy| {
            let members = schema
                .columns_in_hierarchy(hierarchy)
                .into_iter()
                .filter(|column| spec.contains(&column.name))
                .count();
            if members < 2 {
                debug!(hierarchy, members, "dropping redundant hierarchy");
            }
            members >= 2
        })
        .collect()
}

/// Descriptors of the dataset's columns, in specification order.
///
/// Every dataset column must resolve in the schema; the builder checks that
/// before projecting.
pub fn descriptors(
    schema: &MetadataSchema,
    spec: &DatasetSpecification,
    include_row_numbers: bool,
) -> Result<Vec<ColumnDescriptor>, ModelError> {
    let kept = effective_hierarchies(schema, spec);
    let mut columns = Vec::with_capacity(spec.column_count() + 1);
    if include_row_numbers {
        columns.push(ColumnDescriptor::new(
            ROW_NUMBER_COLUMN,
            DataType::Integer,
            ColumnRole::Dimension,
        ));
    }
    for name in spec.columns() {
        let metadata = schema.lookup(name)?;
        let role = if spec.is_measure(name) {
            ColumnRole::Measure
        } else {
            ColumnRole::Dimension
        };
        columns.push(describe(metadata, role, &kept));
    }
    Ok(columns)
}

fn describe(metadata: &ColumnMetadata, role: ColumnRole, hierarchies: &[&str]) -> ColumnDescriptor {
    let mut descriptor = ColumnDescriptor::new(metadata.name.as_str(), metadata.datatype, role);
    descriptor.source_name = metadata.physical_name().to_string();
    descriptor.format_hint.clone_from(&metadata.default_format);
    descriptor.description.clone_from(&metadata.description);
    descriptor.groups.clone_from(&metadata.groups);
    descriptor.formula.clone_from(&metadata.formula);
    descriptor.hierarchies = metadata
        .hierarchies
        .iter()
        .filter(|level| hierarchies.contains(&level.hierarchy.as_str()))
        .map(|level| HierarchyPosition {
            hierarchy: level.hierarchy.clone(),
            level: level.level,
        })
        .collect();
    descriptor
}

/// Build the canonical table for `rows`.
///
/// Values that cannot be coerced to their column's type are kept as text;
/// computed columns are left null for the consumer to evaluate.
pub fn project(
    schema: &MetadataSchema,
    spec: &DatasetSpecification,
    rows: &[Row],
    include_row_numbers: bool,
) -> Result<CanonicalTable, ModelError> {
    let columns = descriptors(schema, spec, include_row_numbers)?;
    let identity = DatasetIdentity {
        name: spec.name().to_string(),
        collection: spec.collection().to_string(),
        properties: spec.properties().clone(),
    };
    let physical: HashMap<&str, &str> = columns
        .iter()
        .map(|c| (c.name.as_str(), c.source_name.as_str()))
        .collect();

    let data_columns = &columns[usize::from(include_row_numbers)..];

    let mut table = CanonicalTable::new(identity, columns.clone());
    let mut fallbacks = 0usize;
    for (index, row) in rows.iter().enumerate() {
        let mut values = Vec::with_capacity(columns.len());
        if include_row_numbers {
            values.push(Value::Integer(i64::try_from(index + 1).unwrap_or(i64::MAX)));
        }
        for column in data_columns {
            if column.is_computed() {
                values.push(Value::Null);
                continue;
            }
            let raw = row
                .get(&column.name)
                .or_else(|| physical.get(column.name.as_str()).and_then(|name| row.get(name)));
            let value = match raw {
                None => Value::Null,
                Some(raw) => coerce_or_text(raw, column.datatype, &mut fallbacks),
            };
            values.push(value);
        }
        table.push_row(values)?;
    }
    debug!(
        dataset = %table.name(),
        rows = table.row_count(),
        columns = table.column_count(),
        fallbacks,
        "projected table"
    );
    Ok(table)
}

fn coerce_or_text(raw: &RawValue, datatype: DataType, fallbacks: &mut usize) -> Value {
    Value::coerce(raw, datatype).unwrap_or_else(|_| {
        *fallbacks += 1;
        Value::Text(raw.as_text().into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> MetadataSchema {
        MetadataSchema::new(
            "geo",
            vec![
                ColumnMetadata::new("Country")
                    .with_hierarchy("Geography", 1)
                    .with_group("Location"),
                ColumnMetadata::new("City")
                    .with_physical_name("city_name")
                    .with_hierarchy("Geography", 2),
                ColumnMetadata::new("Year").with_hierarchy("Time", 1),
                ColumnMetadata::new("Population").with_datatype(DataType::Integer),
                ColumnMetadata::new("Density")
                    .with_datatype(DataType::Double)
                    .with_formula("[Population]/[Area]"),
            ],
        )
        .unwrap()
    }

    fn spec(schema: &MetadataSchema) -> DatasetSpecification {
        DatasetSpecification::builder("cities")
            .with_dimensions(["City", "Country", "Year"])
            .with_measures(["Population", "Density"])
            .build(schema)
            .unwrap()
    }

    #[test]
    fn single_member_hierarchies_are_dropped() {
        let schema = schema();
        let spec = spec(&schema);
        assert_eq!(effective_hierarchies(&schema, &spec), vec!["Geography"]);

        let columns = descriptors(&schema, &spec, false).unwrap();
        let year = columns.iter().find(|c| c.name == "Year").unwrap();
        assert!(year.hierarchies.is_empty());
        // the schema keeps its declaration
        assert_eq!(schema.get("Year").unwrap().hierarchies.len(), 1);
    }

    #[test]
    fn descriptors_follow_spec_order() {
        let schema = schema();
        let spec = spec(&schema);
        let columns = descriptors(&schema, &spec, true).unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Row", "City", "Country", "Year", "Population", "Density"]
        );
        assert_eq!(columns[1].source_name, "city_name");
        assert_eq!(columns[4].role, ColumnRole::Measure);
    }

    #[test]
    fn rows_are_typed_with_text_fallback() {
        let schema = schema();
        let spec = spec(&schema);
        let rows = vec![
            Row::new()
                .with("city_name", "Leeds")
                .with("Country", "UK")
                .with("Year", "2021")
                .with("Population", "812000"),
            Row::new()
                .with("City", "York")
                .with("Country", "UK")
                .with("Population", "unknown"),
        ];
        let table = project(&schema, &spec, &rows, true).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][0], Value::Integer(1));
        assert_eq!(table.rows()[0][1], Value::Text("Leeds".into()));
        assert_eq!(table.rows()[0][4], Value::Integer(812_000));
        assert_eq!(table.rows()[0][5], Value::Null);
        assert_eq!(table.rows()[1][0], Value::Integer(2));
        assert_eq!(table.rows()[1][3], Value::Null);
        assert_eq!(table.rows()[1][4], Value::Text("unknown".into()));
    }
}
