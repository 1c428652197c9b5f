//! SQL query construction strategies.
//!
//! Builders produce a query string plus named parameters in the
//! `%(name)s` style; executing it is the row source's business.

use dex_model::{DatasetSpecification, MetadataSchema};

use crate::config::ExtractorConfig;
use crate::error::QueryError;

/// A built query with its named parameters, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub sql: String,
    pub parameters: Vec<(String, String)>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Everything a query builder may look at.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub config: &'a ExtractorConfig,
    pub schema: &'a MetadataSchema,
    pub spec: &'a DatasetSpecification,
}

/// Strategy for turning a dataset into a query.
pub trait QueryBuilder {
    fn build(&self, ctx: &QueryContext<'_>) -> Result<Query, QueryError>;
}

impl<F> QueryBuilder for F
where
    F: Fn(&QueryContext<'_>) -> Result<Query, QueryError>,
{
    fn build(&self, ctx: &QueryContext<'_>) -> Result<Query, QueryError> {
        self(ctx)
    }
}

/// `SELECT *` from the configured view.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewQueryBuilder;

impl QueryBuilder for ViewQueryBuilder {
    fn build(&self, ctx: &QueryContext<'_>) -> Result<Query, QueryError> {
        Ok(Query::new(format!("SELECT * FROM {}", qualified_view(ctx.config)?)))
    }
}

/// Aggregating selection of the dataset's sourced columns.
///
/// Measures are summed, dimensions grouped, and every constraint becomes an
/// `IN` list of named parameters called `<column><index>`, spaces in the
/// column name replaced by underscores.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubsetQueryBuilder;

impl QueryBuilder for SubsetQueryBuilder {
    fn build(&self, ctx: &QueryContext<'_>) -> Result<Query, QueryError> {
        let table = qualified_view(ctx.config)?;
        let sourced: Vec<&str> = ctx
            .spec
            .columns()
            .filter(|name| ctx.schema.get(name).is_some_and(|c| !c.is_computed()))
            .collect();
        if sourced.is_empty() {
            return Err(QueryError::NoColumns {
                dataset: ctx.spec.name().to_string(),
            });
        }

        let (measures, dimensions): (Vec<&str>, Vec<&str>) =
            sourced.iter().partition(|name| ctx.spec.is_measure(name));
        let mut select: Vec<String> = dimensions.iter().map(|name| quote(name)).collect();
        select.extend(
            measures
                .iter()
                .map(|name| format!("SUM({}) AS {}", quote(name), quote(name))),
        );

        let mut sql = format!("SELECT {} FROM {table}", select.join(","));
        let mut parameters = Vec::new();
        let mut clauses = Vec::new();
        for constraint in ctx.spec.constraints() {
            let stem = constraint.column.replace(' ', "_");
            let placeholders: Vec<String> = constraint
                .allowed_values
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    let name = format!("{stem}{index}");
                    let placeholder = format!("%({name})s");
                    parameters.push((name, value.clone()));
                    placeholder
                })
                .collect();
            clauses.push(format!(
                "{} IN ({})",
                quote(&constraint.column),
                placeholders.join(",")
            ));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if !dimensions.is_empty() {
            let group: Vec<String> = dimensions.iter().map(|name| quote(name)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&group.join(","));
        }
        Ok(Query { sql, parameters })
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn qualified_view(config: &ExtractorConfig) -> Result<String, QueryError> {
    let view = config.view.as_deref().ok_or(QueryError::MissingView)?;
    Ok(match config.schema.as_deref() {
        Some(schema) => format!("{}.{}", quote(schema), quote(view)),
        None => quote(view),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_model::{ColumnMetadata, Constraint, DataType};

    fn schema() -> MetadataSchema {
        MetadataSchema::new(
            "s",
            vec![
                ColumnMetadata::new("Region"),
                ColumnMetadata::new("Ship Mode"),
                ColumnMetadata::new("Sales").with_datatype(DataType::Double),
                ColumnMetadata::new("Profit Ratio")
                    .with_datatype(DataType::Double)
                    .with_formula("SUM([Profit])/SUM([Sales])"),
            ],
        )
        .expect("schema")
    }

    fn config() -> ExtractorConfig {
        ExtractorConfig::new().with_view("orders").with_schema("sales")
    }

    #[test]
    fn view_query_selects_everything() {
        let schema = schema();
        let spec = DatasetSpecification::builder("d")
            .with_dimensions(["Region"])
            .build(&schema)
            .expect("spec");
        let config = config();
        let ctx = QueryContext {
            config: &config,
            schema: &schema,
            spec: &spec,
        };
        let query = ViewQueryBuilder.build(&ctx).expect("query");
        assert_eq!(query.sql, r#"SELECT * FROM "sales"."orders""#);
        assert!(query.parameters.is_empty());
    }

    #[test]
    fn subset_query_aggregates_and_filters() {
        let schema = schema();
        let spec = DatasetSpecification::builder("d")
            .with_dimensions(["Region", "Ship Mode"])
            .with_measures(["Sales", "Profit Ratio"])
            .with_constraint(Constraint::new("Ship Mode", ["First Class", "Same Day"]))
            .build(&schema)
            .expect("spec");
        let config = config();
        let ctx = QueryContext {
            config: &config,
            schema: &schema,
            spec: &spec,
        };
        let query = SubsetQueryBuilder.build(&ctx).expect("query");
        assert_eq!(
            query.sql,
            concat!(
                r#"SELECT "Region","Ship Mode",SUM("Sales") AS "Sales" FROM "sales"."orders""#,
                r#" WHERE "Ship Mode" IN (%(Ship_Mode0)s,%(Ship_Mode1)s)"#,
                r#" GROUP BY "Region","Ship Mode""#
            )
        );
        assert_eq!(query.parameter("Ship_Mode1"), Some("Same Day"));
    }

    #[test]
    fn missing_view_is_an_error() {
        let schema = schema();
        let spec = DatasetSpecification::builder("d")
            .with_dimensions(["Region"])
            .build(&schema)
            .expect("spec");
        let config = ExtractorConfig::new();
        let ctx = QueryContext {
            config: &config,
            schema: &schema,
            spec: &spec,
        };
        assert_eq!(SubsetQueryBuilder.build(&ctx), Err(QueryError::MissingView));
    }
}
