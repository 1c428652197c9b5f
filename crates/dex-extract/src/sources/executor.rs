//! Adapter for injected query executors.

use std::error::Error;

use dex_model::Row;

use crate::error::SourceError;
use crate::query::Query;
use crate::source::{FetchRequest, RowSource};

/// Runs the built query through a caller-supplied executor, typically a
/// database client the caller owns.
pub struct QueryRowSource<F> {
    name: String,
    execute: F,
}

impl<F, E> QueryRowSource<F>
where
    F: Fn(&Query) -> Result<Vec<Row>, E>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    pub fn new(name: impl Into<String>, execute: F) -> Self {
        Self {
            name: name.into(),
            execute,
        }
    }
}

impl<F, E> RowSource for QueryRowSource<F>
where
    F: Fn(&Query) -> Result<Vec<Row>, E>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<Row>, SourceError> {
        let query = request.query.ok_or(SourceError::MissingQuery)?;
        (self.execute)(query).map_err(|err| SourceError::Executor(err.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn passes_query_and_wraps_errors() {
        let source = QueryRowSource::new("warehouse", |query: &Query| {
            if query.sql.contains("broken") {
                Err(io::Error::other("connection refused"))
            } else {
                Ok(vec![Row::new().with("sql", query.sql.as_str())])
            }
        });

        let ok = Query::new("SELECT 1");
        let rows = source
            .fetch(&FetchRequest {
                query: Some(&ok),
                file_path: None,
            })
            .unwrap();
        assert_eq!(rows.len(), 1);

        let broken = Query::new("SELECT broken");
        let err = source
            .fetch(&FetchRequest {
                query: Some(&broken),
                file_path: None,
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "query execution failed: connection refused"
        );

        let err = source.fetch(&FetchRequest::default()).unwrap_err();
        assert!(matches!(err, SourceError::MissingQuery));
    }
}
