use std::path::PathBuf;

use thiserror::Error;

/// Definition-time errors raised while building schemas, specifications and
/// canonical tables.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The declarative document is malformed or violates a schema invariant.
    #[error("schema parse error: {message}")]
    SchemaParse { message: String },

    /// A column name was not found in the metadata schema.
    #[error("unknown column: {name}")]
    UnknownColumn { name: String },

    /// A canonical row does not line up with the column descriptors.
    #[error("row has {found} values but the table declares {expected} columns")]
    RowShape { expected: usize, found: usize },

    #[error("failed to access file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ModelError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::SchemaParse {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::UnknownColumn {
            name: "Region".to_string(),
        };
        assert_eq!(err.to_string(), "unknown column: Region");
    }
}
