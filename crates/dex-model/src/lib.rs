//! Definition-time model for metadata-driven dataset exports.
//!
//! Holds the metadata schema, dataset specifications, raw rows and the
//! canonical table renderers consume.

pub mod datatype;
pub mod error;
pub mod format;
pub mod metadata;
pub mod row;
pub mod specification;
pub mod table;
pub mod value;

pub use datatype::DataType;
pub use error::{ModelError, Result};
pub use format::OutputFormat;
pub use metadata::{ColumnMetadata, HierarchyLevel, MetadataSchema, Pattern, ValueRange};
pub use row::Row;
pub use specification::{Constraint, DatasetSpecification, SpecificationBuilder};
pub use table::{CanonicalTable, ColumnDescriptor, ColumnRole, DatasetIdentity, HierarchyPosition};
pub use value::{CoercionError, DATE_FORMAT, RawValue, Value};
