use thiserror::Error;

/// Validation options that cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("a segmentation column, e.g. a year, must be given to detect anomalies")]
    MissingSegmentation,

    #[error("segmentation column '{column}' is not in the metadata schema")]
    UnknownSegmentation { column: String },
}
