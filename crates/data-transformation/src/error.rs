//! Error types for the data transformation stage.
//!
//! Every failure inside the stage is a [`TransformationError`]. The
//! orchestrator wraps whatever surfaced with a context message before
//! handing it back, so callers see a single "transformation failure" kind
//! while the underlying cause stays reachable through
//! [`std::error::Error::source`].
//!
//! Errors are serializable so they can be emitted as structured JSON by
//! callers that need it.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Context attached by the orchestrator to every failure it returns.
pub const TRANSFORMATION_FAILURE: &str = "data transformation failed";

/// The main error type for the data transformation stage.
#[derive(Error, Debug)]
pub enum TransformationError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The configured target column is absent from a dataset.
    #[error("Target column '{column}' not found in {dataset} dataset")]
    TargetColumnMissing { column: String, dataset: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A column could not be represented as floating point values.
    #[error("Column '{column}' is not numeric: {reason}")]
    NotNumeric { column: String, reason: String },

    /// Two frames that should share a layout do not.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A persisted preprocessor could not be accepted.
    #[error("Invalid preprocessor artifact: {0}")]
    InvalidArtifact(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array shape error while assembling output matrices.
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TransformationError>,
    },
}

impl TransformationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TransformationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, independent of any context wrapping.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TargetColumnMissing { .. } => "TARGET_COLUMN_MISSING",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NotNumeric { .. } => "NOT_NUMERIC",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Self::InvalidArtifact(_) => "INVALID_ARTIFACT",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Shape(_) => "SHAPE_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True for errors returned by the orchestrator's outermost layer.
    pub fn is_transformation_failure(&self) -> bool {
        matches!(self, Self::WithContext { context, .. } if context == TRANSFORMATION_FAILURE)
    }

    /// The innermost error, with all context layers peeled off.
    pub fn root_cause(&self) -> &TransformationError {
        match self {
            Self::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for TransformationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TransformationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for transformation operations.
pub type Result<T> = std::result::Result<T, TransformationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TransformationError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TransformationError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            TransformationError::ColumnNotFound("age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            TransformationError::InvalidConfig("bad".to_string()).error_code(),
            "INVALID_CONFIG"
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = TransformationError::TargetColumnMissing {
            column: "smoker_status".to_string(),
            dataset: "train".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("TARGET_COLUMN_MISSING"));
        assert!(json.contains("smoker_status"));
    }

    #[test]
    fn test_with_context_preserves_code() {
        let error = TransformationError::ColumnNotFound("hemoglobin".to_string())
            .with_context("While transforming test features");
        assert!(error.to_string().contains("While transforming test features"));
        assert!(error.to_string().contains("hemoglobin"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
        assert!(!error.is_transformation_failure());
    }

    #[test]
    fn test_transformation_failure_marker() {
        let error = TransformationError::InvalidArtifact("empty".to_string())
            .with_context("Saving preprocessor")
            .with_context(TRANSFORMATION_FAILURE);

        assert!(error.is_transformation_failure());
        assert!(matches!(
            error.root_cause(),
            TransformationError::InvalidArtifact(_)
        ));
    }

    #[test]
    fn test_result_ext_on_io_error() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let error = result.context("Reading train.csv").unwrap_err();
        assert_eq!(error.error_code(), "IO_ERROR");
        assert!(error.to_string().starts_with("Reading train.csv"));
    }
}
