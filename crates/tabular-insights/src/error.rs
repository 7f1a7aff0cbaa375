//! Custom error types for the analysis pipeline.
//!
//! Two failure classes exist. [`InputError`] means the dataset itself cannot be
//! analyzed and aborts the run. [`ColumnComputationError`] is scoped to one
//! column inside one analyzer: the column is left out of that profile, the
//! failure is logged and recorded as a [`ColumnIssue`](crate::types::ColumnIssue),
//! and the pipeline keeps going.
//!
//! Errors serialize as `{ "code": ..., "message": ... }` so callers can ship
//! them across process boundaries unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// Fatal problems with the dataset handed to the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The dataset has no columns.
    #[error("Dataset is empty: no columns to analyze")]
    EmptyDataset,

    /// Two columns share a name.
    #[error("Duplicate column name '{0}' in dataset")]
    DuplicateColumn(String),

    /// Columns disagree on their length.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },
}

impl InputError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::DuplicateColumn(_) => "DUPLICATE_COLUMN",
            Self::RaggedColumns { .. } => "RAGGED_COLUMNS",
        }
    }
}

/// A failure computing one statistic for one column.
#[derive(Error, Debug)]
pub enum ColumnComputationError {
    /// Column had no usable values after dropping missing entries.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// Column contains infinite values.
    #[error("Column '{0}' contains non-finite values")]
    NonFinite(String),

    /// All values are identical, so the statistic is undefined.
    #[error("Column '{0}' has zero variance")]
    DegenerateVariance(String),

    /// The column dtype cannot be rendered for this analysis.
    #[error("Unsupported dtype {dtype} in column '{column}'")]
    UnsupportedDtype { column: String, dtype: String },

    /// The normality test rejected the sample.
    #[error("Normality test failed for column '{column}': {reason}")]
    NormalityTest { column: String, reason: String },

    /// Polars failed while extracting the column.
    #[error("Polars error in column '{column}': {source}")]
    Polars {
        column: String,
        #[source]
        source: polars::error::PolarsError,
    },
}

impl ColumnComputationError {
    pub fn column(&self) -> &str {
        match self {
            Self::NoValidValues(column)
            | Self::NonFinite(column)
            | Self::DegenerateVariance(column) => column,
            Self::UnsupportedDtype { column, .. }
            | Self::NormalityTest { column, .. }
            | Self::Polars { column, .. } => column,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::NonFinite(_) => "NON_FINITE_VALUES",
            Self::DegenerateVariance(_) => "DEGENERATE_VARIANCE",
            Self::UnsupportedDtype { .. } => "UNSUPPORTED_DTYPE",
            Self::NormalityTest { .. } => "NORMALITY_TEST_FAILED",
            Self::Polars { .. } => "POLARS_ERROR",
        }
    }

    /// Wrap a polars error raised while processing `column`.
    pub fn polars(column: impl Into<String>, source: polars::error::PolarsError) -> Self {
        Self::Polars {
            column: column.into(),
            source,
        }
    }
}

/// The main error type for the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The dataset cannot be analyzed.
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// Pipeline was cancelled through its token.
    #[error("Analysis cancelled")]
    Cancelled,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// Schema inference failed.
    #[error("Failed to infer schema: {0}")]
    SchemaInferenceFailed(String),

    /// Internal error (e.g., worker thread failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for callers that branch on failure type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Input(inner) => inner.error_code(),
            Self::Cancelled => "CANCELLED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::SchemaInferenceFailed(_) => "SCHEMA_INFERENCE_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if retrying with a different input or config could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Cancelled | Self::InvalidConfig(_) | Self::Input(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

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
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}
