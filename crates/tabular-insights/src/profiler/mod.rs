//! Dataset validation, schema inference and the per-column overview.
//!
//! [`SchemaInferencer`] is the only fatal stage of the pipeline: a dataset it
//! rejects never reaches the analyzers.

mod type_inference;

use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::{AnalysisError, InputError, Result};
use crate::types::{ColumnInfo, ColumnKind, DatasetInfo, Schema, SchemaColumn};
use crate::utils::{
    distinct_non_null, finite_values, is_numeric_dtype, mean, missing_count, round_to,
    sample_variance, value_frequencies,
};

pub(crate) use type_inference::infer_column_kind;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Classifies every column of a dataset into a [`ColumnKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaInferencer;

impl SchemaInferencer {
    pub fn new() -> Self {
        Self
    }

    /// Reject datasets the analyzers cannot work with.
    pub fn validate(&self, df: &DataFrame) -> std::result::Result<(), InputError> {
        if df.width() == 0 {
            return Err(InputError::EmptyDataset);
        }

        let expected = df.height();
        let mut seen = HashSet::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            if !seen.insert(name) {
                return Err(InputError::DuplicateColumn(name.to_string()));
            }
            if column.len() != expected {
                return Err(InputError::RaggedColumns {
                    column: name.to_string(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(())
    }

    /// Validate the dataset and classify each column.
    pub fn infer(&self, df: &DataFrame) -> Result<Schema> {
        self.validate(df)?;

        let row_count = df.height();
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let kind = infer_column_kind(series, row_count).map_err(|e| {
                AnalysisError::SchemaInferenceFailed(format!("column '{}': {}", column.name(), e))
            })?;
            debug!("  {}: {} -> {}", column.name(), series.dtype(), kind.as_str());
            columns.push(SchemaColumn {
                name: column.name().to_string(),
                kind,
                dtype: series.dtype().to_string(),
            });
        }

        Ok(Schema::from_columns(columns))
    }

    /// Shape and estimated memory footprint.
    pub fn dataset_info(&self, df: &DataFrame) -> DatasetInfo {
        DatasetInfo {
            rows: df.height(),
            columns: df.width(),
            size_mb: round_to(df.estimated_size() as f64 / BYTES_PER_MB, 2),
        }
    }

    /// Lightweight overview of every column.
    ///
    /// Columns whose summary cannot be computed keep their counts and simply
    /// lack the optional fields.
    pub fn column_info(&self, df: &DataFrame, schema: &Schema) -> BTreeMap<String, ColumnInfo> {
        let mut info = BTreeMap::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            let series = column.as_materialized_series();
            let kind = schema.kind_of(name).unwrap_or(ColumnKind::Categorical);
            info.insert(name.to_string(), Self::describe_column(name, series, kind));
        }
        info
    }

    fn describe_column(name: &str, series: &Series, kind: ColumnKind) -> ColumnInfo {
        let null_count = missing_count(series);
        let mut info = ColumnInfo {
            dtype: series.dtype().to_string(),
            kind,
            non_null_count: series.len().saturating_sub(null_count),
            null_count,
            unique_count: distinct_non_null(series).unwrap_or(0),
            memory_bytes: series.estimated_size(),
            min: None,
            max: None,
            mean: None,
            std: None,
            most_frequent: None,
            avg_length: None,
        };

        if is_numeric_dtype(series.dtype()) {
            if let Ok(values) = finite_values(name, series)
                && !values.is_empty()
            {
                info.min = values.iter().copied().reduce(f64::min);
                info.max = values.iter().copied().reduce(f64::max);
                info.mean = Some(mean(&values));
                info.std = Some(sample_variance(&values).sqrt());
            }
        } else if matches!(series.dtype(), DataType::String) {
            if let Ok(freqs) = value_frequencies(series) {
                info.most_frequent = freqs.first().map(|(value, _)| value.clone());
            }
            if let Ok(strings) = series.str() {
                let lengths: Vec<f64> = strings
                    .into_iter()
                    .flatten()
                    .map(|s| s.chars().count() as f64)
                    .collect();
                if !lengths.is_empty() {
                    info.avg_length = Some(mean(&lengths));
                }
            }
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Validation tests ====================

    #[test]
    fn test_empty_dataset_rejected() {
        let df = DataFrame::empty();
        let err = SchemaInferencer::new().infer(&df).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_DATASET");
    }

    #[test]
    fn test_zero_rows_is_valid() {
        let df = df![
            "n" => Vec::<f64>::new(),
            "s" => Vec::<String>::new(),
        ]
        .unwrap();

        let schema = SchemaInferencer::new().infer(&df).unwrap();
        assert_eq!(schema.kind_of("n"), Some(ColumnKind::Numeric));
        assert_eq!(schema.kind_of("s"), Some(ColumnKind::Text));
    }

    // ==================== Inference tests ====================

    #[test]
    fn test_infer_mixed_schema() {
        let df = df![
            "age" => [31, 42, 25, 37, 29, 51],
            "score" => [1.5, 2.5, 3.5, 4.5, 5.5, 6.5],
            "city" => ["oslo", "rome", "oslo", "rome", "oslo", "rome"],
            "name" => ["a", "b", "c", "d", "e", "f"],
            "active" => [true, false, true, true, false, true],
        ]
        .unwrap();

        let schema = SchemaInferencer::new().infer(&df).unwrap();

        assert_eq!(schema.numeric_columns, vec!["age", "score"]);
        assert_eq!(schema.categorical_columns, vec!["city"]);
        assert_eq!(schema.text_columns, vec!["name"]);
        assert_eq!(schema.boolean_columns, vec!["active"]);
        assert_eq!(schema.summary.numeric, 2);
        assert_eq!(schema.columns[0].name, "age");
    }

    // ==================== Column info tests ====================

    #[test]
    fn test_column_info_numeric_and_string() {
        let df = df![
            "x" => [Some(1.0), Some(3.0), None],
            "s" => [Some("ab"), Some("abcd"), Some("ab")],
        ]
        .unwrap();
        let inferencer = SchemaInferencer::new();
        let schema = inferencer.infer(&df).unwrap();
        let info = inferencer.column_info(&df, &schema);

        let x = &info["x"];
        assert_eq!(x.null_count, 1);
        assert_eq!(x.non_null_count, 2);
        assert_eq!(x.min, Some(1.0));
        assert_eq!(x.max, Some(3.0));
        assert_eq!(x.mean, Some(2.0));

        let s = &info["s"];
        assert_eq!(s.unique_count, 2);
        assert_eq!(s.most_frequent.as_deref(), Some("ab"));
        assert!((s.avg_length.unwrap() - 8.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_dataset_info_shape() {
        let df = df!["a" => [1, 2, 3], "b" => ["x", "y", "z"]].unwrap();
        let info = SchemaInferencer::new().dataset_info(&df);
        assert_eq!(info.rows, 3);
        assert_eq!(info.columns, 2);
        assert!(info.size_mb >= 0.0);
    }
}
