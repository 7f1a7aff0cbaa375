//! Shared utilities for the analysis pipeline.
//!
//! This module contains dtype classification, value extraction from polars
//! series, and the moment/quantile arithmetic reused by several analyzers.

use polars::prelude::*;
use std::collections::HashMap;

use crate::error::ColumnComputationError;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a polars data type, before any value-based heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// Plain string type
    String,
    /// Everything else (categorical, time, nested, null...)
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is floating point, i.e. may hold NaN.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is a calendar date or timestamp.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Check if a DataType is boolean.
#[inline]
pub fn is_boolean_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Boolean)
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if is_boolean_dtype(dtype) {
        DtypeCategory::Boolean
    } else if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if matches!(dtype, DataType::String) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Series Extraction Utilities
// =============================================================================

/// Number of missing entries in a series: nulls, plus NaN for float columns.
pub fn missing_count(series: &Series) -> usize {
    let nulls = series.null_count();
    if !is_float_dtype(series.dtype()) {
        return nulls;
    }

    let nans = series
        .cast(&DataType::Float64)
        .ok()
        .and_then(|s| {
            s.f64()
                .ok()
                .map(|ca| ca.into_iter().flatten().filter(|v| v.is_nan()).count())
        })
        .unwrap_or(0);

    nulls + nans
}

/// Non-missing values of a numeric series as `f64`, in row order.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let float_series = series.cast(&DataType::Float64)?;
    let values = float_series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();
    Ok(values)
}

/// Like [`numeric_values`], but rejects infinite values.
///
/// An empty vector is returned as-is; callers decide whether an all-missing
/// column is an error or simply absent.
pub fn finite_values(column: &str, series: &Series) -> Result<Vec<f64>, ColumnComputationError> {
    let values =
        numeric_values(series).map_err(|e| ColumnComputationError::polars(column, e))?;
    if values.iter().any(|v| v.is_infinite()) {
        return Err(ColumnComputationError::NonFinite(column.to_string()));
    }
    Ok(values)
}

/// Values paired by row, `None` where the entry is missing.
pub fn optional_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    let values = float_series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Number of distinct non-null values.
pub fn distinct_non_null(series: &Series) -> PolarsResult<usize> {
    series.drop_nulls().n_unique()
}

/// Occurrence counts of the non-null values rendered as strings.
///
/// Sorted by descending count; equal counts keep first-seen order.
pub fn value_frequencies(series: &Series) -> PolarsResult<Vec<(String, usize)>> {
    let strings = series.cast(&DataType::String)?;
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in strings.str()?.into_iter().flatten() {
        match index.get(value) {
            Some(&position) => counts[position].1 += 1,
            None => {
                index.insert(value.to_string(), counts.len());
                counts.push((value.to_string(), 1));
            }
        }
    }

    // sort_by is stable, which preserves first-seen order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

// =============================================================================
// Numeric Summary Utilities
// =============================================================================

/// Sort a copy of the values ascending.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Linear-interpolation quantile over already sorted values.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (ddof = 1). Zero for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let mean = mean(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)
}

// Squared-deviation sums below this are rounding noise from a constant column.
const ZERO_DEVIATION: f64 = 1e-14;

fn central_sums(values: &[f64]) -> (f64, f64, f64) {
    let mean = mean(values);
    values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
        let d = v - mean;
        let d2 = d * d;
        (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
    })
}

/// Bias-corrected sample skewness (G1). Zero below three values or when the
/// values do not vary.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return 0.0;
    }
    let (m2, m3, _) = central_sums(values);
    if m2 < ZERO_DEVIATION {
        return 0.0;
    }
    (n * (n - 1.0).sqrt() / (n - 2.0)) * (m3 / m2.powf(1.5))
}

/// Bias-corrected sample excess kurtosis (G2). Zero below four values or when
/// the values do not vary.
pub fn kurtosis(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 4 {
        return 0.0;
    }
    let (m2, _, m4) = central_sums(values);
    if m2 < ZERO_DEVIATION {
        return 0.0;
    }
    let numerator = n * (n + 1.0) * (n - 1.0) * m4;
    let denominator = (n - 2.0) * (n - 3.0) * m2 * m2;
    let adjustment = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    numerator / denominator - adjustment
}

/// Smallest of the most frequent values in a sorted slice.
pub fn mode_sorted(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut start = 0;
    while start < sorted.len() {
        let value = sorted[start];
        let run = sorted[start..].iter().take_while(|v| **v == value).count();
        if best.is_none_or(|(_, count)| run > count) {
            best = Some((value, run));
        }
        start += run;
    }
    best.map(|(value, _)| value)
}

/// Histogram bin count by Sturges' rule, clamped to [5, 50].
pub fn sturges_bins(n: usize) -> usize {
    if n == 0 {
        return 5;
    }
    let bins = ((n as f64).log2() + 1.0).ceil() as usize;
    bins.clamp(5, 50)
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Render an integer with comma thousands separators.
pub fn format_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    // ==================== Dtype tests ====================

    #[test]
    fn test_dtype_categories() {
        assert_eq!(get_dtype_category(&DataType::Int32), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Float64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Boolean), DtypeCategory::Boolean);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
        assert_eq!(get_dtype_category(&DataType::Null), DtypeCategory::Other);
        assert_eq!(get_dtype_category(&DataType::Time), DtypeCategory::Other);
    }

    // ==================== Extraction tests ====================

    #[test]
    fn test_missing_count_includes_nan() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(missing_count(&series), 2);
    }

    #[test]
    fn test_missing_count_strings() {
        let series = Series::new("s".into(), &[Some("a"), None, Some("b")]);
        assert_eq!(missing_count(&series), 1);
    }

    #[test]
    fn test_numeric_values_skips_missing() {
        let series = Series::new("x".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(numeric_values(&series).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_finite_values_rejects_infinity() {
        let series = Series::new("x".into(), &[1.0, f64::INFINITY]);
        let err = finite_values("x", &series).unwrap_err();
        assert_eq!(err.error_code(), "NON_FINITE_VALUES");
    }

    #[test]
    fn test_value_frequencies_ties_keep_first_seen() {
        let series = Series::new("c".into(), &[Some("b"), Some("a"), None, Some("a"), Some("b"), Some("c")]);
        let freqs = value_frequencies(&series).unwrap();
        assert_eq!(
            freqs,
            vec![("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)]
        );
    }

    // ==================== Moment tests ====================

    #[test]
    fn test_basic_moments() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx(mean(&values), 3.0));
        assert!(approx(sample_variance(&values), 2.5));
        assert!(approx(sample_variance(&values).sqrt(), 1.5811));
        assert!(approx(skewness(&values), 0.0));
        assert!(approx(kurtosis(&values), -1.2));
    }

    #[test]
    fn test_skewness_right_tail() {
        // Matches pandas Series.skew()
        let values = [1.0, 2.0, 3.0, 10.0];
        assert!(approx(skewness(&values), 1.7636));
    }

    #[test]
    fn test_moments_small_samples() {
        assert_eq!(sample_variance(&[4.0]), 0.0);
        assert_eq!(skewness(&[1.0, 2.0]), 0.0);
        assert_eq!(kurtosis(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_moments_constant_values() {
        let values = [0.1; 8];
        assert_eq!(skewness(&values), 0.0);
        assert_eq!(kurtosis(&values), 0.0);
    }

    // ==================== Quantile tests ====================

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = sorted_copy(&[10.0, 12.0, 12.0, 13.0, 12.0, 11.0, 14.0, 200.0]);
        assert!(approx(quantile_sorted(&sorted, 0.25), 11.75));
        assert!(approx(quantile_sorted(&sorted, 0.75), 13.25));
        assert!(approx(quantile_sorted(&sorted, 0.5), 12.0));
    }

    #[test]
    fn test_mode_prefers_smallest() {
        assert_eq!(mode_sorted(&[1.0, 1.0, 2.0, 3.0, 3.0]), Some(1.0));
        assert_eq!(mode_sorted(&[1.0, 2.0, 2.0]), Some(2.0));
        assert_eq!(mode_sorted(&[]), None);
    }

    #[test]
    fn test_sturges_bins_clamped() {
        assert_eq!(sturges_bins(11), 5);
        assert_eq!(sturges_bins(100), 8);
        assert_eq!(sturges_bins(1 << 60), 50);
    }

    // ==================== Formatting tests ====================

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
    }
}
