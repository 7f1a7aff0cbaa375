//! Column kind inference.

use polars::prelude::*;

use crate::types::ColumnKind;
use crate::utils::{DtypeCategory, distinct_non_null, get_dtype_category};

/// Unique-ratio ceiling for a string column to count as categorical.
pub(crate) const UNIQUE_RATIO_THRESHOLD: f64 = 0.5;
/// Distinct-value ceiling for the same rule.
pub(crate) const MAX_CATEGORIES: usize = 50;

/// Classify one column from its dtype, falling back to cardinality for strings.
///
/// `row_count` is the dataset height, so missing entries count towards the
/// denominator of the unique ratio.
pub(crate) fn infer_column_kind(series: &Series, row_count: usize) -> PolarsResult<ColumnKind> {
    let kind = match get_dtype_category(series.dtype()) {
        DtypeCategory::Datetime => ColumnKind::Datetime,
        DtypeCategory::Boolean => ColumnKind::Boolean,
        DtypeCategory::Numeric => ColumnKind::Numeric,
        DtypeCategory::String => {
            if row_count == 0 {
                return Ok(ColumnKind::Text);
            }
            let distinct = distinct_non_null(series)?;
            let unique_ratio = distinct as f64 / row_count as f64;
            if unique_ratio < UNIQUE_RATIO_THRESHOLD && distinct < MAX_CATEGORIES {
                ColumnKind::Categorical
            } else {
                ColumnKind::Text
            }
        }
        DtypeCategory::Other => ColumnKind::Categorical,
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_dtypes() {
        let ints = Series::new("a".into(), &[1i32, 2, 3]);
        let floats = Series::new("b".into(), &[1.5f64, 2.5]);
        assert_eq!(infer_column_kind(&ints, 3).unwrap(), ColumnKind::Numeric);
        assert_eq!(infer_column_kind(&floats, 2).unwrap(), ColumnKind::Numeric);
    }

    #[test]
    fn test_boolean_dtype() {
        let series = Series::new("flag".into(), &[true, false, true]);
        assert_eq!(infer_column_kind(&series, 3).unwrap(), ColumnKind::Boolean);
    }

    #[test]
    fn test_date_dtype() {
        let series = Series::new("d".into(), &[19000i32, 19001])
            .cast(&DataType::Date)
            .unwrap();
        assert_eq!(infer_column_kind(&series, 2).unwrap(), ColumnKind::Datetime);
    }

    #[test]
    fn test_low_cardinality_string_is_categorical() {
        let series = Series::new("city".into(), &["a", "b", "a", "b", "a", "b"]);
        assert_eq!(infer_column_kind(&series, 6).unwrap(), ColumnKind::Categorical);
    }

    #[test]
    fn test_high_ratio_string_is_text() {
        let series = Series::new("name".into(), &["ann", "bob", "cid", "dan"]);
        assert_eq!(infer_column_kind(&series, 4).unwrap(), ColumnKind::Text);
    }

    #[test]
    fn test_many_distinct_values_is_text() {
        // ratio 0.25 but 50 distinct values
        let values: Vec<String> = (0..200).map(|i| format!("v{}", i % 50)).collect();
        let series = Series::new("code".into(), values);
        assert_eq!(infer_column_kind(&series, 200).unwrap(), ColumnKind::Text);
    }

    #[test]
    fn test_nulls_count_towards_ratio() {
        // 2 distinct over 5 rows = 0.4
        let series = Series::new("c".into(), &[Some("x"), Some("y"), None, None, None]);
        assert_eq!(infer_column_kind(&series, 5).unwrap(), ColumnKind::Categorical);
    }

    #[test]
    fn test_empty_string_column_is_text() {
        let series = Series::new("s".into(), Vec::<String>::new());
        assert_eq!(infer_column_kind(&series, 0).unwrap(), ColumnKind::Text);
    }

    #[test]
    fn test_other_dtype_defaults_to_categorical() {
        let series = Series::new_null("nothing".into(), 3);
        assert_eq!(infer_column_kind(&series, 3).unwrap(), ColumnKind::Categorical);
    }
}
