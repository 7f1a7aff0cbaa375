//! Descriptive statistics for numeric and categorical columns.

use polars::prelude::*;
use tracing::debug;

use super::{AnalysisContext, Analyzer, AnalyzerOutput, column_series};
use crate::config::AnalysisConfig;
use crate::error::ColumnComputationError;
use crate::types::{
    AnalyzerKind, CategoricalStatistics, ColumnStatistics, DescriptiveProfile, FrequencyEntry,
    NumericStatistics, Schema,
};
use crate::utils::{
    finite_values, kurtosis, mean, mode_sorted, quantile_sorted, sample_variance, skewness,
    sorted_copy, value_frequencies,
};

/// Computes [`ColumnStatistics`] for every numeric and categorical column.
#[derive(Debug, Clone)]
pub struct DescriptiveStatisticsCalculator {
    top_categories: usize,
}

impl Default for DescriptiveStatisticsCalculator {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl DescriptiveStatisticsCalculator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            top_categories: config.top_categories,
        }
    }

    /// Summary of a numeric column, or `None` when every value is missing.
    pub fn numeric_statistics(
        column: &str,
        series: &Series,
    ) -> Result<Option<NumericStatistics>, ColumnComputationError> {
        let values = finite_values(column, series)?;
        if values.is_empty() {
            return Ok(None);
        }

        let sorted = sorted_copy(&values);
        let count = values.len();
        let (var, skew, kurt) = if count > 1 {
            (sample_variance(&values), skewness(&values), kurtosis(&values))
        } else {
            (0.0, 0.0, 0.0)
        };
        let q25 = quantile_sorted(&sorted, 0.25);
        let q75 = quantile_sorted(&sorted, 0.75);

        Ok(Some(NumericStatistics {
            count,
            mean: mean(&values),
            median: quantile_sorted(&sorted, 0.5),
            mode: mode_sorted(&sorted).unwrap_or(sorted[0]),
            std: var.sqrt(),
            var,
            min: sorted[0],
            max: sorted[count - 1],
            q25,
            q75,
            iqr: q75 - q25,
            skewness: skew,
            kurtosis: kurt,
        }))
    }

    /// Summary of a categorical column, or `None` when every value is missing.
    pub fn categorical_statistics(
        &self,
        column: &str,
        series: &Series,
    ) -> Result<Option<CategoricalStatistics>, ColumnComputationError> {
        let freqs =
            value_frequencies(series).map_err(|_| ColumnComputationError::UnsupportedDtype {
                column: column.to_string(),
                dtype: series.dtype().to_string(),
            })?;

        let Some((most_frequent, most_frequent_count)) = freqs.first().cloned() else {
            return Ok(None);
        };

        Ok(Some(CategoricalStatistics {
            count: freqs.iter().map(|(_, c)| c).sum(),
            unique_count: freqs.len(),
            most_frequent,
            most_frequent_count,
            frequency_distribution: freqs
                .into_iter()
                .take(self.top_categories)
                .map(|(value, count)| FrequencyEntry { value, count })
                .collect(),
        }))
    }
}

impl Analyzer for DescriptiveStatisticsCalculator {
    type Profile = DescriptiveProfile;

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::DescriptiveStatistics
    }

    fn analyze(
        &self,
        df: &DataFrame,
        schema: &Schema,
        ctx: &AnalysisContext,
    ) -> AnalyzerOutput<DescriptiveProfile> {
        let mut output = AnalyzerOutput::new(DescriptiveProfile::new());

        for column in &schema.numeric_columns {
            if ctx.should_stop() {
                output.interrupted = true;
                return output;
            }
            let result = column_series(df, column)
                .and_then(|series| Self::numeric_statistics(column, series));
            match result {
                Ok(Some(stats)) => {
                    output
                        .profile
                        .insert(column.clone(), ColumnStatistics::Numeric(stats));
                }
                Ok(None) => debug!("{}: no values, omitted", column),
                Err(e) => output.skip_column(self.kind(), e),
            }
        }

        for column in &schema.categorical_columns {
            if ctx.should_stop() {
                output.interrupted = true;
                return output;
            }
            let result = column_series(df, column)
                .and_then(|series| self.categorical_statistics(column, series));
            match result {
                Ok(Some(stats)) => {
                    output
                        .profile
                        .insert(column.clone(), ColumnStatistics::Categorical(stats));
                }
                Ok(None) => debug!("{}: no values, omitted", column),
                Err(e) => output.skip_column(self.kind(), e),
            }
        }

        output
    }
}
