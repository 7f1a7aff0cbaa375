//! IQR fence outlier detection with a z-score cross-check.

use polars::prelude::*;

use super::{AnalysisContext, Analyzer, AnalyzerOutput, column_series};
use crate::config::AnalysisConfig;
use crate::error::ColumnComputationError;
use crate::types::{AnalyzerKind, OutlierProfile, OutliersProfile, Schema};
use crate::utils::{finite_values, mean, quantile_sorted, sample_variance, sorted_copy};

/// Fence multiplier applied to the IQR.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Flags values outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]` in numeric columns.
#[derive(Debug, Clone)]
pub struct OutlierDetector {
    zscore_threshold: f64,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl OutlierDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            zscore_threshold: config.zscore_threshold,
        }
    }

    /// Profile of one column, or `None` when it has no values.
    pub fn profile_column(
        &self,
        column: &str,
        series: &Series,
    ) -> Result<Option<OutlierProfile>, ColumnComputationError> {
        let values = finite_values(column, series)?;
        if values.is_empty() {
            return Ok(None);
        }

        let sorted = sorted_copy(&values);
        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let lower_bound = q1 - IQR_MULTIPLIER * iqr;
        let upper_bound = q3 + IQR_MULTIPLIER * iqr;

        let outlier_count = values
            .iter()
            .filter(|v| **v < lower_bound || **v > upper_bound)
            .count();

        Ok(Some(OutlierProfile {
            q1,
            q3,
            iqr,
            lower_bound,
            upper_bound,
            outlier_count,
            outlier_percentage: outlier_count as f64 * 100.0 / values.len() as f64,
            has_outliers: outlier_count > 0,
            zscore_anomaly_count: self.zscore_anomalies(&values),
        }))
    }

    fn zscore_anomalies(&self, values: &[f64]) -> usize {
        let std = sample_variance(values).sqrt();
        if std == 0.0 {
            return 0;
        }
        let mean = mean(values);
        values
            .iter()
            .filter(|v| ((**v - mean) / std).abs() > self.zscore_threshold)
            .count()
    }
}

impl Analyzer for OutlierDetector {
    type Profile = OutliersProfile;

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Outliers
    }

    fn analyze(
        &self,
        df: &DataFrame,
        schema: &Schema,
        ctx: &AnalysisContext,
    ) -> AnalyzerOutput<OutliersProfile> {
        let mut output = AnalyzerOutput::new(OutliersProfile::new());

        for column in &schema.numeric_columns {
            if ctx.should_stop() {
                output.interrupted = true;
                break;
            }
            match column_series(df, column).and_then(|series| self.profile_column(column, series)) {
                Ok(Some(profile)) => {
                    output.profile.insert(column.clone(), profile);
                }
                Ok(None) => {}
                Err(e) => output.skip_column(self.kind(), e),
            }
        }

        output
    }
}
