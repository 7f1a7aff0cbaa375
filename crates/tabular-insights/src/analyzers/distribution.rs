//! Normality testing and shape classification for numeric columns.

use normality::shapiro_wilk;
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use super::{AnalysisContext, Analyzer, AnalyzerOutput, column_series};
use crate::config::{AnalysisConfig, MAX_NORMALITY_SAMPLE};
use crate::error::ColumnComputationError;
use crate::types::{
    AnalyzerKind, DistributionProfile, DistributionShape, DistributionsProfile, NormalityTest,
    Schema,
};
use crate::utils::{finite_values, kurtosis, sample_variance, skewness, sturges_bins};

const NORMALITY_ALPHA: f64 = 0.05;
const NORMALITY_METHOD: &str = "shapiro_wilk";

/// Label a distribution by its skewness and excess kurtosis.
///
/// The first matching rule wins.
pub fn classify_shape(skew: f64, kurt: f64) -> DistributionShape {
    if skew.abs() < 0.5 && kurt.abs() < 0.5 {
        DistributionShape::Normal
    } else if skew > 1.0 {
        DistributionShape::RightSkewed
    } else if skew < -1.0 {
        DistributionShape::LeftSkewed
    } else if kurt > 3.0 {
        DistributionShape::HeavyTailed
    } else if kurt < -1.0 {
        DistributionShape::LightTailed
    } else {
        DistributionShape::Unknown
    }
}

/// Runs Shapiro-Wilk on each numeric column with enough values.
#[derive(Debug, Clone)]
pub struct DistributionAnalyzer {
    sample_size: usize,
    min_values: usize,
    seed: u64,
}

impl Default for DistributionAnalyzer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl DistributionAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            sample_size: config.normality_sample_size.min(MAX_NORMALITY_SAMPLE),
            min_values: config.min_distribution_values,
            seed: config.sample_seed,
        }
    }

    /// Reproducible subsample of at most `sample_size` values.
    fn sample(&self, values: &[f64]) -> Vec<f64> {
        if values.len() <= self.sample_size {
            return values.to_vec();
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        values
            .choose_multiple(&mut rng, self.sample_size)
            .copied()
            .collect()
    }

    /// Profile of one column, or `None` when it has too few values.
    pub fn profile_column(
        &self,
        column: &str,
        series: &Series,
    ) -> Result<Option<DistributionProfile>, ColumnComputationError> {
        let values = finite_values(column, series)?;
        if values.len() <= self.min_values {
            return Ok(None);
        }
        if sample_variance(&values) == 0.0 {
            return Err(ColumnComputationError::DegenerateVariance(column.to_string()));
        }

        let sample = self.sample(&values);
        let sample_size = sample.len();
        let result = shapiro_wilk(sample).map_err(|e| ColumnComputationError::NormalityTest {
            column: column.to_string(),
            reason: e.to_string(),
        })?;

        let skew = skewness(&values);
        let kurt = kurtosis(&values);

        Ok(Some(DistributionProfile {
            normality_test: NormalityTest {
                method: NORMALITY_METHOD.to_string(),
                statistic: result.statistic,
                p_value: result.p_value,
                is_normal: result.p_value > NORMALITY_ALPHA,
                sample_size,
            },
            histogram_bins: sturges_bins(values.len()),
            distribution_type: classify_shape(skew, kurt),
            skewness: skew,
            kurtosis: kurt,
        }))
    }
}

impl Analyzer for DistributionAnalyzer {
    type Profile = DistributionsProfile;

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Distribution
    }

    fn analyze(
        &self,
        df: &DataFrame,
        schema: &Schema,
        ctx: &AnalysisContext,
    ) -> AnalyzerOutput<DistributionsProfile> {
        let mut output = AnalyzerOutput::new(DistributionsProfile::new());

        for column in &schema.numeric_columns {
            if ctx.should_stop() {
                output.interrupted = true;
                break;
            }
            match column_series(df, column).and_then(|series| self.profile_column(column, series)) {
                Ok(Some(profile)) => {
                    output.profile.insert(column.clone(), profile);
                }
                Ok(None) => debug!("{}: too few values for a distribution profile", column),
                Err(e) => output.skip_column(self.kind(), e),
            }
        }

        output
    }
}
