//! Pairwise Pearson and Spearman correlation between numeric columns.

use polars::prelude::*;
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker, Statistics};
use std::collections::BTreeMap;

use super::{AnalysisContext, Analyzer, AnalyzerOutput, column_series};
use crate::error::ColumnComputationError;
use crate::types::{
    AnalyzerKind, CorrelationMatrix, CorrelationProfile, CorrelationStrength, Schema,
    StrongCorrelation,
};
use crate::utils::optional_values;

/// |r| above which a pair is reported at all.
pub const STRONG_CORRELATION_THRESHOLD: f64 = 0.7;
/// |r| above which a reported pair is labelled "strong" rather than "moderate".
pub const VERY_STRONG_CORRELATION_THRESHOLD: f64 = 0.8;

/// Builds correlation matrices over the numeric columns of a schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationAnalyzer;

impl CorrelationAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Pearson coefficient, `None` when undefined.
    pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }
        let sx = x.iter().std_dev();
        let sy = y.iter().std_dev();
        if !(sx > 0.0 && sy > 0.0) {
            return None;
        }
        let r = x.iter().covariance(y.iter()) / (sx * sy);
        r.is_finite().then(|| r.clamp(-1.0, 1.0))
    }

    /// Spearman coefficient: Pearson over average ranks.
    pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }
        let rx = Data::new(x.to_vec()).ranks(RankTieBreaker::Average);
        let ry = Data::new(y.to_vec()).ranks(RankTieBreaker::Average);
        Self::pearson(&rx, &ry)
    }

    fn strength(r: f64) -> CorrelationStrength {
        if r.abs() > VERY_STRONG_CORRELATION_THRESHOLD {
            CorrelationStrength::Strong
        } else {
            CorrelationStrength::Moderate
        }
    }
}

/// Rows where both columns have a value.
fn pairwise_complete(a: &[Option<f64>], b: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some((*x, *y)),
            _ => None,
        })
        .unzip()
}

fn set_symmetric(matrix: &mut CorrelationMatrix, a: &str, b: &str, value: Option<f64>) {
    matrix
        .entry(a.to_string())
        .or_default()
        .insert(b.to_string(), value);
    matrix
        .entry(b.to_string())
        .or_default()
        .insert(a.to_string(), value);
}

impl Analyzer for CorrelationAnalyzer {
    type Profile = CorrelationProfile;

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Correlation
    }

    fn analyze(
        &self,
        df: &DataFrame,
        schema: &Schema,
        ctx: &AnalysisContext,
    ) -> AnalyzerOutput<CorrelationProfile> {
        let mut output = AnalyzerOutput::new(CorrelationProfile::default());
        if schema.numeric_columns.len() < 2 {
            return output;
        }

        let mut columns: Vec<(&str, Vec<Option<f64>>)> = Vec::new();
        for name in &schema.numeric_columns {
            let values = column_series(df, name).and_then(|series| {
                let values =
                    optional_values(series).map_err(|e| ColumnComputationError::polars(name, e))?;
                if values.iter().flatten().any(|v| v.is_infinite()) {
                    return Err(ColumnComputationError::NonFinite(name.clone()));
                }
                Ok(values)
            });
            match values {
                Ok(values) => columns.push((name.as_str(), values)),
                Err(e) => output.skip_column(self.kind(), e),
            }
        }

        if columns.len() < 2 {
            return output;
        }

        let mut pearson: CorrelationMatrix = BTreeMap::new();
        let mut spearman: CorrelationMatrix = BTreeMap::new();
        let mut strong = Vec::new();

        for i in 0..columns.len() {
            if ctx.should_stop() {
                output.interrupted = true;
                break;
            }
            let (name_i, values_i) = &columns[i];
            set_symmetric(&mut pearson, name_i, name_i, Some(1.0));
            set_symmetric(&mut spearman, name_i, name_i, Some(1.0));

            for (name_j, values_j) in &columns[i + 1..] {
                let (x, y) = pairwise_complete(values_i, values_j);
                let r = Self::pearson(&x, &y);
                set_symmetric(&mut pearson, name_i, name_j, r);
                set_symmetric(&mut spearman, name_i, name_j, Self::spearman(&x, &y));

                if let Some(r) = r
                    && r.abs() > STRONG_CORRELATION_THRESHOLD
                {
                    strong.push(StrongCorrelation {
                        column1: name_i.to_string(),
                        column2: name_j.to_string(),
                        correlation: r,
                        strength: Self::strength(r),
                    });
                }
            }
        }

        output.profile = CorrelationProfile {
            pearson,
            spearman,
            strong_correlations: strong,
        };
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::SchemaInferencer;
    use std::collections::HashSet;

    fn run(df: &DataFrame) -> AnalyzerOutput<CorrelationProfile> {
        let schema = SchemaInferencer::new().infer(df).unwrap();
        CorrelationAnalyzer::new().analyze(df, &schema, &AnalysisContext::default())
    }

    // ==================== Coefficient tests ====================

    #[test]
    fn test_pearson_perfect_linear() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let r = CorrelationAnalyzer::pearson(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_constant_is_undefined() {
        let x = [1.0, 2.0, 3.0];
        let y = [5.0, 5.0, 5.0];
        assert_eq!(CorrelationAnalyzer::pearson(&x, &y), None);
    }

    #[test]
    fn test_spearman_monotonic_nonlinear() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 8.0, 27.0, 64.0, 125.0];
        let rho = CorrelationAnalyzer::spearman(&x, &y).unwrap();
        assert!((rho - 1.0).abs() < 1e-12);
        let r = CorrelationAnalyzer::pearson(&x, &y).unwrap();
        assert!(r < 1.0);
    }

    #[test]
    fn test_spearman_with_ties() {
        let x = [1.0, 2.0, 2.0, 3.0];
        let y = [1.0, 3.0, 2.0, 4.0];
        let rho = CorrelationAnalyzer::spearman(&x, &y).unwrap();
        assert!(rho > 0.9 && rho <= 1.0);
    }

    // ==================== Analyzer tests ====================

    #[test]
    fn test_fewer_than_two_numeric_columns_is_empty() {
        let df = df!["x" => [1.0, 2.0, 3.0], "c" => ["a", "a", "b"]].unwrap();
        let output = run(&df);
        assert!(output.profile.is_empty());
        assert!(output.profile.strong_correlations.is_empty());
    }

    #[test]
    fn test_matrix_symmetric_with_unit_diagonal() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => [2.0, 1.0, 4.0, 3.0, 6.0],
            "c" => [9.0, 7.0, 8.0, 2.0, 1.0],
        ]
        .unwrap();
        let profile = run(&df).profile;

        for a in ["a", "b", "c"] {
            assert_eq!(profile.pearson_between(a, a), Some(1.0));
            for b in ["a", "b", "c"] {
                assert_eq!(profile.pearson[a][b], profile.pearson[b][a]);
                assert_eq!(profile.spearman[a][b], profile.spearman[b][a]);
            }
        }
    }

    #[test]
    fn test_strong_pairs_unique_and_ordered() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "b" => [2.1, 3.9, 6.2, 8.1, 9.8, 12.2],
            "c" => [6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
            "d" => [3.0, 1.0, 4.0, 1.0, 5.0, 9.0],
        ]
        .unwrap();
        let profile = run(&df).profile;

        let mut seen = HashSet::new();
        for pair in &profile.strong_correlations {
            assert_ne!(pair.column1, pair.column2);
            let mut key = [pair.column1.clone(), pair.column2.clone()];
            key.sort();
            assert!(seen.insert(key), "duplicate pair");
            assert!(pair.correlation.abs() > STRONG_CORRELATION_THRESHOLD);
        }

        let first = &profile.strong_correlations[0];
        assert_eq!((first.column1.as_str(), first.column2.as_str()), ("a", "b"));
        assert_eq!(first.strength, CorrelationStrength::Strong);

        let negative = profile
            .strong_correlations
            .iter()
            .find(|p| p.column1 == "a" && p.column2 == "c")
            .unwrap();
        assert!(negative.correlation < 0.0);
    }

    #[test]
    fn test_pairwise_complete_observations() {
        let df = df![
            "a" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)],
            "b" => [Some(1.0), Some(2.0), Some(100.0), Some(4.0), Some(5.0)],
        ]
        .unwrap();
        let profile = run(&df).profile;
        let r = profile.pearson_between("a", "b").unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_yields_none() {
        let df = df![
            "a" => [1.0, 2.0, 3.0],
            "flat" => [4.0, 4.0, 4.0],
        ]
        .unwrap();
        let profile = run(&df).profile;
        assert_eq!(profile.pearson_between("a", "flat"), None);
        assert_eq!(profile.pearson_between("flat", "flat"), Some(1.0));
    }
}
