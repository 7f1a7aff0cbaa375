use polars::prelude::*;

use super::{AnalysisContext, Analyzer, AnalyzerOutput};
use crate::types::{AnalyzerKind, ColumnMissingness, MissingSummary, MissingnessProfile, Schema};
use crate::utils::missing_count;

/// Counts missing entries per column and across the dataset.
///
/// Unlike the other analyzers this one covers every column regardless of kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingDataAnalyzer;

impl MissingDataAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl Analyzer for MissingDataAnalyzer {
    type Profile = MissingnessProfile;

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::MissingData
    }

    fn analyze(
        &self,
        df: &DataFrame,
        _schema: &Schema,
        ctx: &AnalysisContext,
    ) -> AnalyzerOutput<MissingnessProfile> {
        let mut output = AnalyzerOutput::new(MissingnessProfile::default());
        let rows = df.height();
        let mut total_missing = 0;

        for column in df.get_columns() {
            if ctx.should_stop() {
                output.interrupted = true;
                return output;
            }
            let missing = missing_count(column.as_materialized_series());
            total_missing += missing;
            output.profile.columns.insert(
                column.name().to_string(),
                ColumnMissingness {
                    missing_count: missing,
                    missing_percentage: percentage(missing, rows),
                    has_missing: missing > 0,
                },
            );
        }

        let total_cells = rows * df.width();
        output.profile.summary = Some(MissingSummary {
            total_missing_values: total_missing,
            total_cells,
            overall_missing_percentage: percentage(total_missing, total_cells),
            columns_with_missing: output
                .profile
                .columns
                .values()
                .filter(|c| c.has_missing)
                .count(),
        });
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::SchemaInferencer;
    use pretty_assertions::assert_eq;

    fn run(df: &DataFrame) -> MissingnessProfile {
        let schema = SchemaInferencer::new().infer(df).unwrap();
        MissingDataAnalyzer::new()
            .analyze(df, &schema, &AnalysisContext::default())
            .profile
    }

    #[test]
    fn test_fifteen_percent_missing() {
        let values: Vec<Option<f64>> = (0..100)
            .map(|i| if i < 15 { None } else { Some(i as f64) })
            .collect();
        let df = df!["x" => values, "y" => vec![1i64; 100]].unwrap();

        let profile = run(&df);

        assert_eq!(
            profile.columns["x"],
            ColumnMissingness {
                missing_count: 15,
                missing_percentage: 15.0,
                has_missing: true,
            }
        );
        assert!(!profile.columns["y"].has_missing);
        assert_eq!(
            profile.summary,
            Some(MissingSummary {
                total_missing_values: 15,
                total_cells: 200,
                overall_missing_percentage: 7.5,
                columns_with_missing: 1,
            })
        );
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let df = df!["x" => [1.0, f64::NAN, 3.0, 4.0]].unwrap();
        let profile = run(&df);
        assert_eq!(profile.columns["x"].missing_count, 1);
        assert_eq!(profile.columns["x"].missing_percentage, 25.0);
    }

    #[test]
    fn test_covers_every_column_kind() {
        let df = df![
            "n" => [Some(1), None],
            "s" => [None, Some("a")],
            "b" => [Some(true), None],
        ]
        .unwrap();
        let profile = run(&df);
        let summary = profile.summary.unwrap();
        assert_eq!(profile.columns.len(), 3);
        assert_eq!(summary.columns_with_missing, 3);
        assert_eq!(summary.overall_missing_percentage, 50.0);
    }

    #[test]
    fn test_zero_rows_has_zero_percentages() {
        let df = df!["x" => Vec::<f64>::new()].unwrap();
        let profile = run(&df);
        assert_eq!(profile.columns["x"].missing_percentage, 0.0);
        let summary = profile.summary.unwrap();
        assert_eq!(summary.total_cells, 0);
        assert_eq!(summary.overall_missing_percentage, 0.0);
    }

    #[test]
    fn test_interrupted_run_has_no_summary() {
        let df = df!["x" => [Some(1.0), None], "y" => [None::<f64>, None]].unwrap();
        let schema = SchemaInferencer::new().infer(&df).unwrap();
        let token = crate::pipeline::CancellationToken::new();
        token.cancel();

        let output = MissingDataAnalyzer::new().analyze(
            &df,
            &schema,
            &AnalysisContext::new(token, None),
        );

        assert!(output.interrupted);
        assert_eq!(output.profile.summary, None);
    }
}
