//! Statistical analyzers.
//!
//! Each analyzer is a pure function of `(DataFrame, Schema)` that produces one
//! profile. Failures are scoped to a column: the column is left out, the
//! reason is logged and kept as a [`ColumnIssue`], and the analyzer moves on.
//!
//! Analyzers check the [`AnalysisContext`] between columns so a run that hit
//! its deadline or was cancelled stops promptly.

mod correlation;
mod descriptive;
mod distribution;
mod missing;
mod outliers;

pub use correlation::CorrelationAnalyzer;
pub use descriptive::DescriptiveStatisticsCalculator;
pub use distribution::DistributionAnalyzer;
pub use missing::MissingDataAnalyzer;
pub use outliers::OutlierDetector;

use polars::prelude::*;
use std::time::Instant;
use tracing::warn;

use crate::error::ColumnComputationError;
use crate::pipeline::CancellationToken;
use crate::types::{AnalyzerKind, ColumnIssue, Schema};

/// Trait implemented by the five statistical analyzers.
///
/// Implementations must be `Send + Sync` because the pipeline shares them
/// with worker threads.
pub trait Analyzer: Send + Sync {
    /// The profile this analyzer produces. `Default` is the empty profile.
    type Profile: Default + Send + 'static;

    fn kind(&self) -> AnalyzerKind;

    fn analyze(
        &self,
        df: &DataFrame,
        schema: &Schema,
        ctx: &AnalysisContext,
    ) -> AnalyzerOutput<Self::Profile>;
}

/// Stop conditions shared by every analyzer of one run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl AnalysisContext {
    pub fn new(cancellation: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            cancellation,
            deadline,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// True once the run was cancelled or ran past its deadline.
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.deadline_passed()
    }
}

/// A profile together with the columns that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzerOutput<P> {
    pub profile: P,
    pub issues: Vec<ColumnIssue>,
    /// Set when the analyzer stopped early; `profile` is then partial.
    pub interrupted: bool,
}

impl<P> AnalyzerOutput<P> {
    pub fn new(profile: P) -> Self {
        Self {
            profile,
            issues: Vec::new(),
            interrupted: false,
        }
    }

    /// Log a skipped column and keep it as an issue.
    pub(crate) fn skip_column(&mut self, analyzer: AnalyzerKind, error: ColumnComputationError) {
        warn!("{}: skipping column: {}", analyzer.display_name(), error);
        self.issues.push(ColumnIssue::from_error(analyzer, &error));
    }
}

/// Look up a column as a series, mapping a lookup failure to a column error.
pub(crate) fn column_series<'a>(
    df: &'a DataFrame,
    name: &str,
) -> Result<&'a Series, ColumnComputationError> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|e| ColumnComputationError::polars(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_context_default_never_stops() {
        let ctx = AnalysisContext::default();
        assert!(!ctx.should_stop());
    }

    #[test]
    fn test_context_stops_on_cancel() {
        let token = CancellationToken::new();
        let ctx = AnalysisContext::new(token.clone(), None);
        token.cancel();
        assert!(ctx.should_stop());
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_context_stops_after_deadline() {
        let past = Instant::now() - Duration::from_millis(5);
        let ctx = AnalysisContext::new(CancellationToken::new(), Some(past));
        assert!(ctx.deadline_passed());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_skip_column_records_issue() {
        let mut output: AnalyzerOutput<Vec<String>> = AnalyzerOutput::new(Vec::new());
        output.skip_column(
            AnalyzerKind::Outliers,
            ColumnComputationError::NonFinite("x".to_string()),
        );
        assert_eq!(output.issues.len(), 1);
        assert_eq!(output.issues[0].column, "x");
        assert_eq!(output.issues[0].code, "NON_FINITE_VALUES");
    }

    #[test]
    fn test_column_series_missing_column() {
        let df = df!["a" => [1, 2]].unwrap();
        let err = column_series(&df, "b").unwrap_err();
        assert_eq!(err.column(), "b");
    }
}
