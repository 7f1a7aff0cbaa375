//! The analysis pipeline and its builder.

use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::fan_out::{AnalyzerSet, SharedAnalyzer};
use super::progress::{
    AnalysisStage, CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::analyzers::{
    AnalysisContext, CorrelationAnalyzer, DescriptiveStatisticsCalculator, DistributionAnalyzer,
    MissingDataAnalyzer, OutlierDetector,
};
use crate::config::{AnalysisConfig, ConfigValidationError};
use crate::error::{AnalysisError, Result};
use crate::insights::{InsightSources, InsightSynthesizer};
use crate::profiler::SchemaInferencer;
use crate::types::{
    AnalysisResult, AnalyzerKind, CorrelationProfile, DescriptiveProfile, DistributionsProfile,
    MissingnessProfile, OutliersProfile,
};

/// Runs schema inference, the five analyzers and insight synthesis.
///
/// Use [`AnalysisPipeline::builder()`] to create one. A pipeline holds no
/// per-run state and can analyze any number of datasets, including from
/// several threads at once.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_insights::{AnalysisConfig, AnalysisPipeline};
///
/// let pipeline = AnalysisPipeline::builder()
///     .config(AnalysisConfig::builder().timeout_ms(30_000).build()?)
///     .build()?;
///
/// let result = pipeline.analyze(&df)?;
/// for insight in &result.insights {
///     println!("{}. {}", insight.rank, insight.message);
/// }
/// ```
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
    inferencer: SchemaInferencer,
    analyzers: AnalyzerSet,
    synthesizer: InsightSynthesizer,
}

static_assertions::assert_impl_all!(AnalysisPipeline: Send, Sync);

impl AnalysisPipeline {
    pub fn builder() -> AnalysisPipelineBuilder {
        AnalysisPipelineBuilder::default()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a dataset.
    ///
    /// The dataset is never modified. When the time budget runs out the result
    /// is partial and lists the unfinished analyzers in
    /// [`AnalysisResult::incomplete_analyzers`].
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Input`] when the dataset is empty or malformed
    /// - [`AnalysisError::Cancelled`] when the cancellation token fired
    pub fn analyze(&self, df: &DataFrame) -> Result<AnalysisResult> {
        match self.analyze_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(if result.is_complete() {
                    "Analysis completed"
                } else {
                    "Analysis completed with partial results"
                }));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Analysis error: {}", e);
                Err(e)
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn analyze_internal(&self, df: &DataFrame) -> Result<AnalysisResult> {
        let start_time = Instant::now();
        info!(
            "Starting analysis of {} rows x {} columns",
            df.height(),
            df.width()
        );
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Initializing,
            0.0,
            "Starting analysis...",
        ));
        self.check_cancelled()?;

        // ===== Schema inference =====
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::SchemaInference,
            0.0,
            "Inferring column kinds...",
        ));
        let schema = self.inferencer.infer(df)?;
        let dataset_info = self.inferencer.dataset_info(df);
        let column_info = self.inferencer.column_info(df, &schema);
        let counts = &schema.summary;
        info!(
            "Schema: {} numeric, {} categorical, {} datetime, {} text, {} boolean",
            counts.numeric, counts.categorical, counts.datetime, counts.text, counts.boolean
        );
        self.check_cancelled()?;

        // ===== Analyzers =====
        let total = AnalyzerKind::ALL.len();
        self.report_progress(ProgressUpdate::with_items(
            AnalysisStage::Analysis,
            "analyzers",
            0,
            total,
            "Running analyzers...",
        ));
        let deadline = self.config.timeout().map(|budget| Instant::now() + budget);
        let ctx = AnalysisContext::new(self.cancellation_token.clone(), deadline);
        let on_finish = |kind: AnalyzerKind, done: usize| {
            self.report_progress(ProgressUpdate::with_items(
                AnalysisStage::Analysis,
                kind.display_name(),
                done,
                total,
                format!("{} finished", kind.display_name()),
            ));
        };

        let mut collected = if self.config.parallel {
            self.analyzers.run_parallel(
                Arc::new(df.clone()),
                Arc::new(schema.clone()),
                &ctx,
                on_finish,
            )
        } else {
            self.analyzers.run_sequential(df, &schema, &ctx, on_finish)
        };
        self.check_cancelled()?;

        if !collected.incomplete.is_empty() {
            warn!(
                "Returning partial results; incomplete analyzers: {:?}",
                collected.incomplete
            );
        }

        // ===== Insights =====
        let incomplete: Vec<AnalyzerKind> = collected.incomplete.iter().copied().collect();
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::InsightSynthesis,
            0.0,
            "Synthesizing insights...",
        ));
        let insights = self.synthesizer.synthesize(&InsightSources {
            dataset_info: &dataset_info,
            schema: &schema,
            descriptive: &collected.descriptive,
            correlations: &collected.correlations,
            distributions: &collected.distributions,
            missing: &collected.missing,
            outliers: &collected.outliers,
            incomplete: &incomplete,
        });

        let column_issues = collected.sorted_issues();
        info!(
            "Analysis finished in {:?}: {} insights, {} skipped columns",
            start_time.elapsed(),
            insights.len(),
            column_issues.len()
        );

        Ok(AnalysisResult {
            dataset_info,
            schema,
            column_info,
            descriptive_stats: collected.descriptive,
            correlations: collected.correlations,
            distributions: collected.distributions,
            missing_data: collected.missing,
            outliers: collected.outliers,
            insights,
            column_issues,
            incomplete_analyzers: incomplete,
        })
    }
}

/// Builder for [`AnalysisPipeline`].
///
/// Analyzers not supplied explicitly are constructed from the configuration.
#[derive(Default)]
pub struct AnalysisPipelineBuilder {
    config: Option<AnalysisConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
    descriptive: Option<SharedAnalyzer<DescriptiveProfile>>,
    correlation: Option<SharedAnalyzer<CorrelationProfile>>,
    distribution: Option<SharedAnalyzer<DistributionsProfile>>,
    missing: Option<SharedAnalyzer<MissingnessProfile>>,
    outliers: Option<SharedAnalyzer<OutliersProfile>>,
}

static_assertions::assert_impl_all!(AnalysisPipelineBuilder: Send);

impl AnalysisPipelineBuilder {
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// Shorthand for [`progress_reporter`](Self::progress_reporter) with a
    /// [`ClosureProgressReporter`].
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a token that aborts the run with [`AnalysisError::Cancelled`].
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn descriptive_analyzer(mut self, analyzer: SharedAnalyzer<DescriptiveProfile>) -> Self {
        self.descriptive = Some(analyzer);
        self
    }

    pub fn correlation_analyzer(mut self, analyzer: SharedAnalyzer<CorrelationProfile>) -> Self {
        self.correlation = Some(analyzer);
        self
    }

    pub fn distribution_analyzer(
        mut self,
        analyzer: SharedAnalyzer<DistributionsProfile>,
    ) -> Self {
        self.distribution = Some(analyzer);
        self
    }

    pub fn missing_data_analyzer(mut self, analyzer: SharedAnalyzer<MissingnessProfile>) -> Self {
        self.missing = Some(analyzer);
        self
    }

    pub fn outlier_detector(mut self, analyzer: SharedAnalyzer<OutliersProfile>) -> Self {
        self.outliers = Some(analyzer);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<AnalysisPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let analyzers = AnalyzerSet {
            descriptive: self
                .descriptive
                .unwrap_or_else(|| Arc::new(DescriptiveStatisticsCalculator::new(&config))),
            correlation: self
                .correlation
                .unwrap_or_else(|| Arc::new(CorrelationAnalyzer::new())),
            distribution: self
                .distribution
                .unwrap_or_else(|| Arc::new(DistributionAnalyzer::new(&config))),
            missing: self
                .missing
                .unwrap_or_else(|| Arc::new(MissingDataAnalyzer::new())),
            outliers: self
                .outliers
                .unwrap_or_else(|| Arc::new(OutlierDetector::new(&config))),
        };

        Ok(AnalysisPipeline {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            inferencer: SchemaInferencer::new(),
            analyzers,
            synthesizer: InsightSynthesizer::new(),
        })
    }
}
