//! Tabular Insights Library
//!
//! Schema inference, statistical profiling and insight generation for
//! arbitrary tabular datasets, built on Polars.
//!
//! # Overview
//!
//! Given a [`DataFrame`](polars::prelude::DataFrame) of unknown shape, the
//! pipeline:
//!
//! - **Infers a schema**: each column becomes numeric, categorical, datetime,
//!   text or boolean
//! - **Runs five analyzers**: descriptive statistics, correlations, normality
//!   and shape, missing data, and outliers, in parallel by default
//! - **Synthesizes insights**: a ranked list of plain-language findings
//!
//! A failure on one column never aborts the run: the column is left out of the
//! affected profile and recorded in [`AnalysisResult::column_issues`]. Only an
//! unusable dataset is fatal.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabular_insights::{AnalysisConfig, AnalysisPipeline};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//!
//! let result = AnalysisPipeline::builder()
//!     .config(AnalysisConfig::builder().timeout_ms(30_000).build()?)
//!     .build()?
//!     .analyze(&df)?;
//!
//! for insight in &result.insights {
//!     println!("{}. {}", insight.rank, insight.message);
//! }
//! ```
//!
//! # Custom analyzers
//!
//! Every analyzer implements [`Analyzer`]. The builder accepts replacements,
//! which is how tests inject slow or failing analyzers:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! let pipeline = AnalysisPipeline::builder()
//!     .outlier_detector(Arc::new(MyOutlierDetector::default()))
//!     .build()?;
//! ```
//!
//! # Progress Reporting
//!
//! ```rust,ignore
//! use tabular_insights::{AnalysisPipeline, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let result = AnalysisPipeline::builder()
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .analyze(&df);
//!
//! match result {
//!     Ok(result) if !result.is_complete() => println!("Partial result"),
//!     Ok(_) => println!("Done"),
//!     Err(AnalysisError::Cancelled) => println!("Cancelled"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod analyzers;
pub mod config;
pub mod error;
pub mod insights;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analyzers::{
    AnalysisContext, Analyzer, AnalyzerOutput, CorrelationAnalyzer,
    DescriptiveStatisticsCalculator, DistributionAnalyzer, MissingDataAnalyzer, OutlierDetector,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ConfigValidationError};
pub use error::{
    AnalysisError, ColumnComputationError, InputError, Result as InsightsResult, ResultExt,
};
pub use insights::{InsightSources, InsightSynthesizer};
pub use pipeline::{
    AnalysisPipeline, AnalysisPipelineBuilder, AnalysisStage, CancellationToken,
    ClosureProgressReporter, ProgressReporter, ProgressUpdate, SharedAnalyzer,
};
pub use profiler::SchemaInferencer;
pub use reporting::AnalysisReport;
pub use types::{
    AnalysisResult, AnalyzerKind, CategoricalStatistics, ColumnInfo, ColumnIssue, ColumnKind,
    ColumnStatistics, CorrelationProfile, CorrelationStrength, DatasetInfo, DistributionProfile,
    DistributionShape, Insight, InsightCategory, MissingnessProfile, NumericStatistics,
    OutlierProfile, Schema, StrongCorrelation,
};
