//! Progress reporting and cancellation for the analysis pipeline.
//!
//! A [`CancellationToken`] can be cancelled from any thread; analyzers poll it
//! between columns. Progress updates are pushed to a [`ProgressReporter`],
//! one per stage plus one per finished analyzer.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabular_insights::{AnalysisPipeline, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let result = AnalysisPipeline::builder()
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .analyze(&df);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Initializing,
    /// Validating the dataset and classifying columns
    SchemaInference,
    /// The five analyzers, possibly in parallel
    Analysis,
    InsightSynthesis,
    Complete,
    Cancelled,
    Failed,
}

impl AnalysisStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::SchemaInference => "Inferring Schema",
            Self::Analysis => "Analyzing Columns",
            Self::InsightSynthesis => "Synthesizing Insights",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run spent in this stage. Terminal stages weigh 0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.05,
            Self::SchemaInference => 0.10,
            Self::Analysis => 0.75,
            Self::InsightSynthesis => 0.10,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Overall progress when this stage starts.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::SchemaInference => 0.05,
            Self::Analysis => 0.15,
            Self::InsightSynthesis => 0.90,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: AnalysisStage,

    /// Finer-grained label, e.g. the analyzer that just finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    fn at(stage: AnalysisStage, stage_progress: f32, message: String) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            sub_stage: None,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message,
            items_processed: None,
            items_total: None,
        }
    }

    pub fn new(stage: AnalysisStage, stage_progress: f32, message: impl Into<String>) -> Self {
        Self::at(stage, stage_progress, message.into())
    }

    pub fn with_sub_stage(
        stage: AnalysisStage,
        sub_stage: impl Into<String>,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::at(stage, stage_progress, message.into())
        }
    }

    /// Update counting finished items, e.g. "3 of 5 analyzers".
    pub fn with_items(
        stage: AnalysisStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            sub_stage: Some(sub_stage.into()),
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::at(stage, stage_progress, message.into())
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::at(AnalysisStage::Complete, 1.0, message.into())
    }

    pub fn cancelled() -> Self {
        Self::at(
            AnalysisStage::Cancelled,
            0.0,
            "Analysis cancelled by caller".to_string(),
        )
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::at(AnalysisStage::Failed, 0.0, message.into())
    }
}

/// Receives progress updates from the pipeline.
///
/// Updates are sent from the thread running the pipeline, which is not
/// necessarily the caller's thread, so implementations must be `Send + Sync`.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Shared flag for cancelling a run from another thread.
///
/// Clones share state. A cancelled run returns
/// [`AnalysisError::Cancelled`](crate::error::AnalysisError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

// Tokens and updates cross into analyzer threads
static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can drive another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
