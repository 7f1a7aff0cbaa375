//! Pipeline module.
//!
//! [`AnalysisPipeline`] sequences schema inference, the five analyzers and
//! insight synthesis, with progress reporting and cancellation.

mod builder;
mod fan_out;
pub mod progress;

pub use builder::{AnalysisPipeline, AnalysisPipelineBuilder};
pub use fan_out::SharedAnalyzer;
pub use progress::{
    AnalysisStage, CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
