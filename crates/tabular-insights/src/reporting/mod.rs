//! Report envelopes for analysis results.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabular_insights::reporting::AnalysisReport;
//!
//! let started = std::time::Instant::now();
//! let result = pipeline.analyze(&df)?;
//! let report = AnalysisReport::new("data/sales.csv", started.elapsed(), result);
//! report.write_to_file(std::path::Path::new("out/sales_report.json"))?;
//! ```

mod report;

pub use report::AnalysisReport;
