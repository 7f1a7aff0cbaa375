//! Natural-language insights derived from the analyzer profiles.
//!
//! [`InsightSynthesizer`] is a deterministic rule engine: identical profiles
//! always produce the same insights in the same order. Categories are emitted
//! in a fixed sequence (overview, statistical, quality, correlation,
//! distribution, outlier) and each insight's rank is its 1-based position in
//! that sequence. Sections fed by an analyzer that did not finish are left
//! out rather than read from an empty profile.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabular_insights::insights::{InsightSources, InsightSynthesizer};
//!
//! let insights = InsightSynthesizer::new().synthesize(&InsightSources {
//!     dataset_info: &info,
//!     schema: &schema,
//!     descriptive: &descriptive,
//!     correlations: &correlations,
//!     distributions: &distributions,
//!     missing: &missing,
//!     outliers: &outliers,
//!     incomplete: &[],
//! });
//! ```

mod synthesizer;

pub use synthesizer::{InsightSources, InsightSynthesizer};
