//! Configuration types for the analysis pipeline.
//!
//! Only compute bounds and execution knobs live here. The decision thresholds
//! used by the analyzers and the insight rules (0.7/0.8 correlation strength,
//! 1.5·IQR fences, the distribution-shape table) are fixed constants in their
//! modules.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper limit accepted by the Shapiro-Wilk implementation.
pub const MAX_NORMALITY_SAMPLE: usize = 5000;

/// Configuration for the analysis pipeline.
///
/// Use [`AnalysisConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_insights::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .timeout_ms(30_000)
///     .parallel(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Run the five analyzers on separate worker threads.
    /// Default: true
    pub parallel: bool,

    /// Wall-clock budget for the analyzer fan-out, in milliseconds.
    /// Analyzers still running when it expires are reported as incomplete.
    /// Default: None (wait for all analyzers)
    pub timeout_ms: Option<u64>,

    /// Maximum number of values fed to the normality test.
    /// Default: 5000
    pub normality_sample_size: usize,

    /// A numeric column needs strictly more non-null values than this to get
    /// a distribution profile.
    /// Default: 10
    pub min_distribution_values: usize,

    /// Number of entries kept in a categorical frequency distribution.
    /// Default: 10
    pub top_categories: usize,

    /// Seed for the normality-test subsample.
    /// Default: 42
    pub sample_seed: u64,

    /// |z| above which a value counts as a z-score anomaly.
    /// Default: 2.5
    pub zscore_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            timeout_ms: None,
            normality_sample_size: MAX_NORMALITY_SAMPLE,
            min_distribution_values: 10,
            top_categories: 10,
            sample_seed: 42,
            zscore_threshold: 2.5,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// The analyzer budget as a [`Duration`], if one is set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.timeout_ms == Some(0) {
            return Err(ConfigValidationError::ZeroTimeout);
        }

        if !(3..=MAX_NORMALITY_SAMPLE).contains(&self.normality_sample_size) {
            return Err(ConfigValidationError::InvalidSampleSize(
                self.normality_sample_size,
            ));
        }

        if self.min_distribution_values < 3 {
            return Err(ConfigValidationError::InvalidMinimum {
                field: "min_distribution_values".to_string(),
                value: self.min_distribution_values,
                minimum: 3,
            });
        }

        if self.top_categories == 0 {
            return Err(ConfigValidationError::InvalidMinimum {
                field: "top_categories".to_string(),
                value: self.top_categories,
                minimum: 1,
            });
        }

        if !self.zscore_threshold.is_finite() || self.zscore_threshold <= 0.0 {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "zscore_threshold".to_string(),
                value: self.zscore_threshold,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be finite and positive)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid normality sample size: {0} (must be between 3 and 5000)")]
    InvalidSampleSize(usize),

    #[error("Invalid value for '{field}': {value} (must be at least {minimum})")]
    InvalidMinimum {
        field: String,
        value: usize,
        minimum: usize,
    },

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,
}

/// Builder for [`AnalysisConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    parallel: Option<bool>,
    timeout_ms: Option<u64>,
    normality_sample_size: Option<usize>,
    min_distribution_values: Option<usize>,
    top_categories: Option<usize>,
    sample_seed: Option<u64>,
    zscore_threshold: Option<f64>,
}

impl AnalysisConfigBuilder {
    /// Run analyzers concurrently (true) or one after another (false).
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Set the wall-clock budget for the analyzer stage.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Cap the number of values handed to the normality test.
    pub fn normality_sample_size(mut self, size: usize) -> Self {
        self.normality_sample_size = Some(size);
        self
    }

    pub fn min_distribution_values(mut self, count: usize) -> Self {
        self.min_distribution_values = Some(count);
        self
    }

    pub fn top_categories(mut self, count: usize) -> Self {
        self.top_categories = Some(count);
        self
    }

    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    pub fn zscore_threshold(mut self, threshold: f64) -> Self {
        self.zscore_threshold = Some(threshold);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        let defaults = AnalysisConfig::default();
        let config = AnalysisConfig {
            parallel: self.parallel.unwrap_or(defaults.parallel),
            timeout_ms: self.timeout_ms.or(defaults.timeout_ms),
            normality_sample_size: self
                .normality_sample_size
                .unwrap_or(defaults.normality_sample_size),
            min_distribution_values: self
                .min_distribution_values
                .unwrap_or(defaults.min_distribution_values),
            top_categories: self.top_categories.unwrap_or(defaults.top_categories),
            sample_seed: self.sample_seed.unwrap_or(defaults.sample_seed),
            zscore_threshold: self.zscore_threshold.unwrap_or(defaults.zscore_threshold),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert!(config.parallel);
        assert_eq!(config.timeout_ms, None);
        assert_eq!(config.normality_sample_size, 5000);
        assert_eq!(config.min_distribution_values, 10);
        assert_eq!(config.top_categories, 10);
        assert_eq!(config.zscore_threshold, 2.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AnalysisConfig::builder()
            .parallel(false)
            .timeout_ms(1500)
            .normality_sample_size(500)
            .top_categories(5)
            .sample_seed(7)
            .build()
            .unwrap();

        assert!(!config.parallel);
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.normality_sample_size, 500);
        assert_eq!(config.top_categories, 5);
        assert_eq!(config.sample_seed, 7);
    }

    #[test]
    fn test_validation_sample_size_above_limit() {
        let result = AnalysisConfig::builder().normality_sample_size(10_000).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidSampleSize(10_000)
        ));
    }

    #[test]
    fn test_validation_zero_timeout() {
        let result = AnalysisConfig::builder().timeout_ms(0).build();
        assert_eq!(result.unwrap_err(), ConfigValidationError::ZeroTimeout);
    }

    #[test]
    fn test_validation_zscore_threshold() {
        let result = AnalysisConfig::builder().zscore_threshold(f64::NAN).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_top_categories() {
        let result = AnalysisConfig::builder().top_categories(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMinimum { minimum: 1, .. }
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{ "parallel": false, "timeout_ms": 2000 }"#;
        let config: AnalysisConfig = serde_json::from_str(json).expect("Should deserialize");

        assert!(!config.parallel);
        assert_eq!(config.timeout_ms, Some(2000));
        assert_eq!(config.normality_sample_size, 5000);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = AnalysisConfig::builder().timeout_ms(250).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
