use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ColumnComputationError;

// ============================================================================
// Schema Types
// ============================================================================

/// Semantic kind of a column, decided once by the schema inferencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Datetime,
    Boolean,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub kind: ColumnKind,
    /// Physical polars dtype, for display.
    pub dtype: String,
}

/// Number of columns of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub numeric: usize,
    pub categorical: usize,
    pub datetime: usize,
    pub text: usize,
    pub boolean: usize,
}

impl KindCounts {
    pub fn get(&self, kind: ColumnKind) -> usize {
        match kind {
            ColumnKind::Numeric => self.numeric,
            ColumnKind::Categorical => self.categorical,
            ColumnKind::Datetime => self.datetime,
            ColumnKind::Text => self.text,
            ColumnKind::Boolean => self.boolean,
        }
    }
}

/// Column classification for one dataset.
///
/// The per-kind lists preserve column declaration order; downstream consumers
/// (chart selection, insight ordering) rely on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<SchemaColumn>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub datetime_columns: Vec<String>,
    pub text_columns: Vec<String>,
    pub boolean_columns: Vec<String>,
    pub summary: KindCounts,
}

impl Schema {
    /// Build a schema from classified columns, in declaration order.
    pub fn from_columns(columns: Vec<SchemaColumn>) -> Self {
        let mut schema = Schema::default();
        for column in &columns {
            let bucket = match column.kind {
                ColumnKind::Numeric => &mut schema.numeric_columns,
                ColumnKind::Categorical => &mut schema.categorical_columns,
                ColumnKind::Datetime => &mut schema.datetime_columns,
                ColumnKind::Text => &mut schema.text_columns,
                ColumnKind::Boolean => &mut schema.boolean_columns,
            };
            bucket.push(column.name.clone());
        }
        schema.summary = KindCounts {
            numeric: schema.numeric_columns.len(),
            categorical: schema.categorical_columns.len(),
            datetime: schema.datetime_columns.len(),
            text: schema.text_columns.len(),
            boolean: schema.boolean_columns.len(),
        };
        schema.columns = columns;
        schema
    }

    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.kind)
    }

    pub fn columns_of(&self, kind: ColumnKind) -> &[String] {
        match kind {
            ColumnKind::Numeric => &self.numeric_columns,
            ColumnKind::Categorical => &self.categorical_columns,
            ColumnKind::Datetime => &self.datetime_columns,
            ColumnKind::Text => &self.text_columns,
            ColumnKind::Boolean => &self.boolean_columns,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// Descriptive Statistics Types
// ============================================================================

/// Per-column statistics, tagged by the kind they were computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStatistics {
    Numeric(NumericStatistics),
    Categorical(CategoricalStatistics),
}

impl ColumnStatistics {
    pub fn as_numeric(&self) -> Option<&NumericStatistics> {
        match self {
            Self::Numeric(stats) => Some(stats),
            Self::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&CategoricalStatistics> {
        match self {
            Self::Categorical(stats) => Some(stats),
            Self::Numeric(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub std: f64,
    pub var: f64,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q75: f64,
    pub iqr: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStatistics {
    pub count: usize,
    pub unique_count: usize,
    pub most_frequent: String,
    pub most_frequent_count: usize,
    /// Most frequent values first; equal counts keep first-seen order.
    pub frequency_distribution: Vec<FrequencyEntry>,
}

pub type DescriptiveProfile = BTreeMap<String, ColumnStatistics>;

// ============================================================================
// Correlation Types
// ============================================================================

/// Symmetric coefficient matrix keyed by column name. `None` marks an
/// undefined coefficient (constant column or too few paired values).
pub type CorrelationMatrix = BTreeMap<String, BTreeMap<String, Option<f64>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongCorrelation {
    pub column1: String,
    pub column2: String,
    pub correlation: f64,
    pub strength: CorrelationStrength,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationProfile {
    pub pearson: CorrelationMatrix,
    pub spearman: CorrelationMatrix,
    pub strong_correlations: Vec<StrongCorrelation>,
}

impl CorrelationProfile {
    pub fn is_empty(&self) -> bool {
        self.pearson.is_empty()
    }

    /// Pearson coefficient for a pair, if computed and defined.
    pub fn pearson_between(&self, a: &str, b: &str) -> Option<f64> {
        self.pearson.get(a).and_then(|row| row.get(b)).copied().flatten()
    }
}

// ============================================================================
// Distribution Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionShape {
    Normal,
    RightSkewed,
    LeftSkewed,
    HeavyTailed,
    LightTailed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub method: String,
    pub statistic: f64,
    pub p_value: f64,
    pub is_normal: bool,
    /// Number of values the test actually ran on.
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionProfile {
    pub normality_test: NormalityTest,
    pub histogram_bins: usize,
    pub distribution_type: DistributionShape,
    pub skewness: f64,
    pub kurtosis: f64,
}

pub type DistributionsProfile = BTreeMap<String, DistributionProfile>;

// ============================================================================
// Missing Data Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissingness {
    pub missing_count: usize,
    pub missing_percentage: f64,
    pub has_missing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingSummary {
    pub total_missing_values: usize,
    pub total_cells: usize,
    pub overall_missing_percentage: f64,
    pub columns_with_missing: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingnessProfile {
    pub columns: BTreeMap<String, ColumnMissingness>,
    /// Set only once every column has been counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<MissingSummary>,
}

// ============================================================================
// Outlier Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierProfile {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub outlier_count: usize,
    pub outlier_percentage: f64,
    pub has_outliers: bool,
    /// Values whose |z-score| exceeds the configured threshold.
    pub zscore_anomaly_count: usize,
}

pub type OutliersProfile = BTreeMap<String, OutlierProfile>;

// ============================================================================
// Insight Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Overview,
    Statistical,
    Quality,
    Correlation,
    Distribution,
    Outlier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// 1-based position in the synthesized list.
    pub rank: usize,
    pub category: InsightCategory,
    pub message: String,
}

// ============================================================================
// Result Types
// ============================================================================

/// The five statistical analyzers, used to label issues and partial results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    DescriptiveStatistics,
    Correlation,
    Distribution,
    MissingData,
    Outliers,
}

impl AnalyzerKind {
    pub const ALL: [AnalyzerKind; 5] = [
        Self::DescriptiveStatistics,
        Self::Correlation,
        Self::Distribution,
        Self::MissingData,
        Self::Outliers,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DescriptiveStatistics => "Descriptive statistics",
            Self::Correlation => "Correlation analysis",
            Self::Distribution => "Distribution analysis",
            Self::MissingData => "Missing data analysis",
            Self::Outliers => "Outlier detection",
        }
    }
}

/// A column an analyzer had to leave out of its profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnIssue {
    pub analyzer: AnalyzerKind,
    pub column: String,
    pub code: String,
    pub message: String,
}

impl ColumnIssue {
    pub fn from_error(analyzer: AnalyzerKind, error: &ColumnComputationError) -> Self {
        Self {
            analyzer,
            column: error.column().to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    /// Estimated in-memory size, rounded to two decimals.
    pub size_mb: f64,
}

/// Lightweight per-column overview, independent of the analyzers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub dtype: String,
    pub kind: ColumnKind,
    pub non_null_count: usize,
    pub null_count: usize,
    pub unique_count: usize,
    pub memory_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_frequent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_length: Option<f64>,
}

/// Everything one pipeline run produced.
///
/// Built fresh per call and never mutated afterwards. When the analyzer stage
/// ran out of time, the profiles of the analyzers listed in
/// `incomplete_analyzers` are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub dataset_info: DatasetInfo,
    pub schema: Schema,
    pub column_info: BTreeMap<String, ColumnInfo>,
    pub descriptive_stats: DescriptiveProfile,
    pub correlations: CorrelationProfile,
    pub distributions: DistributionsProfile,
    pub missing_data: MissingnessProfile,
    pub outliers: OutliersProfile,
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub column_issues: Vec<ColumnIssue>,
    #[serde(default)]
    pub incomplete_analyzers: Vec<AnalyzerKind>,
}

impl AnalysisResult {
    /// True when every analyzer finished within the budget.
    pub fn is_complete(&self) -> bool {
        self.incomplete_analyzers.is_empty()
    }

    pub fn insights_in(&self, category: InsightCategory) -> impl Iterator<Item = &Insight> {
        self.insights.iter().filter(move |i| i.category == category)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, kind: ColumnKind) -> SchemaColumn {
        SchemaColumn {
            name: name.to_string(),
            kind,
            dtype: "x".to_string(),
        }
    }

    #[test]
    fn test_schema_from_columns_keeps_order() {
        let schema = Schema::from_columns(vec![
            column("b", ColumnKind::Numeric),
            column("city", ColumnKind::Categorical),
            column("a", ColumnKind::Numeric),
            column("flag", ColumnKind::Boolean),
        ]);

        assert_eq!(schema.numeric_columns, vec!["b", "a"]);
        assert_eq!(schema.summary.numeric, 2);
        assert_eq!(schema.summary.categorical, 1);
        assert_eq!(schema.summary.get(ColumnKind::Boolean), 1);
        assert_eq!(schema.kind_of("city"), Some(ColumnKind::Categorical));
        assert_eq!(schema.kind_of("missing"), None);
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn test_column_statistics_tagged_serialization() {
        let stats = ColumnStatistics::Categorical(CategoricalStatistics {
            count: 3,
            unique_count: 2,
            most_frequent: "a".to_string(),
            most_frequent_count: 2,
            frequency_distribution: vec![
                FrequencyEntry { value: "a".to_string(), count: 2 },
                FrequencyEntry { value: "b".to_string(), count: 1 },
            ],
        });

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"kind\":\"categorical\""));
        assert!(json.contains("\"most_frequent\":\"a\""));
    }

    #[test]
    fn test_distribution_shape_json_values() {
        let json = serde_json::to_string(&DistributionShape::RightSkewed).unwrap();
        assert_eq!(json, "\"right_skewed\"");
    }

    #[test]
    fn test_column_issue_from_error() {
        let error = ColumnComputationError::DegenerateVariance("flat".to_string());
        let issue = ColumnIssue::from_error(AnalyzerKind::Distribution, &error);
        assert_eq!(issue.column, "flat");
        assert_eq!(issue.code, "DEGENERATE_VARIANCE");
        assert_eq!(issue.analyzer, AnalyzerKind::Distribution);
    }
}
