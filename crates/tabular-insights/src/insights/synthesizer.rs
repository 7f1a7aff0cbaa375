//! Rule-based insight synthesis.

use tracing::debug;

use crate::types::{
    AnalyzerKind, CategoricalStatistics, CorrelationProfile, DatasetInfo, DescriptiveProfile,
    DistributionsProfile, Insight, InsightCategory, MissingnessProfile, NumericStatistics,
    OutliersProfile, Schema,
};
use crate::utils::format_thousands;

/// Numeric columns considered for statistical insights.
const MAX_NUMERIC_INSIGHTS: usize = 5;
/// Categorical columns considered for statistical insights.
const MAX_CATEGORICAL_INSIGHTS: usize = 3;
/// Cap on names or lines in the quality, correlation, distribution and outlier sections.
const MAX_LISTED: usize = 3;

const SKEW_THRESHOLD: f64 = 0.10;
const HIGH_CV: f64 = 1.0;
const LOW_CV: f64 = 0.1;
const HIGH_DIVERSITY: f64 = 0.8;
const DOMINANCE: f64 = 0.7;
const HIGH_MISSING_PCT: f64 = 20.0;
const HIGH_OUTLIER_PCT: f64 = 5.0;

/// Everything the synthesizer reads.
///
/// Profiles of analyzers listed in `incomplete` are never read; their
/// sections are left out of the insight list.
#[derive(Debug, Clone, Copy)]
pub struct InsightSources<'a> {
    pub dataset_info: &'a DatasetInfo,
    pub schema: &'a Schema,
    pub descriptive: &'a DescriptiveProfile,
    pub correlations: &'a CorrelationProfile,
    pub distributions: &'a DistributionsProfile,
    pub missing: &'a MissingnessProfile,
    pub outliers: &'a OutliersProfile,
    pub incomplete: &'a [AnalyzerKind],
}

impl InsightSources<'_> {
    fn finished(&self, analyzer: AnalyzerKind) -> bool {
        !self.incomplete.contains(&analyzer)
    }
}

/// Turns analyzer profiles into a ranked list of insights.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsightSynthesizer;

impl InsightSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(&self, sources: &InsightSources<'_>) -> Vec<Insight> {
        let sections = [
            (InsightCategory::Overview, self.overview(sources)),
            (InsightCategory::Statistical, self.statistical(sources)),
            (InsightCategory::Quality, self.quality(sources)),
            (InsightCategory::Correlation, self.correlation(sources)),
            (InsightCategory::Distribution, self.distribution(sources)),
            (InsightCategory::Outlier, self.outlier(sources)),
        ];

        let insights: Vec<Insight> = sections
            .into_iter()
            .flat_map(|(category, messages)| {
                messages.into_iter().map(move |message| (category, message))
            })
            .enumerate()
            .map(|(i, (category, message))| Insight {
                rank: i + 1,
                category,
                message,
            })
            .collect();

        debug!("Synthesized {} insights", insights.len());
        insights
    }

    fn overview(&self, sources: &InsightSources<'_>) -> Vec<String> {
        let info = sources.dataset_info;
        let counts = &sources.schema.summary;
        let mut lines = vec![format!(
            "Dataset contains {} records across {} variables",
            format_thousands(info.rows),
            info.columns
        )];

        if counts.numeric > 0 {
            lines.push(format!(
                "{} numeric variables detected for quantitative analysis",
                counts.numeric
            ));
        }
        if counts.categorical > 0 {
            lines.push(format!(
                "{} categorical variables identified for grouping analysis",
                counts.categorical
            ));
        }
        if counts.datetime > 0 {
            lines.push(format!(
                "{} datetime variables found for temporal analysis",
                counts.datetime
            ));
        }
        if counts.text > 0 {
            lines.push(format!(
                "{} text variables hold free-form values",
                counts.text
            ));
        }
        if counts.boolean > 0 {
            lines.push(format!(
                "{} boolean variables available as binary flags",
                counts.boolean
            ));
        }

        lines.push(format!("Dataset size: {:.2} MB in memory", info.size_mb));
        lines
    }

    fn statistical(&self, sources: &InsightSources<'_>) -> Vec<String> {
        let mut lines = Vec::new();
        if !sources.finished(AnalyzerKind::DescriptiveStatistics) {
            return lines;
        }

        // the cap applies to schema positions, columns without statistics still use a slot
        let numeric = sources
            .schema
            .numeric_columns
            .iter()
            .take(MAX_NUMERIC_INSIGHTS)
            .filter_map(|c| {
                let stats = sources.descriptive.get(c)?.as_numeric()?;
                Some((c, stats))
            });
        for (column, stats) in numeric {
            lines.push(central_tendency(column, stats));
            if let Some(line) = variability(column, stats) {
                lines.push(line);
            }
        }

        let categorical = sources
            .schema
            .categorical_columns
            .iter()
            .take(MAX_CATEGORICAL_INSIGHTS)
            .filter_map(|c| {
                let stats = sources.descriptive.get(c)?.as_categorical()?;
                Some((c, stats))
            });
        for (column, stats) in categorical {
            lines.push(category_balance(column, stats));
        }

        lines
    }

    fn quality(&self, sources: &InsightSources<'_>) -> Vec<String> {
        let summary = match &sources.missing.summary {
            Some(summary) if sources.finished(AnalyzerKind::MissingData) => summary,
            _ => return Vec::new(),
        };
        let pct = summary.overall_missing_percentage;

        let mut lines = vec![if pct == 0.0 {
            "Excellent data quality: No missing values detected".to_string()
        } else if pct < 5.0 {
            format!("Good data quality: Only {:.1}% missing values", pct)
        } else if pct < 15.0 {
            format!(
                "Moderate data quality: {:.1}% missing values need attention",
                pct
            )
        } else {
            format!(
                "Poor data quality: {:.1}% missing values require significant cleaning",
                pct
            )
        }];

        if summary.columns_with_missing > 0 {
            lines.push(format!(
                "{} columns contain missing values",
                summary.columns_with_missing
            ));
        }

        let high_missing: Vec<&str> = sources
            .schema
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| {
                sources
                    .missing
                    .columns
                    .get(*name)
                    .is_some_and(|m| m.missing_percentage > HIGH_MISSING_PCT)
            })
            .take(MAX_LISTED)
            .collect();
        if !high_missing.is_empty() {
            lines.push(format!("High missing rates in: {}", high_missing.join(", ")));
        }

        lines
    }

    fn correlation(&self, sources: &InsightSources<'_>) -> Vec<String> {
        if !sources.finished(AnalyzerKind::Correlation) {
            return Vec::new();
        }
        let strong = &sources.correlations.strong_correlations;
        if strong.is_empty() {
            return vec!["No strong correlations detected between numeric variables".to_string()];
        }

        strong
            .iter()
            .take(MAX_LISTED)
            .map(|pair| {
                let direction = if pair.correlation > 0.0 {
                    "positive"
                } else {
                    "negative"
                };
                format!(
                    "Strong {} correlation between {} and {} (r = {:.3})",
                    direction, pair.column1, pair.column2, pair.correlation
                )
            })
            .collect()
    }

    fn distribution(&self, sources: &InsightSources<'_>) -> Vec<String> {
        if !sources.finished(AnalyzerKind::Distribution) {
            return Vec::new();
        }
        let (normal, non_normal): (Vec<&str>, Vec<&str>) = sources
            .schema
            .numeric_columns
            .iter()
            .filter_map(|c| {
                let profile = sources.distributions.get(c)?;
                Some((c.as_str(), profile.normality_test.is_normal))
            })
            .fold((Vec::new(), Vec::new()), |(mut n, mut s), (c, is_normal)| {
                if is_normal { n.push(c) } else { s.push(c) }
                (n, s)
            });

        let mut lines = Vec::new();
        if !normal.is_empty() {
            lines.push(format!(
                "Normal distributions detected in: {}",
                list(&normal)
            ));
        }
        if !non_normal.is_empty() {
            lines.push(format!(
                "Non-normal distributions in: {} - consider transformations",
                list(&non_normal)
            ));
        }
        lines
    }

    fn outlier(&self, sources: &InsightSources<'_>) -> Vec<String> {
        if !sources.finished(AnalyzerKind::Outliers) {
            return Vec::new();
        }
        let profiled: Vec<(&str, f64)> = sources
            .schema
            .numeric_columns
            .iter()
            .filter_map(|c| {
                let profile = sources.outliers.get(c)?;
                Some((c.as_str(), profile.outlier_percentage))
            })
            .collect();

        let clean: Vec<&str> = profiled
            .iter()
            .filter(|(_, pct)| *pct == 0.0)
            .map(|(c, _)| *c)
            .collect();

        let mut lines = Vec::new();
        if !clean.is_empty() {
            lines.push(format!("No outliers detected in: {}", list(&clean)));
        }
        lines.extend(
            profiled
                .iter()
                .filter(|(_, pct)| *pct > HIGH_OUTLIER_PCT)
                .take(MAX_LISTED)
                .map(|(c, pct)| {
                    format!(
                        "{}: {:.1}% outliers detected - investigate extreme values",
                        c, pct
                    )
                }),
        );
        lines
    }
}

fn list(names: &[&str]) -> String {
    names
        .iter()
        .take(MAX_LISTED)
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn central_tendency(column: &str, stats: &NumericStatistics) -> String {
    let (mean, median) = (stats.mean, stats.median);
    let scale = mean.abs().max(median.abs()).max(1.0);

    if (mean - median).abs() / scale > SKEW_THRESHOLD {
        if mean > median {
            format!(
                "{}: Right-skewed distribution (mean {:.2} > median {:.2})",
                column, mean, median
            )
        } else {
            format!(
                "{}: Left-skewed distribution (mean {:.2} < median {:.2})",
                column, mean, median
            )
        }
    } else {
        format!(
            "{}: Symmetric distribution (mean ≈ median ≈ {:.2})",
            column, mean
        )
    }
}

fn variability(column: &str, stats: &NumericStatistics) -> Option<String> {
    let cv = if stats.mean == 0.0 {
        0.0
    } else {
        stats.std / stats.mean.abs()
    };

    if cv > HIGH_CV {
        Some(format!("{}: High variability detected (CV = {:.2})", column, cv))
    } else if cv < LOW_CV {
        Some(format!(
            "{}: Low variability, values are consistent (CV = {:.2})",
            column, cv
        ))
    } else {
        None
    }
}

fn category_balance(column: &str, stats: &CategoricalStatistics) -> String {
    let total = stats.count as f64;
    let diversity = stats.unique_count as f64 / total;
    let dominance = stats.most_frequent_count as f64 / total;

    if diversity > HIGH_DIVERSITY {
        format!(
            "{}: High diversity with {} unique categories",
            column, stats.unique_count
        )
    } else if dominance > DOMINANCE {
        format!(
            "{}: Dominated by '{}' ({:.1}% of records)",
            column,
            stats.most_frequent,
            dominance * 100.0
        )
    } else {
        format!(
            "{}: Balanced distribution across {} categories",
            column, stats.unique_count
        )
    }
}
