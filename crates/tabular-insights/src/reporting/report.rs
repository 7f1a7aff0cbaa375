use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{AnalysisError, Result, ResultExt};
use crate::types::AnalysisResult;

/// An [`AnalysisResult`] stamped with where and when it was produced.
///
/// The result itself carries no timestamps, so two runs over the same data
/// compare equal; run metadata lives only in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Local time the report was generated
    pub generated_at: String,
    /// Path or label of the analyzed dataset
    pub source: String,
    /// Wall-clock time of the pipeline run in milliseconds
    pub duration_ms: u64,
    pub result: AnalysisResult,
}

impl AnalysisReport {
    pub fn new(source: impl Into<String>, duration: Duration, result: AnalysisResult) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source: source.into(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            result,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON, creating parent directories as needed.
    pub fn write_to_file(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(AnalysisError::from)
                .context(format!("creating {}", parent.display()))?;
        }

        let mut file = File::create(path)
            .map_err(AnalysisError::from)
            .context(format!("creating {}", path.display()))?;
        file.write_all(self.to_json_pretty()?.as_bytes())?;

        info!("Report saved: {}", path.display());
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalysisPipeline;
    use polars::prelude::*;

    fn report() -> AnalysisReport {
        let df = df!["x" => [1.0, 2.0, 3.0], "c" => ["a", "a", "b"]].unwrap();
        let result = AnalysisPipeline::builder()
            .build()
            .unwrap()
            .analyze(&df)
            .unwrap();
        AnalysisReport::new("inline.csv", Duration::from_millis(12), result)
    }

    #[test]
    fn test_envelope_fields() {
        let report = report();
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["source"], "inline.csv");
        assert_eq!(json["duration_ms"], 12);
        assert!(json["generated_at"].is_string());
        assert!(json["result"]["insights"].is_array());
        assert!(json["result"]["schema"]["numeric_columns"].is_array());
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let dir = std::env::temp_dir()
            .join(format!("tabular-insights-report-{}", std::process::id()));
        let path = dir.join("nested").join("report.json");

        let written = report().write_to_file(&path).unwrap();
        let content = fs::read_to_string(&written).unwrap();
        let parsed: AnalysisReport = serde_json::from_str(&content).unwrap();

        assert_eq!(parsed.source, "inline.csv");
        fs::remove_dir_all(&dir).ok();
    }
}
