//! CLI entry point for the dataset analysis pipeline.

use anyhow::{anyhow, Result};
use clap::Parser;
use dotenv::dotenv;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tabular_insights::{
    AnalysisConfig, AnalysisPipeline, AnalysisReport, AnalysisResult, ColumnKind,
};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Schema inference, statistics and insights for tabular datasets",
    long_about = "Profiles a CSV file: infers column kinds, computes descriptive statistics,\n\
                  correlations, distribution shapes, missing data and outliers, then prints\n\
                  a ranked list of findings.\n\n\
                  EXAMPLES:\n  \
                  # Human-readable summary\n  \
                  tabular-insights -i data.csv\n\n  \
                  # Full result as JSON, for piping\n  \
                  tabular-insights -i data.csv --json | jq .result.insights\n\n  \
                  # Save a report and cap the analysis at 5 seconds\n  \
                  tabular-insights -i data.csv -o reports/data.json --timeout-ms 5000"
)]
struct Args {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: String,

    /// Write the JSON report to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logging so stdout only contains the report.
    #[arg(long)]
    json: bool,

    /// Time budget for the analyzers, in milliseconds
    ///
    /// Analyzers still running when it expires are reported as incomplete
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Run the analyzers one after another on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    // .env may carry RUST_LOG, so load it before the filter is built
    dotenv().ok();
    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_csv_with_fallbacks(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let mut config_builder = AnalysisConfig::builder().parallel(!args.sequential);
    if let Some(timeout_ms) = args.timeout_ms {
        config_builder = config_builder.timeout_ms(timeout_ms);
    }
    let config = config_builder.build()?;

    let pipeline = build_pipeline(&args, config)?;

    let started = Instant::now();
    let result = match pipeline.analyze(&data) {
        Ok(result) => result,
        Err(e) => {
            error!("Analysis failed: {}", e);
            return Err(anyhow!("Analysis failed: {}", e));
        }
    };
    let report = AnalysisReport::new(&args.input, started.elapsed(), result);

    if let Some(ref path) = args.output {
        let written = report.write_to_file(path)?;
        info!("Report written to: {}", written.display());
    }

    if args.json {
        println!("{}", report.to_json_pretty()?);
        return Ok(());
    }

    print_human_readable_summary(&report);
    Ok(())
}

fn build_pipeline(args: &Args, config: AnalysisConfig) -> Result<AnalysisPipeline> {
    let mut builder = AnalysisPipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print a human-readable summary of the analysis.
fn print_human_readable_summary(report: &AnalysisReport) {
    let result: &AnalysisResult = &report.result;
    let info = &result.dataset_info;

    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input: {} ({} rows x {} columns, {:.2} MB)",
        report.source, info.rows, info.columns, info.size_mb
    );
    println!("Duration: {}ms", report.duration_ms);
    println!();

    println!("Schema:");
    for kind in [
        ColumnKind::Numeric,
        ColumnKind::Categorical,
        ColumnKind::Datetime,
        ColumnKind::Text,
        ColumnKind::Boolean,
    ] {
        let columns = result.schema.columns_of(kind);
        if !columns.is_empty() {
            println!("  {:<12} {}", kind.as_str(), columns.join(", "));
        }
    }
    println!();

    println!("Insights:");
    for insight in &result.insights {
        println!("  {:>2}. {}", insight.rank, insight.message);
    }
    println!();

    if !result.column_issues.is_empty() {
        println!("Skipped Columns:");
        for issue in &result.column_issues {
            println!(
                "  ! [{}] {}: {}",
                issue.analyzer.display_name(),
                issue.column,
                issue.message
            );
        }
        println!();
    }

    if !result.is_complete() {
        let names: Vec<_> = result
            .incomplete_analyzers
            .iter()
            .map(|kind| kind.display_name())
            .collect();
        warn!("Partial result, unfinished analyzers: {}", names.join(", "));
        println!("Incomplete: {}", names.join(", "));
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use -o <path> to save the JSON report");
    println!("{}", "=".repeat(80));
}

/// Load CSV, retrying without quote handling when the first parse fails.
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    // Strategy 1: Standard loading with quote handling and date parsing
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_try_parse_dates(true),
        )
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Without quote handling
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(None))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .map_err(|e| {
            error!("Loading without quotes failed: {}", e);
            anyhow!("Failed to parse {}: {}", path, e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("tabular-insights-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_doubled_quotes_are_kept_as_escapes() {
        let path = write_temp("quoted.csv", "id,remark\n1,\"said \"\"hi\"\"\"\n2,plain\n");

        let df = load_csv_with_fallbacks(path.to_str().unwrap()).unwrap();

        let remarks: Vec<Option<&str>> = df
            .column("remark")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(remarks, vec![Some("said \"hi\""), Some("plain")]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_dates_are_parsed() {
        let path = write_temp("dated.csv", "day,value\n2024-01-01,1\n2024-01-02,2\n");

        let df = load_csv_with_fallbacks(path.to_str().unwrap()).unwrap();

        assert_eq!(df.column("day").unwrap().dtype(), &DataType::Date);
        std::fs::remove_file(&path).ok();
    }
}
