//! Running the five analyzers and collecting their profiles at a barrier.
//!
//! In parallel mode each analyzer gets its own OS thread and reports back over
//! a channel. The barrier waits until every analyzer has reported or the
//! deadline passes; whatever has not reported by then is listed as incomplete.
//! A panic inside an analyzer is caught on its thread and treated the same way.

use polars::prelude::*;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::analyzers::{AnalysisContext, Analyzer};
use crate::types::{
    AnalyzerKind, ColumnIssue, CorrelationProfile, DescriptiveProfile, DistributionsProfile,
    MissingnessProfile, OutliersProfile, Schema,
};

/// An analyzer behind a shared trait object.
pub type SharedAnalyzer<P> = Arc<dyn Analyzer<Profile = P>>;

/// The analyzer instances one pipeline runs.
#[derive(Clone)]
pub(crate) struct AnalyzerSet {
    pub descriptive: SharedAnalyzer<DescriptiveProfile>,
    pub correlation: SharedAnalyzer<CorrelationProfile>,
    pub distribution: SharedAnalyzer<DistributionsProfile>,
    pub missing: SharedAnalyzer<MissingnessProfile>,
    pub outliers: SharedAnalyzer<OutliersProfile>,
}

enum Profile {
    Descriptive(DescriptiveProfile),
    Correlation(CorrelationProfile),
    Distribution(DistributionsProfile),
    Missing(MissingnessProfile),
    Outliers(OutliersProfile),
}

struct Report {
    profile: Profile,
    issues: Vec<ColumnIssue>,
    interrupted: bool,
}

type Job = Box<dyn FnOnce(&DataFrame, &Schema, &AnalysisContext) -> Report + Send>;

struct Finished {
    kind: AnalyzerKind,
    outcome: thread::Result<Report>,
}

fn job<P: Default + Send + 'static>(
    analyzer: &SharedAnalyzer<P>,
    wrap: fn(P) -> Profile,
) -> (AnalyzerKind, Job) {
    let analyzer = Arc::clone(analyzer);
    let kind = analyzer.kind();
    let job: Job = Box::new(move |df: &DataFrame, schema: &Schema, ctx: &AnalysisContext| {
        let output = analyzer.analyze(df, schema, ctx);
        Report {
            profile: wrap(output.profile),
            issues: output.issues,
            interrupted: output.interrupted,
        }
    });
    (kind, job)
}

impl AnalyzerSet {
    fn jobs(&self) -> Vec<(AnalyzerKind, Job)> {
        vec![
            job(&self.descriptive, Profile::Descriptive),
            job(&self.correlation, Profile::Correlation),
            job(&self.distribution, Profile::Distribution),
            job(&self.missing, Profile::Missing),
            job(&self.outliers, Profile::Outliers),
        ]
    }

    /// One analyzer thread each; wait at the barrier until done or out of time.
    pub fn run_parallel(
        &self,
        df: Arc<DataFrame>,
        schema: Arc<Schema>,
        ctx: &AnalysisContext,
        mut on_finish: impl FnMut(AnalyzerKind, usize),
    ) -> Collected {
        let (tx, rx) = mpsc::channel::<Finished>();
        let mut pending = BTreeSet::new();

        for (kind, job) in self.jobs() {
            pending.insert(kind);
            let tx = tx.clone();
            let df = Arc::clone(&df);
            let schema = Arc::clone(&schema);
            let ctx = ctx.clone();
            let spawned = thread::Builder::new()
                .name(format!("analyzer-{:?}", kind).to_lowercase())
                .spawn(move || {
                    let outcome = run_isolated(job, &df, &schema, &ctx);
                    // the barrier may already have given up on this analyzer
                    let _ = tx.send(Finished { kind, outcome });
                });
            if let Err(e) = spawned {
                error!("Failed to start {}: {}", kind.display_name(), e);
            }
        }
        drop(tx);

        let mut collected = Collected::default();
        while !pending.is_empty() {
            let received = match ctx.deadline() {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    rx.recv_timeout(deadline - now)
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(finished) => {
                    pending.remove(&finished.kind);
                    let kind = finished.kind;
                    collected.absorb(finished);
                    on_finish(kind, AnalyzerKind::ALL.len() - pending.len());
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for kind in pending {
            warn!("{} did not finish within the time budget", kind.display_name());
            collected.incomplete.insert(kind);
        }
        collected
    }

    /// Run the analyzers one after another on the calling thread.
    pub fn run_sequential(
        &self,
        df: &DataFrame,
        schema: &Schema,
        ctx: &AnalysisContext,
        mut on_finish: impl FnMut(AnalyzerKind, usize),
    ) -> Collected {
        let mut collected = Collected::default();
        for (done, (kind, job)) in self.jobs().into_iter().enumerate() {
            if ctx.should_stop() {
                warn!("{} not started: run stopped", kind.display_name());
                collected.incomplete.insert(kind);
                continue;
            }
            collected.absorb(Finished {
                kind,
                outcome: run_isolated(job, df, schema, ctx),
            });
            on_finish(kind, done + 1);
        }
        collected
    }
}

fn run_isolated(
    job: Job,
    df: &DataFrame,
    schema: &Schema,
    ctx: &AnalysisContext,
) -> thread::Result<Report> {
    panic::catch_unwind(AssertUnwindSafe(|| job(df, schema, ctx)))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Profiles gathered at the barrier. Profiles of incomplete analyzers stay empty.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub descriptive: DescriptiveProfile,
    pub correlations: CorrelationProfile,
    pub distributions: DistributionsProfile,
    pub missing: MissingnessProfile,
    pub outliers: OutliersProfile,
    pub issues: Vec<ColumnIssue>,
    pub incomplete: BTreeSet<AnalyzerKind>,
}

impl Collected {
    fn absorb(&mut self, finished: Finished) {
        let kind = finished.kind;
        let report = match finished.outcome {
            Ok(report) => report,
            Err(payload) => {
                error!("{} panicked: {}", kind.display_name(), panic_message(&*payload));
                self.incomplete.insert(kind);
                return;
            }
        };

        self.issues.extend(report.issues);
        if report.interrupted {
            warn!("{} stopped before covering every column", kind.display_name());
            self.incomplete.insert(kind);
            return;
        }

        debug!("{} finished", kind.display_name());
        match report.profile {
            Profile::Descriptive(p) => self.descriptive = p,
            Profile::Correlation(p) => self.correlations = p,
            Profile::Distribution(p) => self.distributions = p,
            Profile::Missing(p) => self.missing = p,
            Profile::Outliers(p) => self.outliers = p,
        }
    }

    /// Issues in a stable order, independent of thread scheduling.
    pub fn sorted_issues(&mut self) -> Vec<ColumnIssue> {
        let mut issues = std::mem::take(&mut self.issues);
        issues.sort_by(|a, b| (a.analyzer, &a.column).cmp(&(b.analyzer, &b.column)));
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{
        AnalyzerOutput, CorrelationAnalyzer, DescriptiveStatisticsCalculator,
        DistributionAnalyzer, MissingDataAnalyzer, OutlierDetector,
    };
    use crate::pipeline::CancellationToken;
    use crate::profiler::SchemaInferencer;
    use std::time::Duration;

    fn default_set() -> AnalyzerSet {
        AnalyzerSet {
            descriptive: Arc::new(DescriptiveStatisticsCalculator::default()),
            correlation: Arc::new(CorrelationAnalyzer::new()),
            distribution: Arc::new(DistributionAnalyzer::default()),
            missing: Arc::new(MissingDataAnalyzer::new()),
            outliers: Arc::new(OutlierDetector::default()),
        }
    }

    struct Panicking;

    impl Analyzer for Panicking {
        type Profile = OutliersProfile;

        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Outliers
        }

        fn analyze(
            &self,
            _: &DataFrame,
            _: &Schema,
            _: &AnalysisContext,
        ) -> AnalyzerOutput<OutliersProfile> {
            panic!("outlier detector exploded");
        }
    }

    fn dataset() -> (DataFrame, Schema) {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0],
            "b" => [2.0, 4.0, 6.0, 8.5],
        ]
        .unwrap();
        let schema = SchemaInferencer::new().infer(&df).unwrap();
        (df, schema)
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let (df, schema) = dataset();
        let set = default_set();
        let ctx = AnalysisContext::default();

        let parallel = set.run_parallel(
            Arc::new(df.clone()),
            Arc::new(schema.clone()),
            &ctx,
            |_, _| {},
        );
        let sequential = set.run_sequential(&df, &schema, &ctx, |_, _| {});

        assert!(parallel.incomplete.is_empty());
        assert_eq!(parallel.descriptive, sequential.descriptive);
        assert_eq!(parallel.correlations, sequential.correlations);
        assert_eq!(parallel.missing, sequential.missing);
        assert_eq!(parallel.outliers, sequential.outliers);
    }

    #[test]
    fn test_panic_is_isolated() {
        let (df, schema) = dataset();
        let mut set = default_set();
        set.outliers = Arc::new(Panicking);

        let collected = set.run_parallel(
            Arc::new(df),
            Arc::new(schema),
            &AnalysisContext::default(),
            |_, _| {},
        );

        assert_eq!(
            collected.incomplete.into_iter().collect::<Vec<_>>(),
            vec![AnalyzerKind::Outliers]
        );
        assert!(collected.outliers.is_empty());
        assert_eq!(collected.descriptive.len(), 2);
    }

    #[test]
    fn test_finish_callback_counts_up() {
        let (df, schema) = dataset();
        let mut seen = Vec::new();
        default_set().run_sequential(&df, &schema, &AnalysisContext::default(), |kind, done| {
            seen.push((kind, done));
        });

        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0], (AnalyzerKind::DescriptiveStatistics, 1));
        assert_eq!(seen[4].1, 5);
    }

    #[test]
    fn test_sequential_skips_after_deadline() {
        let (df, schema) = dataset();
        let past = Instant::now() - Duration::from_millis(1);
        let ctx = AnalysisContext::new(CancellationToken::new(), Some(past));

        let collected = default_set().run_sequential(&df, &schema, &ctx, |_, _| {});
        assert_eq!(collected.incomplete.len(), 5);
        assert!(collected.descriptive.is_empty());
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
