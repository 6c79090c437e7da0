//! Benchmark orchestration: resolve once, then time every case locally and remotely

use crate::{
    error::{AppError, Result},
    executor::Executor,
    logging::BenchLogger,
    resolver::EndpointResolver,
    runner::TimedRunner,
    stats::{Comparison, ScalingCheck, TimingResult},
    types::{Endpoint, SymbolicName, TargetKind},
    workload::{CaseSpec, WorkKind},
};
use std::collections::BTreeMap;

/// How one case ended
#[derive(Debug)]
pub enum CaseOutcome {
    /// Both targets were timed
    Completed { local: TimingResult, remote: TimingResult },
    /// The case stopped early; `target` is `None` when the unit could not be built
    Failed {
        local: Option<TimingResult>,
        target: Option<TargetKind>,
        error: AppError,
    },
}

/// Report entry for one benchmark case
#[derive(Debug)]
pub struct CaseReport {
    pub case: CaseSpec,
    pub label: String,
    pub outcome: CaseOutcome,
}

impl CaseReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Completed { .. })
    }

    /// Timing for one target, if that target completed
    pub fn result(&self, target: TargetKind) -> Option<&TimingResult> {
        match (&self.outcome, target) {
            (CaseOutcome::Completed { local, .. }, TargetKind::Local) => Some(local),
            (CaseOutcome::Completed { remote, .. }, TargetKind::Remote) => Some(remote),
            (CaseOutcome::Failed { local, .. }, TargetKind::Local) => local.as_ref(),
            (CaseOutcome::Failed { .. }, TargetKind::Remote) => None,
        }
    }

    pub fn comparison(&self) -> Option<Comparison> {
        match &self.outcome {
            CaseOutcome::Completed { local, remote } => Some(Comparison::between(local, remote)),
            CaseOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&AppError> {
        match &self.outcome {
            CaseOutcome::Failed { error, .. } => Some(error),
            CaseOutcome::Completed { .. } => None,
        }
    }
}

/// Progress reported while a comparison runs
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    /// The accelerator name has been resolved; sent once, before any case
    Resolved {
        accelerator: &'a SymbolicName,
        endpoint: &'a Endpoint,
    },
    /// A case has finished, successfully or not
    Case(&'a CaseReport),
}

/// Results of a whole comparison run, in case order
#[derive(Debug)]
pub struct BenchmarkReport {
    pub accelerator: SymbolicName,
    pub endpoint: Endpoint,
    pub cases: Vec<CaseReport>,
}

impl BenchmarkReport {
    pub fn completed_count(&self) -> usize {
        self.cases.iter().filter(|c| c.is_completed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.cases.len() - self.completed_count()
    }

    /// Compare every parallel elementwise-add case with the single-instance case
    /// of the same size, per target
    pub fn scaling_checks(&self) -> Vec<ScalingCheck> {
        let mut by_size: BTreeMap<usize, Vec<(usize, &CaseReport)>> = BTreeMap::new();
        for report in &self.cases {
            if let WorkKind::ElementwiseAdd { size, parallelism } = report.case.kind {
                by_size.entry(size).or_default().push((parallelism, report));
            }
        }

        let mut checks = Vec::new();
        for cases in by_size.values() {
            let Some((_, baseline)) = cases.iter().find(|(p, _)| *p == 1) else {
                continue;
            };
            for (parallelism, report) in cases.iter().filter(|(p, _)| *p > 1) {
                for target in [TargetKind::Local, TargetKind::Remote] {
                    if let (Some(base), Some(result)) = (baseline.result(target), report.result(target)) {
                        checks.push(ScalingCheck::evaluate(target, 1, base, *parallelism, result));
                    }
                }
            }
        }
        checks
    }

    pub fn scaling_violations(&self) -> Vec<ScalingCheck> {
        self.scaling_checks().into_iter().filter(ScalingCheck::is_violation).collect()
    }
}

/// Drives the local-versus-remote comparison
pub struct BenchmarkDriver<R, E> {
    resolver: R,
    executor: E,
    logger: BenchLogger,
}

impl<R, E> BenchmarkDriver<R, E>
where
    R: EndpointResolver,
    E: Executor,
{
    pub fn new(resolver: R, executor: E, logger: BenchLogger) -> Self {
        Self { resolver, executor, logger }
    }

    /// Resolve `name` and time every case; only a resolution failure aborts
    pub async fn compare(&self, name: &str, cases: &[CaseSpec]) -> Result<BenchmarkReport> {
        self.compare_with(name, cases, |_| {}).await
    }

    /// Like [`compare`](Self::compare), reporting progress to `on_progress` as it happens
    pub async fn compare_with<F>(&self, name: &str, cases: &[CaseSpec], mut on_progress: F) -> Result<BenchmarkReport>
    where
        F: FnMut(Progress<'_>),
    {
        let accelerator = SymbolicName::new(name)?;
        let endpoint = self.resolver.resolve(accelerator.as_str()).await?;
        self.logger.log_resolution(&accelerator, &endpoint).await;
        on_progress(Progress::Resolved {
            accelerator: &accelerator,
            endpoint: &endpoint,
        });

        let mut reports = Vec::with_capacity(cases.len());
        for case in cases {
            let report = self.run_case(case, &endpoint).await?;
            on_progress(Progress::Case(&report));
            reports.push(report);
        }

        let report = BenchmarkReport {
            accelerator,
            endpoint,
            cases: reports,
        };
        for violation in report.scaling_violations() {
            self.logger.log_scaling_violation(&violation.describe()).await;
        }
        Ok(report)
    }

    /// Build, time locally, then time remotely. Case-scoped errors are
    /// recorded in the report; anything else is returned.
    async fn run_case(&self, case: &CaseSpec, endpoint: &Endpoint) -> Result<CaseReport> {
        let case_id = self.logger.new_case_id();
        let label = case.label();
        let runner = TimedRunner::new(&self.executor, &self.logger);

        let failed = |local: Option<TimingResult>, target: Option<TargetKind>, error: AppError| -> Result<CaseReport> {
            if error.is_case_scoped() {
                Ok(CaseReport {
                    case: *case,
                    label: label.clone(),
                    outcome: CaseOutcome::Failed { local, target, error },
                })
            } else {
                Err(error)
            }
        };

        let unit = match case.build() {
            Ok(unit) => unit,
            Err(error) => {
                self.logger.log_case_failure(&case_id, &label, None, &error).await;
                return failed(None, None, error);
            }
        };

        let local = match runner.run(&Endpoint::Local, &unit, case.repeats).await {
            Ok(result) => result,
            Err(error) => {
                self.logger.log_case_failure(&case_id, &label, Some(TargetKind::Local), &error).await;
                return failed(None, Some(TargetKind::Local), error);
            }
        };
        self.logger.log_result(&case_id, &label, TargetKind::Local, &local).await;

        let remote = match runner.run(endpoint, &unit, case.repeats).await {
            Ok(result) => result,
            Err(error) => {
                self.logger.log_case_failure(&case_id, &label, Some(TargetKind::Remote), &error).await;
                return failed(Some(local), Some(TargetKind::Remote), error);
            }
        };
        self.logger.log_result(&case_id, &label, TargetKind::Remote, &remote).await;

        Ok(CaseReport {
            case: *case,
            label,
            outcome: CaseOutcome::Completed { local, remote },
        })
    }
}
