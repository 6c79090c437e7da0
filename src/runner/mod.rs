//! Timed execution of repeated trials against one target

use crate::{
    error::{AppError, ErrorContext, Result},
    executor::Executor,
    logging::BenchLogger,
    stats::{TimingResult, TimingSample},
    types::Endpoint,
    workload::WorkUnit,
};
use std::time::Instant;

/// Runs a work unit repeatedly against a fixed target and summarizes the timings
pub struct TimedRunner<'a> {
    executor: &'a dyn Executor,
    logger: &'a BenchLogger,
}

impl<'a> TimedRunner<'a> {
    pub fn new(executor: &'a dyn Executor, logger: &'a BenchLogger) -> Self {
        Self { executor, logger }
    }

    /// Run `repeats` strictly sequential trials of `unit` on `target`
    ///
    /// Each trial acquires its own context, so variables are re-initialized
    /// every time. Any trial error aborts the run; no result is produced from
    /// a partial sample set.
    pub async fn run(&self, target: &Endpoint, unit: &WorkUnit, repeats: u32) -> Result<TimingResult> {
        if repeats == 0 {
            return Err(AppError::invalid_parameter("Repeats must be at least 1"));
        }

        let label = unit.label();
        let mut samples = Vec::with_capacity(repeats as usize);

        for index in 0..repeats as usize {
            let sample = self
                .trial(target, unit)
                .await
                .with_context(|| format!("Trial {} of {} on {}", index + 1, repeats, target))?;
            self.logger
                .log_trial(&label, target.kind(), index, sample.duration())
                .await;
            samples.push(sample);
        }

        TimingResult::from_samples(&samples)
    }

    /// One trial: acquire, time a single execution, release
    async fn trial(&self, target: &Endpoint, unit: &WorkUnit) -> Result<TimingSample> {
        let mut context = self.executor.acquire(target, unit).await?;

        let started = Instant::now();
        let outcome = context.run().await;
        let elapsed = started.elapsed();

        if let Err(e) = context.release().await {
            self.logger.log_release_failure(target.kind(), &e).await;
        }

        outcome.map(|_| TimingSample::new(elapsed))
    }
}
