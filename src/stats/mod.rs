//! Reduction of trial timings to summary statistics

use crate::error::{AppError, Result};
use crate::types::TargetKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Elapsed wall-clock time of exactly one trial
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimingSample(Duration);

impl TimingSample {
    pub fn new(elapsed: Duration) -> Self {
        Self(elapsed)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub fn as_millis_f64(&self) -> f64 {
        self.0.as_secs_f64() * 1000.0
    }
}

/// Summary of all trials for one (target, work unit) pair, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingResult {
    /// Arithmetic mean
    pub mean_ms: f64,
    /// Sample standard deviation (n - 1); zero for a single sample
    pub std_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Number of samples, always at least one
    pub count: usize,
    /// When the reduction was computed
    pub measured_at: DateTime<Utc>,
}

impl TimingResult {
    /// Reduce a complete sample set
    pub fn from_samples(samples: &[TimingSample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(AppError::statistics("Cannot summarize an empty sample set"));
        }

        let values: Vec<f64> = samples.iter().map(TimingSample::as_millis_f64).collect();
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;

        let variance = if count > 1 {
            let sum_squared_diff: f64 = values.iter().map(|&x| (x - mean).powi(2)).sum();
            sum_squared_diff / (count - 1) as f64
        } else {
            0.0
        };

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            mean_ms: mean,
            std_ms: variance.sqrt(),
            min_ms: min,
            max_ms: max,
            count,
            measured_at: Utc::now(),
        })
    }

    /// Format mean with 2 decimal places
    pub fn format_mean(&self) -> String {
        format!("{:.2}", self.mean_ms)
    }

    /// Format standard deviation with 2 decimal places
    pub fn format_std(&self) -> String {
        format!("{:.2}", self.std_ms)
    }
}

/// Local versus remote timing of one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// `remote.mean - local.mean`
    pub overhead_ms: f64,
    /// `remote.mean / local.mean`, absent when the local mean is zero
    pub ratio: Option<f64>,
}

impl Comparison {
    pub fn between(local: &TimingResult, remote: &TimingResult) -> Self {
        let ratio = if local.mean_ms > 0.0 {
            Some(remote.mean_ms / local.mean_ms)
        } else {
            None
        };
        Self {
            overhead_ms: remote.mean_ms - local.mean_ms,
            ratio,
        }
    }
}

/// Outcome of comparing a parallel case against its single-instance baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingCheck {
    pub target: TargetKind,
    pub baseline_parallelism: usize,
    pub parallelism: usize,
    pub baseline_mean_ms: f64,
    pub mean_ms: f64,
    /// How far below the baseline the mean may fall before it is flagged
    pub tolerance_ms: f64,
}

impl ScalingCheck {
    /// Relative part of the noise allowance
    pub const RELATIVE_TOLERANCE: f64 = 0.10;
    /// Standard deviations of the baseline allowed as noise
    pub const STD_TOLERANCE: f64 = 3.0;

    pub fn evaluate(
        target: TargetKind,
        baseline_parallelism: usize,
        baseline: &TimingResult,
        parallelism: usize,
        result: &TimingResult,
    ) -> Self {
        let tolerance_ms = (Self::STD_TOLERANCE * baseline.std_ms)
            .max(Self::RELATIVE_TOLERANCE * baseline.mean_ms);
        Self {
            target,
            baseline_parallelism,
            parallelism,
            baseline_mean_ms: baseline.mean_ms,
            mean_ms: result.mean_ms,
            tolerance_ms,
        }
    }

    /// More parallel work measured faster than the baseline beyond noise
    pub fn is_violation(&self) -> bool {
        self.parallelism > self.baseline_parallelism
            && self.mean_ms < self.baseline_mean_ms - self.tolerance_ms
    }

    pub fn describe(&self) -> String {
        format!(
            "{} parallelism={} mean {:.2} ms is below parallelism={} mean {:.2} ms (tolerance {:.2} ms)",
            self.target.label(),
            self.parallelism,
            self.mean_ms,
            self.baseline_parallelism,
            self.baseline_mean_ms,
            self.tolerance_ms
        )
    }
}
