//! Accelerator Latency Bench
//!
//! Resolves a remote accelerator by its symbolic name, runs small units of
//! work against it and against the local CPU, and reports the mean and
//! standard deviation of each operation's latency.
//!
//! The pipeline is `resolver` → `workload` → `runner` (over an `executor`) →
//! `stats`, orchestrated by `driver` and rendered by `output`.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod resolver;
pub mod runner;
pub mod stats;
pub mod types;
pub mod workload;

// Re-export commonly used types
pub use driver::{BenchmarkDriver, BenchmarkReport, CaseOutcome, CaseReport, Progress};
pub use error::{AppError, Result};
pub use executor::{Executor, LocalExecutor, RemoteExecutor, TargetExecutor, TrialContext};
pub use models::Config;
pub use output::{ColoredFormatter, OutputFormatter, OutputFormatterFactory, PlainFormatter};
pub use resolver::{EndpointResolver, MetadataResolver, StaticResolver};
pub use runner::TimedRunner;
pub use stats::{Comparison, ScalingCheck, TimingResult, TimingSample};
pub use types::{Endpoint, SymbolicName, TargetKind};
pub use workload::{build_elementwise_add, build_no_op, CaseSpec, WorkUnit};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata stamped by `build.rs`
pub mod build_info {
    pub const BUILD_TIME: &str = match option_env!("BUILD_TIME") {
        Some(time) => time,
        None => "unknown",
    };
    pub const GIT_COMMIT: &str = match option_env!("GIT_COMMIT") {
        Some(commit) => commit,
        None => "unknown",
    };
    pub const TARGET_TRIPLE: &str = match option_env!("TARGET_TRIPLE") {
        Some(target) => target,
        None => "unknown",
    };

    /// One-line description for `--debug`
    pub fn summary() -> String {
        format!(
            "{} v{} (commit {}, built {}, {})",
            super::PKG_NAME,
            super::VERSION,
            GIT_COMMIT,
            BUILD_TIME,
            TARGET_TRIPLE
        )
    }
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Appended to the login name to form the default accelerator name
    pub const ACCELERATOR_NAME_SUFFIX: &str = "-tpu-0";
    pub const DEFAULT_DISCOVERY_URL: &str = "https://tpu.googleapis.com";
    pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";
    /// Port of the accelerator service when discovery does not report one
    pub const DEFAULT_ACCELERATOR_PORT: u16 = 8470;

    // Cheap operations get more trials to average out jitter
    pub const DEFAULT_NOOP_REPEATS: u32 = 100;
    pub const DEFAULT_ADD_REPEATS: u32 = 10;
    pub const MAX_REPEATS: u32 = 10_000;

    pub const DEFAULT_ADD_SIZE: usize = 1_000_000;
    /// Largest operand length of a single elementwise-add instance
    pub const MAX_ADD_SIZE: usize = 100_000_000;
    /// Largest `size * parallelism` one elementwise-add unit may allocate
    pub const MAX_ADD_ELEMENTS: usize = 100_000_000;
    pub const DEFAULT_ADD_PARALLELISM: &[usize] = &[1, 8];

    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
