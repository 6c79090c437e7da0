//! Command-line interface

use clap::Parser;

/// Environment reference printed after `--help`
const ENVIRONMENT_HELP: &str = "\
ENVIRONMENT:
  TPU_NAME                 Accelerator name (same as --tpu)
  TPU_ENDPOINT             Fixed host:port, skips discovery
  GCP_PROJECT, GCP_ZONE    Location of the accelerator (metadata server when unset)
  ACCESS_TOKEN             Bearer token for the discovery API
  DISCOVERY_URL            Discovery API base URL
  METADATA_URL             Instance metadata server base URL
  NOOP_REPEATS             Trials per target for the no-op case
  ADD_REPEATS              Trials per target for each elementwise-add case
  ADD_SIZE                 Elementwise-add tensor size (size x parallelism <= 100000000)
  ADD_PARALLELISM          Comma-separated parallelism levels, e.g. 1,8
  REQUEST_TIMEOUT_SECONDS  Timeout for discovery and session requests
  ENABLE_COLOR             true/false

Values are also read from a .env file in the working directory.";

/// Accelerator latency bench: time a no-op and elementwise additions on a
/// remote TPU against the local CPU
#[derive(Parser, Debug, Clone)]
#[command(name = "alb")]
#[command(version, about, long_about = None, after_help = ENVIRONMENT_HELP)]
pub struct Cli {
    /// Name of the TPU to benchmark [default: <login>-tpu-0]
    #[arg(long, value_name = "NAME")]
    pub tpu: Option<String>,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Check if colors should be enabled; `None` leaves the decision to configuration
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color || !supports_color() {
            Some(false)
        } else {
            None
        }
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    cfg!(unix)
}
