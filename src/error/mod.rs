//! Error handling for the accelerator latency bench

use colored::{Color, Colorize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Every failure the bench can report, one variant per exit code class
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad `.env` entry, environment variable or flag
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed work-unit request or empty accelerator name
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Symbolic name could not be mapped to an endpoint
    #[error("Resolution failure: {0}")]
    Resolution(String),

    /// Target could not be reached when a trial acquired its context
    #[error("Executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// A trial failed while executing its work unit
    #[error("Execution failure: {0}")]
    Execution(String),

    /// Reduction over an empty sample set
    #[error("Statistics error: {0}")]
    Statistics(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// `AppError::<variant_fn>(message)` for every variant
macro_rules! constructors {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant(message.into())
            }
        )*
    };
}

impl AppError {
    constructors! {
        config => Config,
        invalid_parameter => InvalidParameter,
        resolution => Resolution,
        executor_unavailable => ExecutorUnavailable,
        execution => Execution,
        statistics => Statistics,
        internal => Internal,
    }

    /// Short tag used in log fields and console output
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::InvalidParameter(_) => "PARAM",
            Self::Resolution(_) => "RESOLVE",
            Self::ExecutorUnavailable(_) => "UNAVAILABLE",
            Self::Execution(_) => "EXEC",
            Self::Statistics(_) => "STATS",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this error only invalidates the current benchmark case.
    ///
    /// The driver keeps going after case-scoped errors and aborts on everything else.
    pub fn is_case_scoped(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_) | Self::ExecutorUnavailable(_) | Self::Execution(_)
        )
    }

    /// Message plus a suggestion line, shown by `--verbose`
    pub fn user_friendly_message(&self) -> String {
        let (headline, suggestion) = match self {
            Self::Config(_) => ("Configuration problem", "Check your .env file, environment variables and flags."),
            Self::InvalidParameter(_) => (
                "Invalid input",
                "Accelerator names must be non-empty; sizes and parallelism must be at least 1.",
            ),
            Self::Resolution(_) => (
                "Could not resolve the accelerator",
                "Check the --tpu name, your project and zone, and that the discovery service is reachable.",
            ),
            Self::ExecutorUnavailable(_) => (
                "Accelerator unreachable",
                "The accelerator may still be starting or the network path is blocked.",
            ),
            Self::Execution(_) => (
                "Execution failed",
                "Inspect the accelerator health; a device error aborts the affected case.",
            ),
            Self::Statistics(_) => ("Statistics calculation failed", "No timing samples were collected."),
            Self::Internal(_) => ("Internal error", "This is a bug; please report it with the message above."),
        };
        format!("{}: {}\n\nSuggestion: {}", headline, self.message(), suggestion)
    }

    /// Process exit code when this error ends the run
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidParameter(_) => 1,
            Self::Resolution(_) => 2,
            Self::ExecutorUnavailable(_) => 3,
            Self::Execution(_) => 4,
            Self::Statistics(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Rebuild the same variant with a new message
    fn with_message(&self, message: String) -> Self {
        match self {
            Self::Config(_) => Self::Config(message),
            Self::InvalidParameter(_) => Self::InvalidParameter(message),
            Self::Resolution(_) => Self::Resolution(message),
            Self::ExecutorUnavailable(_) => Self::ExecutorUnavailable(message),
            Self::Execution(_) => Self::Execution(message),
            Self::Statistics(_) => Self::Statistics(message),
            Self::Internal(_) => Self::Internal(message),
        }
    }

    /// The message without the category prefix added by `Display`
    pub fn message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::InvalidParameter(msg)
            | Self::Resolution(msg)
            | Self::ExecutorUnavailable(msg)
            | Self::Execution(msg)
            | Self::Statistics(msg)
            | Self::Internal(msg) => msg,
        }
    }

    fn console_color(&self) -> Color {
        match self {
            Self::Config(_) | Self::InvalidParameter(_) => Color::Red,
            Self::Resolution(_) | Self::ExecutorUnavailable(_) => Color::Yellow,
            Self::Execution(_) => Color::Magenta,
            Self::Statistics(_) => Color::Cyan,
            Self::Internal(_) => Color::BrightRed,
        }
    }

    /// `[CATEGORY] message`, colored by severity when `use_color` is set
    pub fn format_for_console(&self, use_color: bool) -> String {
        if !use_color {
            return format!("[{}] {}", self.category(), self);
        }
        let color = self.console_color();
        format!(
            "[{}] {}",
            self.category().color(color).bold(),
            self.to_string().color(color)
        )
    }
}

/// Malformed service URLs surface while building resolvers and executors
impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Prefix context onto an error's message while keeping its variant, so the
/// exit code and the case-scoped classification survive
pub trait ErrorContext<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E: Into<AppError>> ErrorContext<T> for std::result::Result<T, E> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let error: AppError = e.into();
            error.with_message(format!("{}: {}", f(), error.message()))
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

/// Prints fatal errors and failure summaries to stderr
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));

        if self.verbose {
            eprintln!();
            eprintln!("{}", error.user_friendly_message());
        }
    }

    /// Failed cases grouped by category; verbose mode lists each message
    pub fn format_error_summary(&self, errors: &[&AppError]) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        let mut by_category: BTreeMap<&'static str, Vec<&AppError>> = BTreeMap::new();
        for &error in errors {
            by_category.entry(error.category()).or_default().push(error);
        }

        let mut lines = vec![format!("Found {} error(s):", errors.len())];
        for (category, group) in by_category {
            lines.push(format!("  {}: {} error(s)", category, group.len()));
            if self.verbose {
                lines.extend(group.iter().map(|error| format!("    - {}", error)));
            }
        }
        lines.join("\n")
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}
