//! Structured logging for the accelerator latency bench
//!
//! Entries carry a level, a message, an optional correlation ID and arbitrary
//! JSON fields. They render as a console line or as one JSON object per line,
//! always on stderr. `BenchLogger` wraps a `Logger` with one method per
//! benchmark event.

use crate::error::AppError;
use crate::models::Config;
use crate::stats::TimingResult;
use crate::types::{Endpoint, SymbolicName, TargetKind};
use chrono::{DateTime, Utc};
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

type Fields = BTreeMap<String, serde_json::Value>;

/// Severity of a log entry, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn color(&self) -> Color {
        match self {
            LogLevel::Debug => Color::Cyan,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    /// Most verbose level the configuration lets through
    fn threshold(config: &Config) -> Self {
        if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }
}

/// One structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: Fields,
}

/// How entries are rendered
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Console,
    /// One JSON object per line, selected by `--debug`
    Json,
}

/// Fields attached to every entry a logger writes
#[derive(Debug, Default)]
struct SharedFields {
    session_id: Option<String>,
    extra: Fields,
}

/// Leveled logger writing to stderr
pub struct Logger {
    name: String,
    threshold: LogLevel,
    format: LogFormat,
    use_color: bool,
    shared: Arc<RwLock<SharedFields>>,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self {
            name,
            threshold: LogLevel::Info,
            format: LogFormat::Console,
            use_color: true,
            shared: Arc::new(RwLock::new(SharedFields::default())),
        }
    }

    /// Level, format and color follow the configuration's verbosity flags
    pub fn with_config(name: String, config: &Config) -> Self {
        Self {
            threshold: LogLevel::threshold(config),
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            use_color: config.enable_color,
            ..Self::new(name)
        }
    }

    pub async fn set_session_id(&self, session_id: String) {
        self.shared.write().await.session_id = Some(session_id);
    }

    /// Attach a field to every later entry
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.shared.write().await.extra.insert(key.to_string(), value);
        }
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.threshold
    }

    pub fn entry(&self, level: LogLevel, message: impl Into<String>) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                logger: self.name.clone(),
                message: message.into(),
                correlation_id: None,
                fields: Fields::new(),
            },
        }
    }

    pub fn debug(&self, message: impl Into<String>) -> LogEntryBuilder<'_> {
        self.entry(LogLevel::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) -> LogEntryBuilder<'_> {
        self.entry(LogLevel::Info, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> LogEntryBuilder<'_> {
        self.entry(LogLevel::Warn, message)
    }

    pub fn error(&self, message: impl Into<String>) -> LogEntryBuilder<'_> {
        self.entry(LogLevel::Error, message)
    }

    async fn emit(&self, mut entry: LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }

        {
            let shared = self.shared.read().await;
            if let Some(session_id) = &shared.session_id {
                entry.fields.insert("session_id".to_string(), session_id.clone().into());
            }
            entry.fields.extend(shared.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        // stdout carries only report lines
        let _ = writeln!(io::stderr().lock(), "{}", self.render(&entry));
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.render_console(entry),
            LogFormat::Json => serde_json::to_string(entry)
                .unwrap_or_else(|e| format!("{{\"level\":\"ERROR\",\"message\":\"unserializable log entry: {}\"}}", e)),
        }
    }

    fn render_console(&self, entry: &LogEntry) -> String {
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color {
            level.color(entry.level.color()).to_string()
        } else {
            level
        };

        let mut line = format!(
            "{} {} [{}] {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            level,
            entry.logger,
            entry.message
        );

        if let Some(id) = &entry.correlation_id {
            line.push_str(&format!(" [{}]", id.get(..8).unwrap_or(id.as_str())));
        }

        if !entry.fields.is_empty() {
            let fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            line.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        line
    }
}

/// Accumulates fields for one entry; nothing is written until `log`
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), value);
        }
        self
    }

    pub fn timing(self, result: &TimingResult) -> Self {
        self.field("mean_ms", result.mean_ms)
            .field("std_ms", result.std_ms)
            .field("min_ms", result.min_ms)
            .field("max_ms", result.max_ms)
            .field("count", result.count)
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_case_scoped", error.is_case_scoped())
            .field("error_exit_code", error.exit_code())
    }

    pub async fn log(self) {
        self.logger.emit(self.entry).await;
    }
}

/// Logger for benchmark events: resolution, trials, results and failures
pub struct BenchLogger {
    logger: Logger,
}

impl BenchLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("BENCH".to_string(), config),
        }
    }

    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    /// Fresh correlation ID for one benchmark case
    pub fn new_case_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// The single informational record of a resolved endpoint
    pub async fn log_resolution(&self, name: &SymbolicName, endpoint: &Endpoint) {
        self.logger
            .info(format!("Resolved {} to {}", name, endpoint.url()))
            .field("accelerator", name.as_str())
            .field("address", endpoint.address())
            .log()
            .await;
    }

    pub async fn log_trial(&self, case: &str, target: TargetKind, index: usize, elapsed: Duration) {
        self.logger
            .debug(format!("Trial {} of {} on {}", index + 1, case, target))
            .field("case", case)
            .field("target", target)
            .field("trial", index + 1)
            .field("elapsed_ms", elapsed.as_secs_f64() * 1000.0)
            .log()
            .await;
    }

    /// Summary for one (case, target) pair
    pub async fn log_result(&self, case_id: &str, case: &str, target: TargetKind, result: &TimingResult) {
        self.logger
            .info(format!("{} {} mean={}ms std={}ms", target, case, result.format_mean(), result.format_std()))
            .correlation_id(case_id)
            .field("case", case)
            .field("target", target)
            .timing(result)
            .log()
            .await;
    }

    pub async fn log_case_failure(&self, case_id: &str, case: &str, target: Option<TargetKind>, error: &AppError) {
        self.logger
            .error(format!("Case {} failed: {}", case, error))
            .correlation_id(case_id)
            .field("case", case)
            .field("target", target)
            .error_info(error)
            .log()
            .await;
    }

    pub async fn log_release_failure(&self, target: TargetKind, error: &AppError) {
        self.logger
            .warn(format!("Failed to release {} trial context: {}", target, error))
            .field("target", target)
            .error_info(error)
            .log()
            .await;
    }

    pub async fn log_scaling_violation(&self, description: &str) {
        self.logger
            .warn(format!("Scaling regression: {}", description))
            .log()
            .await;
    }
}

/// Hands out loggers that share one session ID
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    /// Benchmark logger tagged with the accelerator under test
    pub async fn create_bench_logger(&self) -> BenchLogger {
        let logger = self.create_logger("BENCH").await;
        logger.add_context_field("accelerator", &self.config.accelerator_name).await;
        BenchLogger::from_logger(logger)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
