//! Configuration validation utilities and rules
//!
//! `Config::validate` rejects configurations that cannot run. The checks here
//! only warn about settings that run but are likely to give poor measurements.

use crate::{error::Result, models::Config};
use colored::*;

/// Repeat counts below this give a noisy standard deviation
const MIN_USEFUL_REPEATS: u32 = 5;

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration, then collect warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_service_urls(config));
        warnings.extend(Self::validate_workload(config));
        warnings.extend(Self::validate_discovery_settings(config));
        Ok(warnings)
    }

    fn validate_service_urls(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Ok(parsed) = url::Url::parse(&config.discovery_url) {
            if parsed.scheme() == "http" && config.access_token.is_some() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Discovery URL '{}' uses HTTP; the access token will be sent unencrypted",
                        config.discovery_url
                    ),
                ));
            }
        }

        if config.discovery_url != crate::defaults::DEFAULT_DISCOVERY_URL {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Using custom discovery URL '{}'", config.discovery_url),
            ));
        }

        warnings
    }

    fn validate_workload(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (label, repeats) in [("NOOP_REPEATS", config.noop_repeats), ("ADD_REPEATS", config.add_repeats)] {
            if repeats < MIN_USEFUL_REPEATS {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("{}={} gives a noisy standard deviation; use at least {}", label, repeats, MIN_USEFUL_REPEATS),
                ));
            }
        }

        if config.noop_repeats < config.add_repeats {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "No-op runs fewer trials than elementwise-add; cheap operations need more repeats to average out jitter",
            ));
        }

        if config.add_parallelism.iter().any(|&p| p > 1) && !config.add_parallelism.contains(&1) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "ADD_PARALLELISM has no level 1; scaling cannot be checked without a single-instance baseline",
            ));
        }

        let mut sorted = config.add_parallelism.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != config.add_parallelism.len() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "ADD_PARALLELISM contains duplicate levels; each is timed separately",
            ));
        }

        warnings
    }

    fn validate_discovery_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Some(endpoint) = &config.endpoint_override {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("TPU_ENDPOINT is set; discovery is skipped and {} is used directly", endpoint),
            ));
        } else if config.project.is_none() || config.zone.is_none() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "GCP_PROJECT or GCP_ZONE not set; they will be read from the instance metadata server",
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Warning => Color::Yellow,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new<S: Into<String>>(level: ValidationLevel, message: S) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
