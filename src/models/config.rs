//! Configuration data model and validation

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Symbolic name of the accelerator to benchmark
    #[serde(default = "default_accelerator_name")]
    pub accelerator_name: String,

    /// Base URL of the accelerator discovery API
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,

    /// Base URL of the instance metadata server
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    /// Cloud project owning the accelerator (asked from metadata when unset)
    #[serde(default)]
    pub project: Option<String>,

    /// Zone of the accelerator (asked from metadata when unset)
    #[serde(default)]
    pub zone: Option<String>,

    /// Bearer token for the discovery API (asked from metadata when unset)
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Fixed `host:port` for the accelerator, bypassing discovery
    #[serde(default)]
    pub endpoint_override: Option<String>,

    /// Trials per target for the no-op case
    #[serde(default = "default_noop_repeats")]
    pub noop_repeats: u32,

    /// Trials per target for each elementwise-add case
    #[serde(default = "default_add_repeats")]
    pub add_repeats: u32,

    /// Tensor size of the elementwise-add cases
    #[serde(default = "default_add_size")]
    pub add_size: usize,

    /// Parallelism levels, one elementwise-add case each
    #[serde(default = "default_add_parallelism")]
    pub add_parallelism: Vec<usize>,

    /// Timeout for discovery and session requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_seconds: u64,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accelerator_name: default_accelerator_name(),
            discovery_url: default_discovery_url(),
            metadata_url: default_metadata_url(),
            project: None,
            zone: None,
            access_token: None,
            endpoint_override: None,
            noop_repeats: default_noop_repeats(),
            add_repeats: default_add_repeats(),
            add_size: default_add_size(),
            add_parallelism: default_add_parallelism(),
            request_timeout_seconds: default_request_timeout_secs(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.accelerator_name.trim().is_empty() {
            return Err(AppError::invalid_parameter("Accelerator name cannot be empty"));
        }

        for (label, value) in [("discovery URL", &self.discovery_url), ("metadata URL", &self.metadata_url)] {
            match url::Url::parse(value) {
                Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
                Ok(parsed) => {
                    return Err(AppError::config(format!(
                        "Invalid {} '{}': unsupported scheme '{}'",
                        label, value, parsed.scheme()
                    )));
                }
                Err(e) => return Err(AppError::config(format!("Invalid {} '{}': {}", label, value, e))),
            }
        }

        for (label, value) in [("project", &self.project), ("zone", &self.zone)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(AppError::config(format!("GCP {} cannot be empty when set", label)));
            }
        }

        if let Some(endpoint) = &self.endpoint_override {
            crate::types::Endpoint::remote(endpoint.as_str())
                .map_err(|e| AppError::config(format!("Invalid TPU_ENDPOINT: {}", e.message())))?;
        }

        for (label, repeats) in [("No-op repeats", self.noop_repeats), ("Elementwise-add repeats", self.add_repeats)] {
            if repeats == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", label)));
            }
            if repeats > crate::defaults::MAX_REPEATS {
                return Err(AppError::config(format!(
                    "{} cannot exceed {}",
                    label,
                    crate::defaults::MAX_REPEATS
                )));
            }
        }

        if self.add_size == 0 {
            return Err(AppError::config("Elementwise-add size must be greater than 0"));
        }

        if self.add_parallelism.is_empty() {
            return Err(AppError::config("At least one parallelism level is required"));
        }

        if self.add_parallelism.contains(&0) {
            return Err(AppError::config("Parallelism levels must be at least 1"));
        }

        if self.add_size > crate::defaults::MAX_ADD_SIZE {
            return Err(AppError::config(format!(
                "Elementwise-add size cannot exceed {}",
                crate::defaults::MAX_ADD_SIZE
            )));
        }

        let widest = self.add_parallelism.iter().copied().max().unwrap_or(1);
        match self.add_size.checked_mul(widest) {
            Some(total) if total <= crate::defaults::MAX_ADD_ELEMENTS => {}
            _ => {
                return Err(AppError::config(format!(
                    "Elementwise-add size times parallelism cannot exceed {}",
                    crate::defaults::MAX_ADD_ELEMENTS
                )));
            }
        }

        if self.request_timeout_seconds == 0 {
            return Err(AppError::config("Request timeout must be greater than 0"));
        }

        if self.request_timeout_seconds > 600 {
            return Err(AppError::config("Request timeout cannot exceed 600 seconds"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(name) = std::env::var("TPU_NAME") {
            self.accelerator_name = name.trim().to_string();
        }

        if let Ok(url) = std::env::var("DISCOVERY_URL") {
            self.discovery_url = url.trim().to_string();
        }

        if let Ok(url) = std::env::var("METADATA_URL") {
            self.metadata_url = url.trim().to_string();
        }

        if let Ok(project) = std::env::var("GCP_PROJECT") {
            self.project = Some(project.trim().to_string());
        }

        if let Ok(zone) = std::env::var("GCP_ZONE") {
            self.zone = Some(zone.trim().to_string());
        }

        if let Ok(token) = std::env::var("ACCESS_TOKEN") {
            let token = token.trim();
            if !token.is_empty() {
                self.access_token = Some(token.to_string());
            }
        }

        if let Ok(endpoint) = std::env::var("TPU_ENDPOINT") {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                self.endpoint_override = Some(endpoint.to_string());
            }
        }

        if let Ok(repeats) = std::env::var("NOOP_REPEATS") {
            self.noop_repeats = repeats.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid NOOP_REPEATS value '{}': {}", repeats, e)))?;
        }

        if let Ok(repeats) = std::env::var("ADD_REPEATS") {
            self.add_repeats = repeats.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ADD_REPEATS value '{}': {}", repeats, e)))?;
        }

        if let Ok(size) = std::env::var("ADD_SIZE") {
            self.add_size = size.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ADD_SIZE value '{}': {}", size, e)))?;
        }

        if let Ok(levels) = std::env::var("ADD_PARALLELISM") {
            self.add_parallelism = parse_parallelism_list(&levels)?;
        }

        if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid REQUEST_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Parse a comma-separated list of parallelism levels such as `1,8`
pub fn parse_parallelism_list(value: &str) -> Result<Vec<usize>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| AppError::config(format!("Invalid ADD_PARALLELISM entry '{}': {}", s, e)))
        })
        .collect()
}

/// Login name of the invoking user, used to derive the default accelerator name
pub fn login_name() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "user".to_string())
}

// Default value functions for serde
pub fn default_accelerator_name() -> String {
    format!("{}{}", login_name(), crate::defaults::ACCELERATOR_NAME_SUFFIX)
}

fn default_discovery_url() -> String {
    crate::defaults::DEFAULT_DISCOVERY_URL.to_string()
}

fn default_metadata_url() -> String {
    crate::defaults::DEFAULT_METADATA_URL.to_string()
}

fn default_noop_repeats() -> u32 {
    crate::defaults::DEFAULT_NOOP_REPEATS
}

fn default_add_repeats() -> u32 {
    crate::defaults::DEFAULT_ADD_REPEATS
}

fn default_add_size() -> usize {
    crate::defaults::DEFAULT_ADD_SIZE
}

fn default_add_parallelism() -> Vec<usize> {
    crate::defaults::DEFAULT_ADD_PARALLELISM.to_vec()
}

fn default_request_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
