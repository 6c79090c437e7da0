//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Configuration parser combining defaults, `.env`, the environment and CLI arguments
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        EnvManager::load_env_file(self.cli.debug)?;
        self.parse_without_env_file()
    }

    /// Build the configuration from the process environment and CLI only
    pub fn parse_without_env_file(&self) -> Result<Config> {
        let mut config = Config::default();
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(name) = &self.cli.tpu {
            config.accelerator_name = name.clone();
        }

        if let Some(enable_color) = self.cli.color_override() {
            config.enable_color = enable_color;
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("TPU name: {}", config.accelerator_name));
    match &config.endpoint_override {
        Some(endpoint) => summary.push(format!("TPU endpoint: {} (fixed)", endpoint)),
        None => summary.push(format!("Discovery URL: {}", config.discovery_url)),
    }
    summary.push(format!("Project: {}", config.project.as_deref().unwrap_or("(metadata)")));
    summary.push(format!("Zone: {}", config.zone.as_deref().unwrap_or("(metadata)")));
    summary.push(format!(
        "Repeats: no-op {}, elementwise-add {}",
        config.noop_repeats, config.add_repeats
    ));
    summary.push(format!(
        "Elementwise-add: size {}, parallelism {:?}",
        config.add_size, config.add_parallelism
    ));
    summary.push(format!("Request timeout: {}s", config.request_timeout_seconds));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "TPU_NAME",
        "TPU_ENDPOINT",
        "NOOP_REPEATS",
        "ADD_PARALLELISM",
        "ENABLE_COLOR",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("TPU_NAME", "env-tpu-0");
        env::set_var("NOOP_REPEATS", "50");

        let cli = Cli::parse_from(["alb", "--tpu", "cli-tpu-0", "--verbose"]);
        let config = ConfigParser::new(cli).parse_without_env_file().unwrap();

        assert_eq!(config.accelerator_name, "cli-tpu-0");
        assert_eq!(config.noop_repeats, 50);
        assert!(config.verbose);

        clear_env();
    }

    #[test]
    fn test_env_applies_without_cli_name() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("TPU_NAME", "env-tpu-0");
        env::set_var("ADD_PARALLELISM", "1,2,4");

        let config = ConfigParser::new(Cli::parse_from(["alb", "--no-color"]))
            .parse_without_env_file()
            .unwrap();

        assert_eq!(config.accelerator_name, "env-tpu-0");
        assert_eq!(config.add_parallelism, vec![1, 2, 4]);
        assert!(!config.enable_color);

        clear_env();
    }

    #[test]
    fn test_empty_cli_name_rejected() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let result = ConfigParser::new(Cli::parse_from(["alb", "--tpu", ""])).parse_without_env_file();
        assert!(matches!(result, Err(crate::error::AppError::InvalidParameter(_))));
    }

    #[test]
    fn test_config_summary() {
        let summary = display_config_summary(&Config::default());
        assert!(summary.contains("TPU name:"));
        assert!(summary.contains("Discovery URL: https://tpu.googleapis.com"));
        assert!(summary.contains("Project: (metadata)"));
    }
}
