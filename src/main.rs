//! Accelerator Latency Bench - Main CLI Application
//!
//! Resolves the named TPU, times a no-op and elementwise additions on it and on
//! the local CPU, and prints one line per measurement.

use accelerator_latency_bench::{
    build_info,
    cli::Cli,
    config::{display_config_summary, load_config, validate_config},
    driver::{BenchmarkDriver, Progress},
    error::{AppError, ErrorReporter, Result},
    executor::{LocalExecutor, TargetExecutor},
    logging::LoggerFactory,
    output::OutputFormatterFactory,
    resolver::create_resolver,
    workload::{default_cases, WorkUnit},
};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.color_override().unwrap_or(true), cli.verbose || cli.debug);

    if let Err(e) = run_application(cli).await {
        reporter.report_error(&e);
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!("{}", build_info::summary());
        eprintln!("Debug mode enabled");
        eprintln!();
    }

    let config = load_config(cli)?;
    colored::control::set_override(config.enable_color);

    let formatter = OutputFormatterFactory::create_formatter(config.enable_color, config.verbose);

    if config.debug {
        eprintln!("Configuration loaded successfully:");
        for line in display_config_summary(&config).lines() {
            eprintln!("  {}", line);
        }
        eprintln!();
    }

    if config.verbose || config.debug {
        for warning in validate_config(&config)? {
            eprintln!("{}", warning.format(config.enable_color));
        }
    }

    let factory = LoggerFactory::new(config.clone());
    let logger = factory.create_bench_logger().await;

    // Smoke test of the local path before anything is timed; printed under the URL
    let sanity = LocalExecutor::new().evaluate(&WorkUnit::sanity_check())?;
    let sanity_line = formatter.format_sanity_check(&sanity)?;

    let resolver = create_resolver(&config)?;
    let executor = TargetExecutor::from_config(&config)?;
    let driver = BenchmarkDriver::new(resolver, executor, logger);

    let cases = default_cases(&config);
    let mut output_error: Option<AppError> = None;

    let report = driver
        .compare_with(&config.accelerator_name, &cases, |progress| {
            if output_error.is_some() {
                return;
            }
            let lines = match progress {
                Progress::Resolved { endpoint, .. } => formatter
                    .format_header(endpoint)
                    .map(|header| vec![header, sanity_line.clone()]),
                Progress::Case(case) => formatter.format_case(case),
            };
            match lines {
                Ok(lines) => lines.iter().for_each(|line| println!("{}", line)),
                Err(e) => output_error = Some(e),
            }
        })
        .await?;

    if let Some(e) = output_error {
        return Err(e);
    }

    println!();
    println!("{}", formatter.format_summary(&report)?);

    let failures: Vec<&AppError> = report.cases.iter().filter_map(|c| c.error()).collect();
    if !failures.is_empty() && (config.verbose || config.debug) {
        let reporter = ErrorReporter::new(config.enable_color, true);
        eprintln!("{}", reporter.format_error_summary(&failures));
    }

    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - DISCOVERY_URL and METADATA_URL must start with http:// or https://");
            eprintln!("  - TPU_ENDPOINT must look like host:port");
            eprintln!("  - Repeats, ADD_SIZE and ADD_PARALLELISM levels must be at least 1");
            eprintln!(
                "  - ADD_SIZE times the largest parallelism level must not exceed {}",
                accelerator_latency_bench::defaults::MAX_ADD_ELEMENTS
            );
        }
        AppError::InvalidParameter(_) => {
            eprintln!();
            eprintln!("Pass a non-empty name with --tpu or TPU_NAME.");
        }
        AppError::Resolution(_) => {
            eprintln!();
            eprintln!("Resolution troubleshooting:");
            eprintln!("  - Check the TPU name and that it exists in the expected zone");
            eprintln!("  - Outside a cloud VM, set GCP_PROJECT, GCP_ZONE and ACCESS_TOKEN");
            eprintln!("  - Or skip discovery with TPU_ENDPOINT=host:port");
        }
        _ => {}
    }
}
