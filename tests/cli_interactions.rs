//! CLI options interaction tests
//!
//! These tests run the `alb` binary with a controlled environment and check
//! exit codes and report lines. No test needs a real accelerator: discovery
//! points at a closed port and remote sessions at an unreachable address.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;
use std::fs;

const CONFIG_VARS: &[&str] = &[
    "TPU_NAME",
    "TPU_ENDPOINT",
    "GCP_PROJECT",
    "GCP_ZONE",
    "ACCESS_TOKEN",
    "DISCOVERY_URL",
    "METADATA_URL",
    "NOOP_REPEATS",
    "ADD_REPEATS",
    "ADD_SIZE",
    "ADD_PARALLELISM",
    "REQUEST_TIMEOUT_SECONDS",
    "ENABLE_COLOR",
];

/// Helper function to create a test command isolated from the caller's
/// environment and any `.env` in the source tree
fn create_test_cmd(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("alb").unwrap();
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(workdir.path())
        .env("NOOP_REPEATS", "3")
        .env("ADD_REPEATS", "2")
        .env("ADD_SIZE", "64")
        .env("REQUEST_TIMEOUT_SECONDS", "2")
        .arg("--no-color");
    cmd
}

/// Point discovery and metadata at a port nothing listens on
fn with_unreachable_discovery(cmd: &mut Command) -> &mut Command {
    cmd.env("DISCOVERY_URL", "http://127.0.0.1:1")
        .env("METADATA_URL", "http://127.0.0.1:1")
        .env("GCP_PROJECT", "demo")
        .env("GCP_ZONE", "us-central1-b")
        .env("ACCESS_TOKEN", "token")
}

#[test]
fn test_help_lists_options_and_environment() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--tpu"))
        .stdout(predicate::str::contains("--no-color"))
        .stdout(predicate::str::contains("TPU_ENDPOINT"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_color_flags_conflict() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--color")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_empty_name_exits_with_invalid_parameter() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--tpu")
        .arg("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("name cannot be empty"));
}

#[test]
fn test_invalid_env_value_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .env("NOOP_REPEATS", "many")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("NOOP_REPEATS"));
}

#[test]
fn test_unreachable_discovery_exits_with_resolution_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = create_test_cmd(&dir);
    with_unreachable_discovery(&mut cmd)
        .arg("--tpu")
        .arg("alice-tpu-0")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("TPU URL").not());
}

#[test]
fn test_unreachable_accelerator_reports_failed_cases() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .env("TPU_ENDPOINT", "127.0.0.1:1")
        .env("ADD_PARALLELISM", "1")
        .arg("--tpu")
        .arg("alice-tpu-0")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("TPU URL: grpc://127.0.0.1:1\n4\n"))
        .stdout(predicate::str::contains("CPU no-op time:"))
        .stdout(predicate::str::contains("TPU no-op FAILED"))
        .stdout(predicate::str::contains("CPU elementwise-add (size=64, parallelism=1) time:"));
}

#[test]
fn test_debug_diagnostics_stay_off_stdout() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .env("TPU_ENDPOINT", "127.0.0.1:1")
        .env("ADD_PARALLELISM", "1")
        .arg("--tpu")
        .arg("alice-tpu-0")
        .arg("--debug")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("TPU URL: grpc://127.0.0.1:1\n4\n"))
        .stdout(predicate::str::contains("Debug mode enabled").not())
        .stdout(predicate::str::contains("Configuration loaded").not())
        .stderr(predicate::str::contains("Debug mode enabled"))
        .stderr(predicate::str::contains("Configuration loaded successfully:"));
}

#[test]
fn test_oversized_add_size_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .env("ADD_SIZE", usize::MAX.to_string())
        .arg("--tpu")
        .arg("alice-tpu-0")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("TPU URL").not())
        .stderr(predicate::str::contains("cannot exceed"));
}

#[test]
fn test_env_file_in_working_directory_is_read() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".env"),
        "TPU_ENDPOINT=127.0.0.1:1\nADD_PARALLELISM=2\n",
    )
    .unwrap();

    create_test_cmd(&dir)
        .arg("--tpu")
        .arg("bob-tpu-0")
        .assert()
        .success()
        .stdout(predicate::str::contains("TPU URL: grpc://127.0.0.1:1"))
        .stdout(predicate::str::contains("parallelism=2"));
}
