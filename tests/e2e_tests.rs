//! End-to-end tests for the accelerator latency bench
//!
//! These tests drive the library API the way the binary does: resolve a name,
//! time cases against the local and a mocked remote target, and check the
//! resulting report.

use accelerator_latency_bench::{
    driver::{BenchmarkDriver, CaseOutcome, Progress},
    error::{AppError, Result},
    executor::{Executor, LocalExecutor, RemoteExecutor, TargetExecutor, TrialContext},
    logging::BenchLogger,
    models::Config,
    resolver::{EndpointResolver, MetadataResolver, StaticResolver},
    runner::TimedRunner,
    types::{Endpoint, TargetKind},
    workload::{build_no_op, CaseSpec, WorkUnit},
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

/// Remote executor double that can fail a chosen trial
///
/// Local targets run on the real in-process executor.
struct ScriptedExecutor {
    local: LocalExecutor,
    fail_remote_trial: Option<usize>,
    fail_remote_kind: Option<&'static str>,
    remote_trials: Arc<AtomicUsize>,
    remote_releases: Arc<AtomicUsize>,
}

impl ScriptedExecutor {
    fn new() -> Self {
        Self {
            local: LocalExecutor::new(),
            fail_remote_trial: None,
            fail_remote_kind: None,
            remote_trials: Arc::new(AtomicUsize::new(0)),
            remote_releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_on_trial(trial: usize) -> Self {
        Self {
            fail_remote_trial: Some(trial),
            ..Self::new()
        }
    }

    fn failing_for(kind: &'static str) -> Self {
        Self {
            fail_remote_kind: Some(kind),
            ..Self::new()
        }
    }
}

struct ScriptedContext {
    fail: bool,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl TrialContext for ScriptedContext {
    async fn run(&mut self) -> Result<()> {
        if self.fail {
            Err(AppError::execution("device error"))
        } else {
            Ok(())
        }
    }

    async fn release(&mut self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn acquire(&self, target: &Endpoint, unit: &WorkUnit) -> Result<Box<dyn TrialContext>> {
        if target.is_local() {
            return self.local.acquire(target, unit).await;
        }

        let trial = self.remote_trials.fetch_add(1, Ordering::SeqCst) + 1;
        let kind_fails = match (self.fail_remote_kind, unit) {
            (Some("no_op"), WorkUnit::NoOp) => true,
            (Some("elementwise_add"), WorkUnit::ElementwiseAdd { .. }) => true,
            _ => false,
        };
        Ok(Box::new(ScriptedContext {
            fail: kind_fails || self.fail_remote_trial == Some(trial),
            releases: self.remote_releases.clone(),
        }))
    }
}

fn quiet_logger() -> BenchLogger {
    BenchLogger::new(&Config::default())
}

fn alice_resolver() -> StaticResolver {
    StaticResolver::new().with_address("alice-tpu-0", "10.0.0.5:8470")
}

/// Scenario: resolve, then time a no-op 100 times on each target
#[tokio::test]
async fn test_no_op_local_and_remote() {
    let executor = ScriptedExecutor::new();
    let driver = BenchmarkDriver::new(alice_resolver(), executor, quiet_logger());

    let report = driver.compare("alice-tpu-0", &[CaseSpec::no_op(100)]).await.unwrap();

    assert_eq!(report.endpoint.address(), "10.0.0.5:8470");
    assert_eq!(report.cases.len(), 1);
    match &report.cases[0].outcome {
        CaseOutcome::Completed { local, remote } => {
            assert_eq!(local.count, 100);
            assert_eq!(remote.count, 100);
            assert!(local.mean_ms >= 0.0);
            assert!(remote.mean_ms >= 0.0);
        }
        other => panic!("expected completed case, got {:?}", other),
    }
}

/// Scenario: an empty name fails before any network call
#[tokio::test]
async fn test_empty_name_rejected_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        discovery_url: server.uri(),
        metadata_url: server.uri(),
        ..Default::default()
    };
    let resolver = MetadataResolver::new(&config).unwrap();
    assert!(matches!(resolver.resolve("").await, Err(AppError::InvalidParameter(_))));

    let driver = BenchmarkDriver::new(resolver, ScriptedExecutor::new(), quiet_logger());
    assert!(matches!(
        driver.compare("", &[CaseSpec::no_op(1)]).await,
        Err(AppError::InvalidParameter(_))
    ));
}

/// Scenario: a failure on the 3rd of 10 remote trials yields no result at all
#[tokio::test]
async fn test_mid_run_failure_produces_no_partial_result() {
    let executor = ScriptedExecutor::failing_on_trial(3);
    let trials = executor.remote_trials.clone();
    let releases = executor.remote_releases.clone();
    let logger = quiet_logger();
    let runner = TimedRunner::new(&executor, &logger);
    let target = Endpoint::remote("10.0.0.5:8470").unwrap();

    let result = runner.run(&target, &build_no_op(), 10).await;

    assert!(matches!(result, Err(AppError::Execution(_))));
    assert_eq!(trials.load(Ordering::SeqCst), 3);
    assert_eq!(releases.load(Ordering::SeqCst), 3);
}

/// Scenario: a failing case is reported and the next case still runs
#[tokio::test]
async fn test_case_failure_does_not_stop_later_cases() {
    let executor = ScriptedExecutor::failing_for("elementwise_add");
    let driver = BenchmarkDriver::new(alice_resolver(), executor, quiet_logger());
    let cases = [CaseSpec::elementwise_add(128, 1, 5), CaseSpec::no_op(20)];

    let mut lines = Vec::new();
    let report = driver
        .compare_with("alice-tpu-0", &cases, |progress| {
            if let Progress::Case(case) = progress {
                lines.push((case.label.clone(), case.is_completed()));
            }
        })
        .await
        .unwrap();

    assert_eq!(
        lines,
        vec![
            ("elementwise-add (size=128, parallelism=1)".to_string(), false),
            ("no-op".to_string(), true),
        ]
    );

    match &report.cases[0].outcome {
        CaseOutcome::Failed { target, error, .. } => {
            assert_eq!(*target, Some(TargetKind::Remote));
            assert!(matches!(error, AppError::Execution(_)));
        }
        other => panic!("expected failed case, got {:?}", other),
    }
    assert_eq!(report.cases[1].result(TargetKind::Remote).map(|r| r.count), Some(20));
    assert_eq!(report.failed_count(), 1);
}

/// Scenario: unknown names abort the whole run
#[tokio::test]
async fn test_resolution_failure_aborts_run() {
    let executor = ScriptedExecutor::new();
    let trials = executor.remote_trials.clone();
    let driver = BenchmarkDriver::new(alice_resolver(), executor, quiet_logger());

    let result = driver.compare("bob-tpu-0", &[CaseSpec::no_op(10)]).await;
    assert!(matches!(result, Err(AppError::Resolution(_))));
    assert_eq!(trials.load(Ordering::SeqCst), 0);
}

/// Full stack over HTTP: discovery and the session API both served by wiremock
#[tokio::test]
async fn test_full_stack_over_http() {
    let server = MockServer::start().await;
    let address = server.address().to_string();
    let (ip, port) = address.rsplit_once(':').unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/projects/demo/locations/us-central1-b/nodes/alice-tpu-0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "networkEndpoints": [{ "ipAddress": ip, "port": port.parse::<u16>().unwrap() }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "session_id": "abc" })))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/sessions/abc/run$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/sessions/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&server)
        .await;

    let config = Config {
        discovery_url: server.uri(),
        metadata_url: server.uri(),
        project: Some("demo".to_string()),
        zone: Some("us-central1-b".to_string()),
        access_token: Some("token".to_string()),
        request_timeout_seconds: 5,
        ..Default::default()
    };
    let executor = TargetExecutor::new(LocalExecutor::new(), RemoteExecutor::new(&config).unwrap());
    let driver = BenchmarkDriver::new(MetadataResolver::new(&config).unwrap(), executor, quiet_logger());

    let report = driver.compare("alice-tpu-0", &[CaseSpec::no_op(3)]).await.unwrap();
    assert_eq!(report.endpoint.url(), format!("grpc://{}", address));
    assert!(report.cases[0].is_completed());
    assert!(report.cases[0].comparison().is_some());
}
