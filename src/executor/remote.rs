//! Executor for the accelerator host's session API
//!
//! Every trial opens its own session: creating it initializes the unit's
//! variables on the device, each `run` executes the unit once, and the session
//! is deleted when the trial releases its context.

use super::{Executor, TrialContext};
use crate::{
    error::{AppError, Result},
    models::Config,
    resolver::append_segments,
    types::Endpoint,
    workload::WorkUnit,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    unit: &'a WorkUnit,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

/// Runs work units on a remote accelerator over HTTP
#[derive(Debug, Clone)]
pub struct RemoteExecutor {
    client: Client,
}

impl RemoteExecutor {
    /// Create an executor whose requests time out after the configured request timeout
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Executor for RemoteExecutor {
    async fn acquire(&self, target: &Endpoint, unit: &WorkUnit) -> Result<Box<dyn TrialContext>> {
        let host = match target {
            Endpoint::Remote { address } => Url::parse(&format!("http://{}/", address)).map_err(|e| {
                AppError::executor_unavailable(format!("{} is not a usable address: {}", target, e))
            })?,
            Endpoint::Local => {
                return Err(AppError::internal("Remote executor cannot run against the local target"));
            }
        };
        let sessions_url = append_segments(&host, &["v1", "sessions"])?;

        let response = self
            .client
            .post(sessions_url.clone())
            .json(&CreateSessionRequest { unit })
            .send()
            .await
            .map_err(|e| AppError::executor_unavailable(format!("{} unreachable: {}", target, e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::executor_unavailable(format!(
                "{} refused a new session ({})",
                target, status
            )));
        }
        if !status.is_success() {
            return Err(AppError::execution(format!(
                "{} rejected the work unit ({})",
                target, status
            )));
        }

        let session: CreateSessionResponse = response.json().await.map_err(|e| {
            AppError::execution(format!("Malformed session answer from {}: {}", target, e))
        })?;

        Ok(Box::new(RemoteSession {
            client: self.client.clone(),
            session_url: append_segments(&sessions_url, &[session.session_id.as_str()])?,
            target: target.url(),
            open: true,
        }))
    }
}

struct RemoteSession {
    client: Client,
    /// Session id is a single escaped path segment
    session_url: Url,
    target: String,
    open: bool,
}

#[async_trait]
impl TrialContext for RemoteSession {
    async fn run(&mut self) -> Result<()> {
        if !self.open {
            return Err(AppError::internal("Session already released"));
        }

        let response = self
            .client
            .post(append_segments(&self.session_url, &["run"])?)
            .send()
            .await
            .map_err(|e| AppError::execution(format!("{} run failed: {}", self.target, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::execution(format!(
                "{} run returned {}{}",
                self.target,
                status,
                if detail.trim().is_empty() { String::new() } else { format!(": {}", detail.trim()) }
            )));
        }

        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let response = self
            .client
            .delete(self.session_url.clone())
            .send()
            .await
            .map_err(|e| AppError::execution(format!("{} session release failed: {}", self.target, e)))?;

        if !response.status().is_success() {
            return Err(AppError::execution(format!(
                "{} session release returned {}",
                self.target,
                response.status()
            )));
        }
        Ok(())
    }
}
