//! Execution of work units against a local or remote target
//!
//! This module contains the executor seam used by the timed runner:
//! - [`Executor`] acquires one isolated [`TrialContext`] per trial
//! - [`LocalExecutor`] evaluates units in-process as the CPU baseline
//! - [`RemoteExecutor`] drives the accelerator host's session API
//! - [`TargetExecutor`] dispatches on the endpoint kind

pub mod local;
pub mod remote;

pub use local::LocalExecutor;
pub use remote::RemoteExecutor;

use crate::{
    error::Result,
    models::Config,
    types::Endpoint,
    workload::WorkUnit,
};
use async_trait::async_trait;

/// Executable context bound to one target and one work unit
///
/// A context is owned by exactly one trial. Variables are initialized when the
/// context is acquired and are gone once it is released.
#[async_trait]
pub trait TrialContext: Send {
    /// Execute the unit once, synchronously to completion
    async fn run(&mut self) -> Result<()>;

    /// Release everything the context holds
    async fn release(&mut self) -> Result<()>;
}

/// Capability to acquire trial contexts for a target
#[async_trait]
pub trait Executor: Send + Sync {
    /// Acquire a fresh context for `unit` on `target`, initializing its variables
    async fn acquire(&self, target: &Endpoint, unit: &WorkUnit) -> Result<Box<dyn TrialContext>>;
}

/// Executor that runs local targets in-process and remote targets over the network
pub struct TargetExecutor {
    local: LocalExecutor,
    remote: RemoteExecutor,
}

impl TargetExecutor {
    pub fn new(local: LocalExecutor, remote: RemoteExecutor) -> Self {
        Self { local, remote }
    }

    /// Create the executor pair from the application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(LocalExecutor::new(), RemoteExecutor::new(config)?))
    }
}

#[async_trait]
impl Executor for TargetExecutor {
    async fn acquire(&self, target: &Endpoint, unit: &WorkUnit) -> Result<Box<dyn TrialContext>> {
        match target {
            Endpoint::Local => self.local.acquire(target, unit).await,
            Endpoint::Remote { .. } => self.remote.acquire(target, unit).await,
        }
    }
}
