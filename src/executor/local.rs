//! In-process executor used as the CPU baseline

use super::{Executor, TrialContext};
use crate::{
    error::{AppError, Result},
    types::Endpoint,
    workload::{Initializer, WorkUnit},
};
use async_trait::async_trait;
use std::hint::black_box;

/// Evaluates work units on the host CPU
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Initialize and run `unit` once, returning the first instance's output
    ///
    /// Used for the sanity computation printed before timing starts.
    pub fn evaluate(&self, unit: &WorkUnit) -> Result<Vec<f32>> {
        let mut context = LocalContext::initialize(unit);
        context.execute();
        Ok(context.instances.into_iter().next().map(|i| i.out).unwrap_or_default())
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn acquire(&self, target: &Endpoint, unit: &WorkUnit) -> Result<Box<dyn TrialContext>> {
        if !target.is_local() {
            return Err(AppError::internal(format!(
                "Local executor cannot run against {}",
                target
            )));
        }
        Ok(Box::new(LocalContext::initialize(unit)))
    }
}

/// Operands and output of one parallel instance
struct AddInstance {
    lhs: Vec<f32>,
    rhs: Vec<f32>,
    out: Vec<f32>,
}

impl AddInstance {
    fn new(size: usize, lhs: &Initializer, rhs: &Initializer) -> Self {
        Self {
            lhs: lhs.materialize(size),
            rhs: rhs.materialize(size),
            out: vec![0.0; size],
        }
    }

    fn add(&mut self) {
        for ((out, lhs), rhs) in self.out.iter_mut().zip(&self.lhs).zip(&self.rhs) {
            *out = lhs + rhs;
        }
    }
}

struct LocalContext {
    instances: Vec<AddInstance>,
}

impl LocalContext {
    fn initialize(unit: &WorkUnit) -> Self {
        let instances = match unit {
            WorkUnit::NoOp => Vec::new(),
            WorkUnit::ElementwiseAdd { size, parallelism, lhs, rhs } => (0..*parallelism)
                .map(|_| AddInstance::new(*size, lhs, rhs))
                .collect(),
        };
        Self { instances }
    }

    fn execute(&mut self) {
        for instance in &mut self.instances {
            instance.add();
            black_box(&instance.out);
        }
    }
}

#[async_trait]
impl TrialContext for LocalContext {
    async fn run(&mut self) -> Result<()> {
        self.execute();
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.instances = Vec::new();
        Ok(())
    }
}
