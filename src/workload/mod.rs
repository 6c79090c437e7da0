//! Work units: inert descriptions of the computations a trial executes
//!
//! A [`WorkUnit`] only declares shape and initialization. Variable data is
//! materialized by the executor every time a trial acquires its context, so no
//! state survives from one trial to the next.

use crate::defaults::{MAX_ADD_ELEMENTS, MAX_ADD_SIZE};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the variables of a unit are initialized at context acquisition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Initializer {
    /// Uniform samples in `[0, 1)`
    RandomUniform,
    /// Every element set to the same value
    Constant { value: f32 },
}

impl Initializer {
    /// Materialize `len` values
    pub fn materialize(&self, len: usize) -> Vec<f32> {
        match *self {
            Initializer::RandomUniform => {
                use rand::Rng;
                let mut rng = rand::thread_rng();
                (0..len).map(|_| rng.gen::<f32>()).collect()
            }
            Initializer::Constant { value } => vec![value; len],
        }
    }
}

/// Declared shape of a unit: `instances` independent tensors of `elements` each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub instances: usize,
    pub elements: usize,
}

/// Description of a computation to execute once per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkUnit {
    /// Does nothing; measures pure dispatch overhead
    NoOp,
    /// `parallelism` independent `lhs + rhs` additions over `size` elements
    ElementwiseAdd {
        size: usize,
        parallelism: usize,
        lhs: Initializer,
        rhs: Initializer,
    },
}

/// Build a no-op unit
pub fn build_no_op() -> WorkUnit {
    WorkUnit::NoOp
}

/// Build an elementwise addition of two random-uniform operands
pub fn build_elementwise_add(size: usize, parallelism: usize) -> Result<WorkUnit> {
    build_elementwise_add_with(size, parallelism, Initializer::RandomUniform, Initializer::RandomUniform)
}

/// Build an elementwise addition with explicit operand initializers
pub fn build_elementwise_add_with(
    size: usize,
    parallelism: usize,
    lhs: Initializer,
    rhs: Initializer,
) -> Result<WorkUnit> {
    if size == 0 {
        return Err(AppError::invalid_parameter("Elementwise-add size must be greater than 0"));
    }
    if parallelism == 0 {
        return Err(AppError::invalid_parameter("Elementwise-add parallelism must be at least 1"));
    }
    if size > MAX_ADD_SIZE {
        return Err(AppError::invalid_parameter(format!(
            "Elementwise-add size {} exceeds the limit of {}",
            size, MAX_ADD_SIZE
        )));
    }
    match size.checked_mul(parallelism) {
        Some(total) if total <= MAX_ADD_ELEMENTS => {}
        _ => {
            return Err(AppError::invalid_parameter(format!(
                "Elementwise-add of {} x {} elements exceeds the limit of {}",
                parallelism, size, MAX_ADD_ELEMENTS
            )));
        }
    }
    Ok(WorkUnit::ElementwiseAdd { size, parallelism, lhs, rhs })
}

impl WorkUnit {
    /// `alpha = 3.0; beta = alpha + 1`, evaluated once as a smoke test
    pub fn sanity_check() -> Self {
        WorkUnit::ElementwiseAdd {
            size: 1,
            parallelism: 1,
            lhs: Initializer::Constant { value: 3.0 },
            rhs: Initializer::Constant { value: 1.0 },
        }
    }

    /// Number of operations one execution performs
    pub fn op_count(&self) -> usize {
        match self {
            WorkUnit::NoOp => 1,
            WorkUnit::ElementwiseAdd { parallelism, .. } => *parallelism,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            WorkUnit::NoOp => Shape { instances: 1, elements: 0 },
            WorkUnit::ElementwiseAdd { size, parallelism, .. } => Shape {
                instances: *parallelism,
                elements: *size,
            },
        }
    }

    /// Parallelism of the unit; a no-op counts as a single instance
    pub fn parallelism(&self) -> usize {
        self.shape().instances
    }

    /// Human-readable label used in report lines
    pub fn label(&self) -> String {
        match self {
            WorkUnit::NoOp => "no-op".to_string(),
            WorkUnit::ElementwiseAdd { size, parallelism, .. } => {
                format!("elementwise-add (size={}, parallelism={})", size, parallelism)
            }
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Kind of work a benchmark case asks for, before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkKind {
    NoOp,
    ElementwiseAdd { size: usize, parallelism: usize },
}

/// One benchmark case: what to build and how many trials per target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSpec {
    pub kind: WorkKind,
    pub repeats: u32,
}

impl CaseSpec {
    pub fn no_op(repeats: u32) -> Self {
        Self { kind: WorkKind::NoOp, repeats }
    }

    pub fn elementwise_add(size: usize, parallelism: usize, repeats: u32) -> Self {
        Self {
            kind: WorkKind::ElementwiseAdd { size, parallelism },
            repeats,
        }
    }

    /// Build the work unit this case describes
    pub fn build(&self) -> Result<WorkUnit> {
        if self.repeats == 0 {
            return Err(AppError::invalid_parameter(format!(
                "Case '{}' needs at least one repeat",
                self.label()
            )));
        }
        match self.kind {
            WorkKind::NoOp => Ok(build_no_op()),
            WorkKind::ElementwiseAdd { size, parallelism } => build_elementwise_add(size, parallelism),
        }
    }

    /// Case identity for reports, available even when the unit cannot be built
    pub fn label(&self) -> String {
        match self.kind {
            WorkKind::NoOp => "no-op".to_string(),
            WorkKind::ElementwiseAdd { size, parallelism } => {
                format!("elementwise-add (size={}, parallelism={})", size, parallelism)
            }
        }
    }
}

/// Cases the binary runs: a no-op, then one elementwise add per parallelism level
pub fn default_cases(config: &crate::models::Config) -> Vec<CaseSpec> {
    let mut cases = vec![CaseSpec::no_op(config.noop_repeats)];
    cases.extend(
        config
            .add_parallelism
            .iter()
            .map(|&p| CaseSpec::elementwise_add(config.add_size, p, config.add_repeats)),
    );
    cases
}
