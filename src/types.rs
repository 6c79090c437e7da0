//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Human-assigned name of an accelerator instance, e.g. `alice-tpu-0`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolicName(String);

impl SymbolicName {
    /// Create a symbolic name, rejecting empty (or whitespace-only) input
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::invalid_parameter("Accelerator name cannot be empty"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a trial executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    /// In-process baseline, no remote target
    Local,
    /// Reachable `host:port` of a resolved accelerator
    Remote { address: String },
}

impl Endpoint {
    /// Create a remote endpoint from a `host:port` string
    pub fn remote<S: Into<String>>(address: S) -> Result<Self> {
        let address = address.into();
        validate_address(&address)?;
        Ok(Self::Remote { address })
    }

    /// The raw address, empty for the local sentinel
    pub fn address(&self) -> &str {
        match self {
            Endpoint::Local => "",
            Endpoint::Remote { address } => address,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Endpoint::Local)
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Endpoint::Local => TargetKind::Local,
            Endpoint::Remote { .. } => TargetKind::Remote,
        }
    }

    /// Session URL shown to operators, e.g. `grpc://10.0.0.5:8470`
    pub fn url(&self) -> String {
        match self {
            Endpoint::Local => "local".to_string(),
            Endpoint::Remote { address } => format!("grpc://{}", address),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Which side of the comparison a measurement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Local,
    Remote,
}

impl TargetKind {
    /// Label used at the start of report lines
    pub fn label(&self) -> &'static str {
        match self {
            TargetKind::Local => "CPU",
            TargetKind::Remote => "TPU",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Check that an address is a non-empty `host:port` with a numeric port
fn validate_address(address: &str) -> Result<()> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| AppError::resolution(format!("Malformed address '{}': missing port", address)))?;

    if host.is_empty() {
        return Err(AppError::resolution(format!("Malformed address '{}': missing host", address)));
    }

    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(AppError::resolution(format!(
            "Malformed address '{}': invalid port '{}'",
            address, port
        ))),
        Ok(_) => Ok(()),
    }
}
