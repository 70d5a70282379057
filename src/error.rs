//! Error taxonomy shared by the catalogue, genealogy and batch layers.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::NodeId;

pub type Result<T> = std::result::Result<T, HaloError>;

#[derive(Debug, Error)]
pub enum HaloError {
    #[error("halo {0} not found in catalogue")]
    NotFound(NodeId),

    #[error("halo {0} is not a host halo")]
    InvalidHalo(NodeId),

    #[error("cycle detected at halo {id} (bound {bound})")]
    CycleDetected { id: NodeId, bound: usize },

    #[error("unsupported catalogue format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("malformed catalogue: {0}")]
    MalformedCatalog(String),

    #[error("invalid mass fraction threshold {0} (must be finite and >= 0)")]
    InvalidThreshold(f64),

    #[error("worker failed on item #{index} ({input}): {cause}")]
    WorkerFailure {
        index: usize,
        input: String,
        #[source]
        cause: Box<HaloError>,
    },

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl HaloError {
    /// Short stable name of the error kind, used in CLI messages.
    pub fn kind(&self) -> &'static str {
        match self {
            HaloError::NotFound(_) => "NotFound",
            HaloError::InvalidHalo(_) => "InvalidHalo",
            HaloError::CycleDetected { .. } => "CycleDetected",
            HaloError::UnsupportedFormat(_) => "UnsupportedFormat",
            HaloError::MalformedCatalog(_) => "MalformedCatalog",
            HaloError::InvalidThreshold(_) => "InvalidThreshold",
            HaloError::WorkerFailure { .. } => "WorkerFailure",
            HaloError::Panicked(_) => "Panicked",
        }
    }

    /// Unwraps a `WorkerFailure` down to the error that caused it.
    pub fn root_cause(&self) -> &HaloError {
        match self {
            HaloError::WorkerFailure { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}
