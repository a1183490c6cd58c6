pub mod processor;
pub mod run;

pub use processor::*;
pub use run::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::classification::ValidationError;
use crate::pipeline::linking::{LinkError, PersistenceError};
use crate::pipeline::recognition::RecognitionError;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Recognition failed: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Linking failed: {0}")]
    Link(#[from] LinkError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: PipelineStage, to: PipelineStage },

    #[error("Run cancelled")]
    Cancelled,
}

/// Coarse failure class recorded on a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Recognition,
    Link,
    Persistence,
    Internal,
    Cancelled,
}

impl IngestionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::Recognition(_) => FailureKind::Recognition,
            Self::Link(_) => FailureKind::Link,
            Self::Persistence(_) => FailureKind::Persistence,
            Self::InvalidTransition { .. } => FailureKind::Internal,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}
