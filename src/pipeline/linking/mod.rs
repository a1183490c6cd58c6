pub mod export;
pub mod linker;
pub mod merge;
pub mod store;
pub mod types;

pub use export::*;
pub use linker::*;
pub use merge::*;
pub use store::*;
pub use types::*;

use thiserror::Error;

/// Link-strength thresholds.
pub mod thresholds {
    /// Mappings below this never reach `linked_fields`.
    pub const RETAIN: f32 = 0.70;

    /// Links below this strength require review.
    pub const STRONG: f32 = 0.85;

    /// Links below this strength are reported by `validate_links`.
    pub const WEAK: f32 = 0.50;
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Form record not found: {0}")]
    FormRecordNotFound(String),

    #[error("Form record already exists: {0}")]
    FormRecordExists(String),

    #[error("Document already linked: {0}")]
    AlreadyLinked(String),

    #[error("Linker lock poisoned")]
    LockPoisoned,

    #[error("Inconsistent import: {0}")]
    InconsistentImport(String),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No stored form record: {0}")]
    NotFound(String),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Persistence worker failed: {0}")]
    WorkerFailed(String),
}
