pub mod classify;
pub mod sections;
pub mod similarity;
pub mod types;
pub mod validation;

pub use classify::*;
pub use sections::*;
pub use similarity::*;
pub use types::*;
pub use validation::*;

use thiserror::Error;

/// A file rejected at the input gate. Not retryable without a new upload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File too large: {size_bytes} bytes (max {max_bytes})")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("Uploaded file is empty: {0}")]
    EmptyFile(String),

    #[error("OCR confidence too low: {0:.2}")]
    LowOcrConfidence(f32),
}
