pub mod adapter;
pub mod confidence;
pub mod ocr;
pub mod types;

pub use adapter::*;
pub use confidence::*;
pub use ocr::*;
pub use types::*;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("Unreadable input: {0}")]
    UnreadableInput(String),

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("OCR worker stopped unexpectedly: {0}")]
    WorkerFailed(String),

    #[error("OCR returned no text")]
    NoText,
}
