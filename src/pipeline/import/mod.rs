pub mod format;
pub mod hash;
pub mod upload;

pub use format::*;
pub use hash::*;
pub use upload::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Uploaded file is empty: {0}")]
    EmptyFile(String),

    #[error("Could not read file: {0}")]
    FileReadError(String),
}
