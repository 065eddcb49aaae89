//! Error handling
//!
//! Only the file-facing surfaces can fail. Recording, formatting and
//! detection recover locally and never return an error.

use thiserror::Error;

pub type DiagResult<T> = Result<T, DiagError>;

#[derive(Debug, Error)]
pub enum DiagError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no export directory available on this platform")]
    NoExportDirectory,
}
