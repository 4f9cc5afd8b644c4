use std::path::PathBuf;

use crate::canonicalizer::DanglingReference;
use crate::oracle::OracleError;
use crate::openapi_builder::DuplicateOperation;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error in {}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The type oracle failed while operation `operation` was being processed
    #[error("type oracle failed while processing operation `{operation}`: {source}")]
    Oracle {
        operation: String,
        #[source]
        source: OracleError,
    },
    #[error("cannot index the project: {0}")]
    OracleInit(#[from] OracleError),
    #[error(transparent)]
    DanglingReference(#[from] DanglingReference),
    #[error(transparent)]
    DuplicateOperation(#[from] DuplicateOperation),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}
