//! Fatal errors for an annotation run.
//!
//! Oracle failures, malformed replies and taxonomy violations are not here:
//! they degrade a single batch and the run continues.

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::oracle::OracleError;

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Output location {} is not writable: {source}", .path.display())]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing oracle credentials: set {0}")]
    MissingCredentials(&'static str),

    #[error("Model {model} is not available on {backend}")]
    ModelUnavailable { backend: String, model: String },

    #[error("Oracle setup failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
