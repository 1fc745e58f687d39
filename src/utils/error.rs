//! Error types for textlab

use std::io;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum TextlabError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Input contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failure raised inside a user-supplied operation closure
    #[error("Operation error: {0}")]
    Operation(String),

    #[error("apply of '{operation}' in {mode} mode failed: {source}")]
    Apply {
        operation: String,
        mode: &'static str,
        #[source]
        source: Box<TextlabError>,
    },

    /// Consuming a realtime iterator past completion
    #[error("realtime iterator already exhausted")]
    Exhausted,
}

/// Schema validation and merge errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("field name collision: {}", fields.join(", "))]
    Conflict { fields: Vec<String> },

    #[error("duplicate field '{0}' in candidate schema")]
    Duplicate(String),

    #[error("Unsupported schema version: {0}")]
    UnsupportedVersion(u32),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Violations of the input contract between loaders, operations and drivers
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("operation '{operation}' requires field '{field}' which is missing from the sample")]
    MissingField { operation: String, field: String },

    #[error("src has {src} entries but ref has {refs}; pairs beyond the shorter are dropped")]
    LengthMismatch { src: usize, refs: usize },
}

/// Failures surfaced by the ordered worker pool
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("worker failed: {0}")]
    Worker(String),

    #[error("worker pool timed out after {0}ms waiting for a result")]
    Timeout(u64),

    #[error("worker pool channel disconnected before all results arrived")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, TextlabError>;
