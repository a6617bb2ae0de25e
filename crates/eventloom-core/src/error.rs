//! Error types for eventloom-core

use std::path::PathBuf;

use thiserror::Error;

use crate::expression::ExprError;

/// Result type alias for eventloom-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in eventloom-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse a YAML document (project config or transform document)
    #[error("failed to parse YAML document: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A transform document does not have the expected structure
    #[error("invalid transform document: {message}")]
    TransformInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A transform document entry does not follow the rule grammar
    #[error("invalid rule for field '{field}': {message}")]
    Rule {
        /// Output field the rule belongs to
        field: String,
        /// Description of the error
        message: String,
    },

    /// An inline expression failed to parse or evaluate
    #[error("expression for field '{field}' failed: {source}")]
    Expression {
        /// Output field the expression belongs to
        field: String,
        /// Underlying expression error
        source: ExprError,
    },

    /// A raw value could not be converted per its declared format
    #[error("cannot convert '{value}' for field '{field}' as '{format}': {message}")]
    Format {
        /// Output field being produced
        field: String,
        /// Declared format name
        format: String,
        /// Raw input value
        value: String,
        /// Description of the error
        message: String,
    },

    /// Input record has no column for a field-copy translator (strict mode only)
    #[error("input record has no field '{field}'")]
    MissingField {
        /// Input field that was looked up
        field: String,
    },

    /// A file could not be opened or read
    #[error("cannot access {}: {source}", .path.display())]
    FileAccess {
        /// Path of the file
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Delimited-text parse error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Failure while processing one row, with its location
    #[error("{}, row {row}: {source}", .file.display())]
    Row {
        /// Source file
        file: PathBuf,
        /// 1-based data row (header excluded)
        row: usize,
        /// What went wrong
        source: Box<Error>,
    },

    /// Sink delivery error
    #[error("sink '{sink}' error: {message}")]
    Sink {
        /// Sink kind
        sink: String,
        /// Description of the error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap this error with the file and row it happened on
    pub fn at_row(self, file: impl Into<PathBuf>, row: usize) -> Self {
        Error::Row {
            file: file.into(),
            row,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through row context
    pub fn root(&self) -> &Error {
        match self {
            Error::Row { source, .. } => source.root(),
            other => other,
        }
    }
}
