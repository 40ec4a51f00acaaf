//! Unified error types for the synthesis workspace
//!
//! [`SyntError`] covers the failures that callers need to tell apart: missing
//! or corrupt input files, unknown variable tokens, unsupported scenario
//! layouts and violation messages that cannot be classified. Orchestration
//! code wraps it in `anyhow` with context, the same way the rest of the
//! pipeline reports errors.

use thiserror::Error;

/// Unified error type for deck reading and synthesis.
#[derive(Error, Debug)]
pub enum SyntError {
    /// I/O errors (file access, directory listing)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors raised by the dataframe engine
    #[error("dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// A mandatory input file could not be found
    #[error("missing input file '{0}'")]
    MissingFile(String),

    /// A file on disk declares a different kind than the one requested
    #[error("file '{path}' declares kind '{found}', expected '{expected}'")]
    InvalidFileType {
        path: String,
        expected: String,
        found: String,
    },

    /// A parsed file handed out under another kind's name
    #[error("expected a '{expected}' file, got a '{found}' file")]
    FileKindMismatch { expected: String, found: String },

    /// A table is absent from a parsed file
    #[error("file '{file}' has no table '{table}'")]
    MissingTable { file: String, table: String },

    /// A column is absent from a table
    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    /// The case descriptor is missing or malformed
    #[error("invalid case descriptor: {0}")]
    InvalidCase(String),

    /// A variable token does not name any known synthesis
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// More than one stage carries several scenarios
    #[error("unrecognized scenario layout: stages {0:?} are all stochastic")]
    UnsupportedScenarioLayout(Vec<i64>),

    /// A violation message matched zero or several violation types
    #[error(transparent)]
    Classification(#[from] crate::infeasibility::ClassificationError),

    /// A key lookup (plant, submarket, stage) found nothing
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// A schema version string could not be parsed
    #[error("invalid schema version '{0}'")]
    Version(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using SyntError.
pub type SyntResult<T> = Result<T, SyntError>;

impl From<String> for SyntError {
    fn from(s: String) -> Self {
        SyntError::Other(s)
    }
}

impl From<&str> for SyntError {
    fn from(s: &str) -> Self {
        SyntError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyntError::MissingColumn {
            table: "dp".into(),
            column: "duracao".into(),
        };
        assert!(err.to_string().contains("dp"));
        assert!(err.to_string().contains("duracao"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SyntError = io_err.into();
        assert!(matches!(err, SyntError::Io(_)));
    }

    #[test]
    fn test_scenario_layout_lists_stages() {
        let err = SyntError::UnsupportedScenarioLayout(vec![1, 3]);
        assert!(err.to_string().contains("[1, 3]"));
    }
}
