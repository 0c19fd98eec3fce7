//! Error taxonomy for the pipeline.
//!
//! Invalid input (bad path, unsupported format, unknown strategy) and missing
//! prerequisites surface immediately to the caller. Cache read failures never
//! show up here: the cache degrades them to misses.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("invalid {kind} '{value}' (expected one of: {expected})")]
    InvalidStrategy {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("column '{0}' not found in data")]
    ColumnNotFound(String),

    #[error("column '{0}' has no numeric values")]
    NotNumeric(String),

    #[error("{0}")]
    MissingPrerequisite(&'static str),

    #[error("not enough data: {0}")]
    InsufficientData(String),

    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("could not extract text from {}: {message}", path.display())]
    Document { path: PathBuf, message: String },

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_descriptive() {
        let e = PipelineError::ColumnNotFound("review".into());
        assert_eq!(e.to_string(), "column 'review' not found in data");

        let e = PipelineError::InvalidStrategy {
            kind: "clean strategy",
            value: "bogus".into(),
            expected: "drop, fill, forward_fill",
        };
        assert!(e.to_string().contains("'bogus'"));
        assert!(e.to_string().contains("forward_fill"));

        let e = PipelineError::NotFound(PathBuf::from("nope.csv"));
        assert_eq!(e.to_string(), "file not found: nope.csv");
    }
}
