//! Error taxonomy for the intake pipeline.
//!
//! Every variant is terminal for the submission that raised it. Duplicates
//! are reported through [`IntakeError::DuplicateEntry`] only by the store;
//! the orchestrator turns that into a regular "rejected duplicate" outcome.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Why one extraction strategy did not produce text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub reason: String,
}

impl StrategyFailure {
    pub fn new(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    if failures.is_empty() {
        return "no strategies configured".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("could not extract text from {format} ({})", join_failures(.failures))]
    Extraction {
        format: String,
        failures: Vec<StrategyFailure>,
    },

    #[error("no captions available for video {video_id} ({})", join_failures(.failures))]
    NoCaptions {
        video_id: String,
        failures: Vec<StrategyFailure>,
    },

    #[error("submission contains no text after normalization")]
    EmptyContent,

    #[error("an entry with the same content already exists: {existing_id}")]
    DuplicateEntry { existing_id: String },

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl IntakeError {
    /// Single-reason extraction failure, for paths without a strategy list.
    pub fn extraction(format: impl Into<String>, reason: impl Into<String>) -> Self {
        let format = format.into();
        IntakeError::Extraction {
            failures: vec![StrategyFailure::new(format.clone(), reason)],
            format,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            IntakeError::Extraction { .. } => ErrorKind::Extraction,
            IntakeError::NoCaptions { .. } => ErrorKind::NoCaptions,
            IntakeError::EmptyContent => ErrorKind::EmptyContent,
            IntakeError::DuplicateEntry { .. } => ErrorKind::DuplicateEntry,
            IntakeError::NotFound(_) => ErrorKind::NotFound,
            IntakeError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    Extraction,
    NoCaptions,
    EmptyContent,
    DuplicateEntry,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::Extraction => "extraction_failed",
            ErrorKind::NoCaptions => "no_captions",
            ErrorKind::EmptyContent => "empty_content",
            ErrorKind::DuplicateEntry => "duplicate_entry",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
