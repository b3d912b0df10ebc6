//! Error types for trigrate.
//!
//! Structured error handling with stable error codes for machine parsing,
//! category classification for grouping, and recoverability hints so batch
//! drivers know whether to retry, skip, or abort.
//!
//! The taxonomy follows three hard rules:
//! - Configuration errors (unknown trigger names/versions/parameters,
//!   malformed file magic or format version) are fatal and never retried.
//! - Data-consistency errors (a reduced sample queried for a trigger it was
//!   not built against) are fatal to that query only.
//! - Batch operations over many input files report per-file errors and
//!   continue with the remaining files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trigrate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Trigger/menu configuration errors.
    Config,
    /// Sample loading and event access errors.
    Sample,
    /// Mismatch between a query and the data it runs against.
    Data,
    /// Rate-curve query errors.
    Curve,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Sample => write!(f, "sample"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Curve => write!(f, "curve"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for trigrate.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no trigger named {name:?} is registered")]
    UnknownTrigger { name: String },

    #[error("no version {version} of trigger {name:?} is registered")]
    UnknownTriggerVersion { name: String, version: u32 },

    #[error("trigger {trigger:?} has no parameter named {parameter:?}")]
    UnknownParameter { trigger: String, parameter: String },

    #[error("invalid menu file {path}: {message}")]
    InvalidMenu { path: PathBuf, message: String },

    // Sample errors (20-29)
    #[error("sample load failed for {path}: {message}")]
    SampleLoad { path: PathBuf, message: String },

    #[error("event index {index} out of range for sample of {len} events")]
    EventOutOfRange { index: usize, len: usize },

    // Data-consistency errors (30-39)
    #[error("reduced sample was not built against trigger {trigger:?}: {message}")]
    DataInconsistency { trigger: String, message: String },

    // Curve errors (40-49)
    #[error("threshold {threshold} lies outside the curve axis [{low}, {high}]")]
    ThresholdOutsideAxis {
        threshold: f64,
        low: f64,
        high: f64,
    },

    #[error("rate curve query failed: {0}")]
    Curve(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Codes are grouped by category:
    /// - 10-19: configuration errors
    /// - 20-29: sample errors
    /// - 30-39: data-consistency errors
    /// - 40-49: rate-curve query errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::UnknownTrigger { .. } => 11,
            Error::UnknownTriggerVersion { .. } => 12,
            Error::UnknownParameter { .. } => 13,
            Error::InvalidMenu { .. } => 14,
            Error::SampleLoad { .. } => 20,
            Error::EventOutOfRange { .. } => 21,
            Error::DataInconsistency { .. } => 30,
            Error::ThresholdOutsideAxis { .. } => 40,
            Error::Curve(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_)
            | Error::UnknownTrigger { .. }
            | Error::UnknownTriggerVersion { .. }
            | Error::UnknownParameter { .. }
            | Error::InvalidMenu { .. } => ErrorCategory::Config,

            Error::SampleLoad { .. } | Error::EventOutOfRange { .. } => ErrorCategory::Sample,

            Error::DataInconsistency { .. } => ErrorCategory::Data,

            Error::ThresholdOutsideAxis { .. } | Error::Curve(_) => ErrorCategory::Curve,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Configuration and data-consistency errors are never recoverable: no
    /// substitute trigger or data exists. I/O errors are often transient.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => false,
            Error::UnknownTrigger { .. } => false,
            Error::UnknownTriggerVersion { .. } => false,
            Error::UnknownParameter { .. } => false,
            Error::InvalidMenu { .. } => false,

            // A bad input file can be skipped in a batch.
            Error::SampleLoad { .. } => true,
            Error::EventOutOfRange { .. } => false,

            Error::DataInconsistency { .. } => false,

            Error::ThresholdOutsideAxis { .. } => false,
            Error::Curve(_) => false,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }
}

/// Result of a batch operation that may have partial success.
///
/// Batch drivers (e.g. reducing several full-sample files into one reduced
/// sample) record failures per item and keep going.
#[derive(Debug)]
pub struct BatchResult<T> {
    /// Successfully completed items.
    pub succeeded: Vec<T>,

    /// Failed items with their errors.
    pub failed: Vec<BatchError>,
}

/// A single error in a batch operation.
#[derive(Debug)]
pub struct BatchError {
    /// Identifier of the failed item, usually a file path.
    pub item: String,

    /// The error that stopped this item.
    pub error: Error,
}

impl<T> BatchResult<T> {
    pub fn new() -> Self {
        BatchResult {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn add_success(&mut self, item: T) {
        self.succeeded.push(item);
    }

    pub fn add_failure(&mut self, item: impl Into<String>, error: Error) {
        self.failed.push(BatchError {
            item: item.into(),
            error,
        });
    }

    /// Total items attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn any_succeeded(&self) -> bool {
        !self.succeeded.is_empty()
    }
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("test".into()).code(), 10);
        assert_eq!(
            Error::UnknownTrigger {
                name: "SingleJet".into()
            }
            .code(),
            11
        );
        assert_eq!(
            Error::DataInconsistency {
                trigger: "SingleJet".into(),
                message: "not in header".into()
            }
            .code(),
            30
        );
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::UnknownParameter {
                trigger: "SingleJet".into(),
                parameter: "threshold9".into()
            }
            .category(),
            ErrorCategory::Config
        );
        assert_eq!(
            Error::ThresholdOutsideAxis {
                threshold: -3.0,
                low: 0.0,
                high: 100.0
            }
            .category(),
            ErrorCategory::Curve
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(!Error::Config("test".into()).is_recoverable());
        assert!(!Error::DataInconsistency {
            trigger: "t".into(),
            message: "m".into()
        }
        .is_recoverable());
        assert!(Error::SampleLoad {
            path: "events.jsonl".into(),
            message: "truncated".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_batch_result() {
        let mut batch: BatchResult<String> = BatchResult::new();

        batch.add_success("a.jsonl".to_string());
        batch.add_failure(
            "b.jsonl",
            Error::SampleLoad {
                path: "b.jsonl".into(),
                message: "bad record".into(),
            },
        );

        assert_eq!(batch.total(), 2);
        assert!(!batch.all_succeeded());
        assert!(batch.any_succeeded());
    }
}
