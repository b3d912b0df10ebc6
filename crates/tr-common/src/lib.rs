//! Trigrate common types and errors.
//!
//! This crate provides foundational types shared across trigrate crates:
//! - The unified error type with stable codes and categories
//! - Batch results with partial-failure accounting
//! - Rate value objects (trigger snapshots, per-trigger and menu rates)
//! - Output format specifications for the CLI

pub mod error;
pub mod output;
pub mod rates;

pub use error::{BatchError, BatchResult, Error, ErrorCategory, Result};
pub use output::OutputFormat;
pub use rates::{MenuRate, ParameterValue, TriggerRate, TriggerSnapshot};
