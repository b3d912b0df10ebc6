//! Rate-file encodings and report rendering.
//!
//! A [`tr_common::MenuRate`] is a hierarchical name→value tree; this crate
//! encodes it in three caller-selected textual forms:
//!
//! - **json** — the structured tree, lossless in both directions
//! - **table** — the fixed-width legacy columnar layout (write-only)
//! - **csv** — the comma-separated variant of the same columns (write-only)
//!
//! plus the write-only report sink rendering a rate as human-readable rows
//! with summary totals. This crate renders and reloads; it computes
//! nothing.

pub mod columns;
pub mod error;
pub mod json;
pub mod sink;

pub use error::{ReportError, Result};

use tr_common::{MenuRate, OutputFormat};

/// Write a menu rate in the requested encoding.
pub fn write_menu_rate(
    writer: &mut dyn std::io::Write,
    rate: &MenuRate,
    format: OutputFormat,
) -> Result<()> {
    tracing::debug!(
        %format,
        triggers = rate.trigger_rates.len(),
        "writing menu rate"
    );
    match format {
        OutputFormat::Json => json::write_json(writer, rate),
        OutputFormat::Table => columns::write_table(writer, rate),
        OutputFormat::Csv => columns::write_csv(writer, rate),
    }
}
