//! Reduced-sample artifact writer/reader for trigrate.
//!
//! A `.trs` artifact stores an event sample reduced to exactly the data rate
//! queries need: per event, one float per trigger-threshold slot (the
//! tightest threshold value that still lets the event pass) plus an optional
//! weight.
//!
//! # File layout
//!
//! - Magic string and a format-version integer, both uncompressed, so a
//!   mismatched file is rejected before any decompression happens.
//! - A zstd-compressed stream of length-prefixed bincode blocks: first the
//!   [`SampleHeader`] (trigger list, fixed parameters, ordered
//!   threshold-slot names, event rate), then [`EventBatch`] blocks of up to
//!   [`EVENTS_PER_BATCH`] events each. Batches are concatenated
//!   transparently on load.
//!
//! # Example
//!
//! ```no_run
//! use tr_bundle::{EventBatch, EventRecord, SampleHeader, SampleReader, SampleWriter};
//! use std::path::Path;
//!
//! let header = SampleHeader::new(vec![], 1.0);
//! let mut writer = SampleWriter::create(Path::new("sample.trs"), &header).unwrap();
//! writer.write_batch(&EventBatch {
//!     events: vec![EventRecord { thresholds: vec![12.5], weight: None }],
//! }).unwrap();
//! writer.finish().unwrap();
//!
//! let loaded = SampleReader::open(Path::new("sample.trs")).unwrap();
//! assert_eq!(loaded.event_count(), 1);
//! ```

pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use error::{BundleError, Result};
pub use format::{
    EventBatch, EventRecord, ParameterRecord, SampleHeader, TriggerRecord, EVENTS_PER_BATCH,
    FORMAT_MAGIC, FORMAT_VERSION, NO_CROSSING,
};
pub use reader::{LoadedSample, SampleReader};
pub use writer::SampleWriter;
