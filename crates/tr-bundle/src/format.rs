//! On-disk record types for reduced-sample artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Magic string opening every reduced-sample artifact.
pub const FORMAT_MAGIC: &[u8; 16] = b"trigrate-reduced";

/// Current artifact format version. Readers reject anything newer.
pub const FORMAT_VERSION: u32 = 1;

/// Maximum number of events per batch block.
///
/// Batches keep individual blocks small enough to decode independently;
/// readers concatenate them transparently.
pub const EVENTS_PER_BATCH: usize = 20_000;

/// Sentinel stored when no pass/fail crossing exists for an event/slot:
/// the event either fails at the maximum tried threshold or never crosses.
/// Any non-negative live threshold fails against it.
pub const NO_CROSSING: f32 = -1.0;

/// A fixed (non-threshold) trigger parameter recorded in the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    pub value: f64,
}

/// One trigger the sample was reduced against.
///
/// `threshold_slots` lists, in storage order, the names of the threshold
/// parameters whose tightest values are recorded per event. `parameters`
/// records every parameter value at reduction time so the menu can be
/// reconstructed exactly as it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub name: String,
    pub version: u32,
    pub parameters: Vec<ParameterRecord>,
    pub threshold_slots: Vec<String>,
}

impl TriggerRecord {
    /// Number of per-event floats this trigger contributes.
    pub fn slot_count(&self) -> usize {
        self.threshold_slots.len()
    }
}

/// Header block: the first block of every artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleHeader {
    /// When the artifact was created.
    pub created_at: DateTime<Utc>,
    /// Absolute rate corresponding to "every event passes", in Hz.
    pub event_rate: f64,
    /// Triggers the sample was reduced against, in slot order.
    pub triggers: Vec<TriggerRecord>,
}

impl SampleHeader {
    pub fn new(triggers: Vec<TriggerRecord>, event_rate: f64) -> Self {
        SampleHeader {
            created_at: Utc::now(),
            event_rate,
            triggers,
        }
    }

    /// Total threshold slots per event record.
    pub fn slots_per_event(&self) -> usize {
        self.triggers.iter().map(TriggerRecord::slot_count).sum()
    }
}

/// One reduced event: one float per threshold slot, optional weight.
///
/// A missing weight means 1, which keeps unit-weight samples compact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub thresholds: Vec<f32>,
    pub weight: Option<f32>,
}

impl EventRecord {
    pub fn weight(&self) -> f64 {
        f64::from(self.weight.unwrap_or(1.0))
    }
}

/// A batch of reduced events, stored as one length-prefixed block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBatch {
    pub events: Vec<EventRecord>,
}
