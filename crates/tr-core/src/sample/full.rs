//! Full samples backed by reconstructed physics quantities.

use super::{CachedTrigger, Sample, ScanTrigger};
use crate::event::{EventQuantities, FullEvent};
use crate::trigger::{ScaledParameter, Trigger};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;
use tr_common::{Error, Result};
use tracing::info;

/// An in-memory full sample: every event keeps its reconstruction output,
/// and every trigger evaluation re-derives pass/fail from it.
#[derive(Debug)]
pub struct FullSample {
    events: Vec<FullEvent>,
    event_rate: f64,
    sum_of_weights: OnceLock<f64>,
}

impl Default for FullSample {
    fn default() -> Self {
        Self::new()
    }
}

impl FullSample {
    pub fn new() -> Self {
        FullSample {
            events: Vec::new(),
            event_rate: 1.0,
            sum_of_weights: OnceLock::new(),
        }
    }

    /// Load a JSONL file of [`FullEvent`] records, one per line.
    pub fn load_jsonl(path: &Path) -> Result<Self> {
        let mut sample = FullSample::new();
        sample.append_jsonl_file(path)?;
        Ok(sample)
    }

    /// Append a JSONL file to this sample.
    pub fn append_jsonl_file(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).map_err(|error| Error::SampleLoad {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        self.append_jsonl(BufReader::new(file))
            .map_err(|error| match error {
                Error::SampleLoad { message, .. } => Error::SampleLoad {
                    path: path.to_path_buf(),
                    message,
                },
                other => other,
            })?;
        info!(path = %path.display(), events = self.events.len(), "loaded full sample");
        Ok(())
    }

    /// Append JSONL records from any byte source.
    pub fn append_jsonl(&mut self, reader: impl Read) -> Result<()> {
        for (line_number, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: FullEvent =
                serde_json::from_str(&line).map_err(|error| Error::SampleLoad {
                    path: Default::default(),
                    message: format!("line {}: {error}", line_number + 1),
                })?;
            self.push(event);
        }
        Ok(())
    }

    /// Append one event, invalidating the cached sum of weights.
    pub fn push(&mut self, event: FullEvent) {
        self.events.push(event);
        self.sum_of_weights.take();
    }

    pub fn set_event_rate(&mut self, rate: f64) {
        self.event_rate = rate;
    }

    pub fn event(&self, index: usize) -> &FullEvent {
        &self.events[index]
    }

    pub fn quantities(&self, index: usize) -> &EventQuantities {
        &self.events[index].quantities
    }
}

impl Sample for FullSample {
    fn len(&self) -> usize {
        self.events.len()
    }

    fn weight(&self, event: usize) -> f64 {
        self.events[event].weight
    }

    fn event_rate(&self) -> f64 {
        self.event_rate
    }

    fn sum_of_weights(&self) -> f64 {
        *self
            .sum_of_weights
            .get_or_init(|| self.events.iter().map(|event| event.weight).sum())
    }

    fn cached_trigger<'a>(&'a self, trigger: &Trigger) -> Result<Box<dyn CachedTrigger + 'a>> {
        Ok(Box::new(FullCachedTrigger {
            sample: self,
            trigger: trigger.clone(),
        }))
    }

    fn scan_trigger<'a>(
        &'a self,
        trigger: &Trigger,
        versus: &str,
        scaled: &[ScaledParameter],
    ) -> Result<Box<dyn ScanTrigger + 'a>> {
        let primary = trigger
            .parameter_index(versus)
            .ok_or_else(|| Error::UnknownParameter {
                trigger: trigger.name().to_string(),
                parameter: versus.to_string(),
            })?;

        let mut scaled_indices = Vec::with_capacity(scaled.len());
        for parameter in scaled {
            let index =
                trigger
                    .parameter_index(&parameter.name)
                    .ok_or_else(|| Error::UnknownParameter {
                        trigger: trigger.name().to_string(),
                        parameter: parameter.name.clone(),
                    })?;
            scaled_indices.push((index, parameter.ratio));
        }

        Ok(Box::new(FullScanTrigger {
            sample: self,
            trigger: RefCell::new(trigger.clone()),
            primary,
            scaled: scaled_indices,
        }))
    }
}

/// Cached evaluator over a full sample: a plain trigger copy. There is
/// nothing to cache — reconstruction already happened at load time.
struct FullCachedTrigger<'a> {
    sample: &'a FullSample,
    trigger: Trigger,
}

impl CachedTrigger for FullCachedTrigger<'_> {
    fn passes(&self, event: usize) -> bool {
        self.trigger.apply(self.sample.quantities(event))
    }
}

/// Scan evaluator over a full sample: moves the primary threshold (and the
/// co-scaled ones) on a private trigger copy, then applies the predicate.
struct FullScanTrigger<'a> {
    sample: &'a FullSample,
    trigger: RefCell<Trigger>,
    primary: usize,
    scaled: Vec<(usize, f64)>,
}

impl ScanTrigger for FullScanTrigger<'_> {
    fn passes_at(&self, event: usize, primary: f64) -> bool {
        let mut trigger = self.trigger.borrow_mut();
        trigger.set_value_at(self.primary, primary);
        for &(index, ratio) in &self.scaled {
            trigger.set_value_at(index, ratio * primary);
        }
        trigger.apply(self.sample.quantities(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ObjectKind, PhysicsObject};
    use crate::trigger::TriggerRegistry;

    fn jet_event(energy: f64, weight: f64) -> FullEvent {
        FullEvent::with_weight(
            EventQuantities {
                objects: vec![PhysicsObject {
                    kind: ObjectKind::Jet,
                    energy,
                    eta: 0.0,
                    isolated: false,
                }],
                ..Default::default()
            },
            weight,
        )
    }

    #[test]
    fn sum_of_weights_invalidated_on_append() {
        let mut sample = FullSample::new();
        sample.push(jet_event(10.0, 2.0));
        assert_eq!(sample.sum_of_weights(), 2.0);

        sample.push(jet_event(20.0, 3.0));
        assert_eq!(sample.sum_of_weights(), 5.0);
    }

    #[test]
    fn cached_trigger_matches_direct_apply() {
        let registry = TriggerRegistry::standard();
        let mut trigger = registry.latest("SingleJet").unwrap();
        trigger.set_parameter("threshold1", 15.0).unwrap();

        let mut sample = FullSample::new();
        sample.push(jet_event(10.0, 1.0));
        sample.push(jet_event(20.0, 1.0));

        let cached = sample.cached_trigger(&trigger).unwrap();
        for event in 0..sample.len() {
            assert_eq!(
                cached.passes(event),
                trigger.apply(sample.quantities(event))
            );
        }
    }

    #[test]
    fn scan_trigger_moves_primary() {
        let registry = TriggerRegistry::standard();
        let trigger = registry.latest("SingleJet").unwrap();

        let mut sample = FullSample::new();
        sample.push(jet_event(25.0, 1.0));

        let scan = sample.scan_trigger(&trigger, "threshold1", &[]).unwrap();
        assert!(scan.passes_at(0, 20.0));
        assert!(!scan.passes_at(0, 30.0));
    }

    #[test]
    fn jsonl_parse_error_names_the_line() {
        let mut sample = FullSample::new();
        let result = sample.append_jsonl(&b"{\"objects\":[]}\nnot json\n"[..]);
        match result {
            Err(Error::SampleLoad { message, .. }) => assert!(message.starts_with("line 2")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
