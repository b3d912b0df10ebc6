//! Reduction of full samples into tightest-threshold storage.
//!
//! For every event and every menu trigger the reduction finds — once — the
//! tightest threshold that still lets the event pass, by bisection to a
//! fixed tolerance. Raising a threshold can only turn passes into failures,
//! so a single crossing exists per threshold. Independent thresholds are
//! scanned one at a time with the others held at zero; locked (correlated)
//! thresholds move together, the dependents at the ratios frozen from the
//! menu values, and only the primary crossing is searched for.
//!
//! Finding no crossing — the event fails even at the maximum tried
//! threshold, or never crosses at all — is a valid outcome, recorded as the
//! sentinel value for every slot of that trigger. It is not an error.

use super::{FullSample, ReducedSample, Sample};
use crate::event::EventQuantities;
use crate::menu::TriggerMenu;
use crate::trigger::{Trigger, TriggerRegistry};
use std::path::PathBuf;
use tr_bundle::NO_CROSSING;
use tr_common::BatchResult;
use tr_math::bisect_crossing;
use tracing::{info, warn};

/// Default bisection tolerance for the tightest-threshold search.
pub const REDUCTION_TOLERANCE: f64 = 0.001;

/// Headroom factor applied to the suggested upper edge, so the search
/// range covers the tails beyond the plotting axis.
const UPPER_EDGE_HEADROOM: f64 = 5.0;

/// Search range when no binning hint is registered.
const DEFAULT_UPPER_EDGE: f64 = 500.0;

/// Find the tightest threshold values that still pass `event`.
///
/// Returns the values in the trigger's threshold order, or None when any
/// threshold has no pass/fail crossing on its search range.
pub fn tightest_thresholds(
    trigger: &Trigger,
    event: &EventQuantities,
    tolerance: f64,
    registry: &TriggerRegistry,
) -> Option<Vec<f64>> {
    let names = trigger.threshold_names();
    if names.is_empty() {
        return Some(Vec::new());
    }

    // Ratios must be frozen from the menu values before anything is zeroed.
    let scalings = if trigger.thresholds_are_correlated() {
        trigger.threshold_scalings().ok()?
    } else {
        Vec::new()
    };

    let mut working = trigger.clone();
    let threshold_indices: Vec<usize> = names
        .iter()
        .filter_map(|name| working.parameter_index(name))
        .collect();
    if threshold_indices.len() != names.len() {
        return None;
    }
    for &index in &threshold_indices {
        working.set_value_at(index, 0.0);
    }

    let scaled_indices: Vec<(usize, f64)> = scalings
        .iter()
        .filter_map(|parameter| {
            working
                .parameter_index(&parameter.name)
                .map(|index| (index, parameter.ratio))
        })
        .collect();

    // Only the primary is scanned for a correlated trigger; the dependents
    // follow it.
    let scanned = if trigger.thresholds_are_correlated() {
        &threshold_indices[..1]
    } else {
        &threshold_indices[..]
    };

    let mut crossings = Vec::with_capacity(scanned.len());
    for (position, &index) in scanned.iter().enumerate() {
        let binning = registry.binning_or_default(trigger.name(), names[position]);
        let low = binning.low.max(0.0);
        let high = if binning.high > low {
            binning.high * UPPER_EDGE_HEADROOM
        } else {
            DEFAULT_UPPER_EDGE * UPPER_EDGE_HEADROOM
        };

        let crossing = bisect_crossing(
            |value| {
                working.set_value_at(index, value);
                for &(scaled_index, ratio) in &scaled_indices {
                    working.set_value_at(scaled_index, ratio * value);
                }
                working.apply(event)
            },
            low,
            high,
            tolerance,
        )?;

        crossings.push(crossing);
        working.set_value_at(index, 0.0);
    }

    if trigger.thresholds_are_correlated() {
        let primary = crossings[0];
        let mut values = vec![primary];
        values.extend(scalings.iter().map(|parameter| parameter.ratio * primary));
        Some(values)
    } else {
        Some(crossings)
    }
}

/// Builds a [`ReducedSample`] from one or more full samples.
pub struct ReducedSampleBuilder<'a> {
    registry: &'a TriggerRegistry,
    tolerance: f64,
    sample: ReducedSample,
}

impl<'a> ReducedSampleBuilder<'a> {
    pub fn new(menu: TriggerMenu, registry: &'a TriggerRegistry) -> Self {
        ReducedSampleBuilder {
            registry,
            tolerance: REDUCTION_TOLERANCE,
            sample: ReducedSample::new(menu),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn set_event_rate(&mut self, rate: f64) {
        self.sample.set_event_rate(rate);
    }

    /// Reduce and append every event of a full sample.
    pub fn append_full_sample(&mut self, full: &FullSample) {
        let triggers: Vec<Trigger> = self.sample.menu().iter().cloned().collect();
        let slots = self.sample.slots_per_event();

        let mut buffer = Vec::with_capacity(slots);
        for event_number in 0..full.len() {
            let quantities = full.quantities(event_number);
            buffer.clear();

            for trigger in &triggers {
                match tightest_thresholds(trigger, quantities, self.tolerance, self.registry) {
                    Some(values) => buffer.extend(values.iter().map(|&value| value as f32)),
                    None => buffer.extend(
                        std::iter::repeat(NO_CROSSING).take(trigger.threshold_names().len()),
                    ),
                }
            }

            self.sample
                .push_event(&buffer, full.weight(event_number) as f32);
        }
        info!(events = full.len(), "reduced full sample");
    }

    /// Reduce a batch of full-sample JSONL files, reporting per-file
    /// errors and continuing with the remaining files.
    pub fn append_jsonl_files(&mut self, paths: &[PathBuf]) -> BatchResult<PathBuf> {
        let mut batch = BatchResult::new();
        for path in paths {
            match FullSample::load_jsonl(path) {
                Ok(full) => {
                    self.append_full_sample(&full);
                    batch.add_success(path.clone());
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping input file");
                    batch.add_failure(path.display().to_string(), error);
                }
            }
        }
        batch
    }

    pub fn finish(self) -> ReducedSample {
        self.sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FullEvent, ObjectKind, PhysicsObject};
    use std::io::Write;
    use tempfile::TempDir;

    fn jet(energy: f64) -> PhysicsObject {
        PhysicsObject {
            kind: ObjectKind::Jet,
            energy,
            eta: 0.0,
            isolated: false,
        }
    }

    fn jet_event(energies: &[f64]) -> FullEvent {
        FullEvent::new(EventQuantities {
            objects: energies.iter().map(|&energy| jet(energy)).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn tightest_threshold_converges_to_jet_energy() {
        let registry = TriggerRegistry::standard();
        let trigger = registry.latest("SingleJet").unwrap();
        let event = jet_event(&[37.3]).quantities;

        let values = tightest_thresholds(&trigger, &event, 0.001, &registry).unwrap();
        assert_eq!(values.len(), 1);
        assert!(values[0] >= 37.3);
        assert!(values[0] - 37.3 <= 0.0011);
    }

    #[test]
    fn no_crossing_returns_none() {
        let registry = TriggerRegistry::standard();
        let trigger = registry.latest("SingleJet").unwrap();
        let empty = EventQuantities::default();

        assert!(tightest_thresholds(&trigger, &empty, 0.001, &registry).is_none());
    }

    #[test]
    fn correlated_thresholds_move_together() {
        let registry = TriggerRegistry::standard();
        // Defaults 60/30 give a dependent ratio of 0.5.
        let trigger = registry.latest("AsymmetricDijet").unwrap();
        let event = jet_event(&[80.0, 50.0]).quantities;

        let values = tightest_thresholds(&trigger, &event, 0.001, &registry).unwrap();
        assert_eq!(values.len(), 2);
        // The leading jet limits the primary; the dependent is half of it.
        assert!((values[0] - 80.0).abs() <= 0.0011);
        assert!((values[1] - values[0] * 0.5).abs() < 1e-9);
    }

    #[test]
    fn builder_records_sentinels_per_trigger() {
        let registry = TriggerRegistry::standard();
        let mut menu = TriggerMenu::new();
        menu.add_trigger(registry.latest("SingleJet").unwrap());
        menu.add_trigger(registry.latest("SingleMuon").unwrap());

        let mut full = FullSample::new();
        full.push(jet_event(&[42.0])); // jet but no muon

        let mut builder = ReducedSampleBuilder::new(menu, &registry);
        builder.append_full_sample(&full);
        let sample = builder.finish();

        assert_eq!(sample.len(), 1);
        assert!(sample.threshold(0, 0) > 41.9);
        assert_eq!(sample.threshold(0, 1), NO_CROSSING);
    }

    #[test]
    fn batch_reduction_tolerates_bad_files() {
        let registry = TriggerRegistry::standard();
        let mut menu = TriggerMenu::new();
        menu.add_trigger(registry.latest("SingleJet").unwrap());

        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.jsonl");
        let bad = dir.path().join("bad.jsonl");
        std::fs::File::create(&good)
            .unwrap()
            .write_all(serde_json::to_string(&jet_event(&[30.0])).unwrap().as_bytes())
            .unwrap();
        std::fs::File::create(&bad)
            .unwrap()
            .write_all(b"not a record\n")
            .unwrap();

        let mut builder = ReducedSampleBuilder::new(menu, &registry);
        let batch = builder.append_jsonl_files(&[good, bad]);

        assert_eq!(batch.succeeded.len(), 1);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(builder.finish().len(), 1);
    }
}
