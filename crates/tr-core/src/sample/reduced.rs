//! Reduced samples: per-trigger tightest-threshold storage.
//!
//! A reduced sample compresses each event down to one float per threshold
//! slot — the tightest threshold value that still lets the event pass that
//! trigger — plus a weight. Rate queries for any threshold on any menu
//! trigger then never touch the full reconstruction again: an event passes
//! a trigger exactly when every live threshold is at or below the stored
//! value for its slot.
//!
//! Slot order is frozen by the menu the sample was reduced against: the
//! triggers in menu order, each contributing its threshold parameters in
//! their conventional order.

use super::{CachedTrigger, Sample, ScanTrigger};
use crate::menu::TriggerMenu;
use crate::trigger::{ScaledParameter, Trigger, TriggerRegistry};
use std::path::Path;
use std::sync::OnceLock;
use tr_bundle::{
    BundleError, EventBatch, EventRecord, ParameterRecord, SampleHeader, SampleReader,
    SampleWriter, TriggerRecord, EVENTS_PER_BATCH,
};
use tr_common::{Error, Result};

/// An event sample reduced to tightest-threshold values.
#[derive(Debug)]
pub struct ReducedSample {
    menu: TriggerMenu,
    slots_per_event: usize,
    thresholds: Vec<f32>,
    weights: Vec<f32>,
    event_rate: f64,
    sum_of_weights: OnceLock<f64>,
}

impl ReducedSample {
    /// An empty reduced sample for the given menu.
    pub fn new(menu: TriggerMenu) -> Self {
        let slots_per_event = menu
            .iter()
            .map(|trigger| trigger.threshold_names().len())
            .sum();
        ReducedSample {
            menu,
            slots_per_event,
            thresholds: Vec::new(),
            weights: Vec::new(),
            event_rate: 1.0,
            sum_of_weights: OnceLock::new(),
        }
    }

    /// The menu this sample was reduced against, with the parameter values
    /// it had at reduction time.
    pub fn menu(&self) -> &TriggerMenu {
        &self.menu
    }

    pub fn slots_per_event(&self) -> usize {
        self.slots_per_event
    }

    pub fn set_event_rate(&mut self, rate: f64) {
        self.event_rate = rate;
    }

    /// Stored tightest threshold for one event slot.
    pub fn threshold(&self, event: usize, slot: usize) -> f32 {
        self.thresholds[event * self.slots_per_event + slot]
    }

    /// Append one reduced event, invalidating the cached sum of weights.
    pub(crate) fn push_event(&mut self, thresholds: &[f32], weight: f32) {
        debug_assert_eq!(thresholds.len(), self.slots_per_event);
        self.thresholds.extend_from_slice(thresholds);
        self.weights.push(weight);
        self.sum_of_weights.take();
    }

    /// Whether the sample was reduced against a matching trigger.
    pub fn contains_trigger(&self, trigger: &Trigger, allow_older_version: bool) -> bool {
        self.find_trigger(trigger, allow_older_version).is_some()
    }

    /// Map a live trigger's threshold names to storage-slot offsets.
    ///
    /// The trigger matches a menu entry when the name matches, the version
    /// matches (exactly, or equal-or-older when allowed), and every
    /// non-threshold parameter is identical — a sample reduced with one eta
    /// window holds no data for another. Threshold values are deliberately
    /// not compared; they are what the slots store.
    pub fn trigger_parameter_slots(
        &self,
        trigger: &Trigger,
        allow_older_version: bool,
    ) -> Result<Vec<(String, usize)>> {
        let (menu_trigger, first_slot) = self
            .find_trigger(trigger, allow_older_version)
            .ok_or_else(|| Error::DataInconsistency {
                trigger: trigger.name().to_string(),
                message: "the reduced sample was not built against this trigger".to_string(),
            })?;

        Ok(menu_trigger
            .threshold_names()
            .iter()
            .enumerate()
            .map(|(offset, name)| (name.to_string(), first_slot + offset))
            .collect())
    }

    fn find_trigger(
        &self,
        trigger: &Trigger,
        allow_older_version: bool,
    ) -> Option<(&Trigger, usize)> {
        let mut slot = 0;
        for menu_trigger in self.menu.iter() {
            let matches = menu_trigger.name() == trigger.name()
                && if allow_older_version {
                    menu_trigger.version() <= trigger.version()
                } else {
                    menu_trigger.version() == trigger.version()
                }
                && trigger
                    .non_threshold_parameter_names()
                    .iter()
                    .all(|parameter| {
                        menu_trigger.try_parameter(parameter) == trigger.try_parameter(parameter)
                    });

            if matches {
                return Some((menu_trigger, slot));
            }
            slot += menu_trigger.threshold_names().len();
        }
        None
    }

    /// Save the sample as a reduced-sample artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let triggers = self
            .menu
            .iter()
            .map(|trigger| TriggerRecord {
                name: trigger.name().to_string(),
                version: trigger.version(),
                parameters: trigger
                    .parameter_names()
                    .iter()
                    .map(|name| ParameterRecord {
                        name: name.to_string(),
                        value: trigger.try_parameter(name).unwrap_or(0.0),
                    })
                    .collect(),
                threshold_slots: trigger
                    .threshold_names()
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
            })
            .collect();

        let header = SampleHeader::new(triggers, self.event_rate);
        let mut writer =
            SampleWriter::create(path, &header).map_err(|error| bundle_error(path, error))?;

        for chunk_start in (0..self.weights.len()).step_by(EVENTS_PER_BATCH) {
            let chunk_end = (chunk_start + EVENTS_PER_BATCH).min(self.weights.len());
            let batch = EventBatch {
                events: (chunk_start..chunk_end)
                    .map(|event| EventRecord {
                        thresholds: self.thresholds
                            [event * self.slots_per_event..(event + 1) * self.slots_per_event]
                            .to_vec(),
                        weight: (self.weights[event] != 1.0).then_some(self.weights[event]),
                    })
                    .collect(),
            };
            writer
                .write_batch(&batch)
                .map_err(|error| bundle_error(path, error))?;
        }

        writer.finish().map_err(|error| bundle_error(path, error))?;
        Ok(())
    }

    /// Load a reduced-sample artifact, reconstructing the menu through the
    /// registry.
    pub fn load(path: &Path, registry: &TriggerRegistry) -> Result<Self> {
        let loaded = SampleReader::open(path).map_err(|error| bundle_error(path, error))?;

        let mut menu = TriggerMenu::new();
        for record in &loaded.header.triggers {
            let mut trigger = registry.exact(&record.name, record.version)?;
            for parameter in &record.parameters {
                trigger.set_parameter(&parameter.name, parameter.value)?;
            }
            menu.add_trigger(trigger);
        }

        let mut sample = ReducedSample::new(menu);
        sample.event_rate = loaded.header.event_rate;

        if loaded.header.slots_per_event() != sample.slots_per_event {
            return Err(Error::SampleLoad {
                path: path.to_path_buf(),
                message: format!(
                    "header declares {} threshold slots but the menu implies {}",
                    loaded.header.slots_per_event(),
                    sample.slots_per_event
                ),
            });
        }

        for batch in &loaded.batches {
            for event in &batch.events {
                if event.thresholds.len() != sample.slots_per_event {
                    return Err(Error::SampleLoad {
                        path: path.to_path_buf(),
                        message: format!(
                            "event record has {} slots, expected {}",
                            event.thresholds.len(),
                            sample.slots_per_event
                        ),
                    });
                }
                sample.push_event(&event.thresholds, event.weight.unwrap_or(1.0));
            }
        }

        Ok(sample)
    }
}

fn bundle_error(path: &Path, error: BundleError) -> Error {
    match error {
        // A wrong magic or format version is a configuration problem, not
        // a transient one.
        BundleError::BadMagic | BundleError::UnsupportedVersion { .. } => {
            Error::Config(format!("{}: {error}", path.display()))
        }
        BundleError::Io(error) => Error::Io(error),
        other => Error::SampleLoad {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

impl Sample for ReducedSample {
    fn len(&self) -> usize {
        self.weights.len()
    }

    fn weight(&self, event: usize) -> f64 {
        f64::from(self.weights[event])
    }

    fn event_rate(&self) -> f64 {
        self.event_rate
    }

    fn sum_of_weights(&self) -> f64 {
        *self
            .sum_of_weights
            .get_or_init(|| self.weights.iter().map(|&weight| f64::from(weight)).sum())
    }

    fn cached_trigger<'a>(&'a self, trigger: &Trigger) -> Result<Box<dyn CachedTrigger + 'a>> {
        let mut rules = Vec::new();
        for (name, slot) in self.trigger_parameter_slots(trigger, false)? {
            rules.push((slot, trigger.parameter(&name)?));
        }
        Ok(Box::new(ReducedCachedTrigger {
            sample: self,
            rules,
        }))
    }

    fn scan_trigger<'a>(
        &'a self,
        trigger: &Trigger,
        versus: &str,
        scaled: &[ScaledParameter],
    ) -> Result<Box<dyn ScanTrigger + 'a>> {
        let mut rules = Vec::new();
        for (name, slot) in self.trigger_parameter_slots(trigger, false)? {
            let rule = if name == versus {
                SlotRule::Primary
            } else if let Some(parameter) = scaled.iter().find(|parameter| parameter.name == name) {
                SlotRule::Scaled(parameter.ratio)
            } else {
                SlotRule::Fixed(trigger.parameter(&name)?)
            };
            rules.push((slot, rule));
        }
        Ok(Box::new(ReducedScanTrigger {
            sample: self,
            rules,
        }))
    }
}

/// Cached evaluator: slot offsets were resolved at construction, so each
/// call is one float comparison per threshold.
struct ReducedCachedTrigger<'a> {
    sample: &'a ReducedSample,
    rules: Vec<(usize, f64)>,
}

impl CachedTrigger for ReducedCachedTrigger<'_> {
    fn passes(&self, event: usize) -> bool {
        self.rules.iter().all(|&(slot, needed)| {
            f64::from(self.sample.threshold(event, slot)) >= needed
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum SlotRule {
    Primary,
    Scaled(f64),
    Fixed(f64),
}

struct ReducedScanTrigger<'a> {
    sample: &'a ReducedSample,
    rules: Vec<(usize, SlotRule)>,
}

impl ScanTrigger for ReducedScanTrigger<'_> {
    fn passes_at(&self, event: usize, primary: f64) -> bool {
        self.rules.iter().all(|&(slot, rule)| {
            let needed = match rule {
                SlotRule::Primary => primary,
                SlotRule::Scaled(ratio) => ratio * primary,
                SlotRule::Fixed(value) => value,
            };
            f64::from(self.sample.threshold(event, slot)) >= needed
        })
    }
}
