//! Rate value objects shared between the engine and the report encoders.
//!
//! These are plain data: the aggregator in `tr-core` produces them, the
//! encoders in `tr-report` render and reload them. Every number is carried
//! explicitly so a `MenuRate` round-trips losslessly through the structured
//! name→value encoding.

use serde::{Deserialize, Serialize};

/// One named parameter value of a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: f64,
}

/// Frozen copy of a trigger's configuration.
///
/// Rate results reference snapshots rather than live triggers, so later
/// menu edits cannot change an already-computed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSnapshot {
    pub name: String,
    pub version: u32,
    /// All parameters in declaration order.
    pub parameters: Vec<ParameterValue>,
    /// Names of the threshold parameters, in their conventional order.
    pub thresholds: Vec<String>,
}

impl TriggerSnapshot {
    /// Value of a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| parameter.value)
    }

    /// Threshold values in order, for report columns.
    pub fn threshold_values(&self) -> Vec<f64> {
        self.thresholds
            .iter()
            .filter_map(|name| self.parameter(name))
            .collect()
    }
}

/// Rates for a single trigger within a menu.
///
/// `fraction` is the weighted fraction of events passing this trigger;
/// `rate` is that fraction scaled by the sample's absolute event rate. The
/// `pure_*` numbers count only events that passed no other trigger in the
/// menu. Errors come from the sum of squared weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRate {
    pub trigger: TriggerSnapshot,
    pub fraction: f64,
    pub fraction_error: f64,
    pub rate: f64,
    pub rate_error: f64,
    pub pure_fraction: f64,
    pub pure_fraction_error: f64,
    pub pure_rate: f64,
    pub pure_rate_error: f64,
}

/// Rates for a whole menu over one sample.
///
/// The totals count events passing at least one trigger, so they are
/// bounded above by the sum of the per-trigger rates (overlaps counted
/// once) and below by the sum of the pure rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRate {
    pub total_fraction: f64,
    pub total_fraction_error: f64,
    pub total_rate: f64,
    pub total_rate_error: f64,
    pub trigger_rates: Vec<TriggerRate>,
}

impl MenuRate {
    /// Sum of the per-trigger rates, counting overlaps multiply.
    pub fn rate_without_overlaps(&self) -> f64 {
        self.trigger_rates.iter().map(|rate| rate.rate).sum()
    }

    /// Sum of the pure rates.
    pub fn pure_rate_total(&self) -> f64 {
        self.trigger_rates.iter().map(|rate| rate.pure_rate).sum()
    }
}
