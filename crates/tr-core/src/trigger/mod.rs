//! Trigger kinds, live triggers, and threshold conventions.
//!
//! A trigger kind is a static capability table: a name, a version, ordered
//! parameter specs, the subset of parameters that are tunable thresholds,
//! and a pure predicate over one event. A live [`Trigger`] is a kind plus
//! owned parameter values; copying one is just a clone.
//!
//! Threshold parameters follow the naming convention `threshold1`,
//! `threshold2`, … with a `legN` prefix for multi-leg triggers
//! (`leg1threshold1`, `leg2threshold1`, …). The kind lists them explicitly
//! in that order, so no name probing is ever needed.

pub mod catalogue;
pub mod registry;

pub use registry::{Binning, TriggerRegistry};

use crate::event::EventQuantities;
use serde::{Deserialize, Serialize};
use tr_common::{Error, ParameterValue, Result, TriggerSnapshot};

/// How a kind's thresholds move relative to each other.
///
/// `Locked` means only the first threshold may be varied independently; all
/// others follow it at the ratio implied by their values at the time the
/// scan or reduction froze them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdCoupling {
    Independent,
    Locked,
}

/// Specification of one named parameter with its default value.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub default: f64,
}

/// Static description of a trigger kind.
///
/// `apply` receives the parameter values in the order `parameters` declares
/// them; kind modules define index constants alongside the spec list so the
/// two cannot drift apart silently.
pub struct TriggerKind {
    pub name: &'static str,
    pub version: u32,
    pub parameters: &'static [ParameterSpec],
    /// Threshold parameters in their conventional order; a subset of
    /// `parameters`.
    pub thresholds: &'static [&'static str],
    pub coupling: ThresholdCoupling,
    pub apply: fn(&[f64], &EventQuantities) -> bool,
}

/// A named co-scaled parameter and its ratio to the primary threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledParameter {
    pub name: String,
    pub ratio: f64,
}

/// A live trigger: a kind plus owned parameter values.
#[derive(Clone)]
pub struct Trigger {
    kind: &'static TriggerKind,
    values: Vec<f64>,
}

impl Trigger {
    pub(crate) fn from_kind(kind: &'static TriggerKind) -> Self {
        Trigger {
            kind,
            values: kind.parameters.iter().map(|spec| spec.default).collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name
    }

    pub fn version(&self) -> u32 {
        self.kind.version
    }

    /// All parameter names in declaration order.
    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.kind.parameters.iter().map(|spec| spec.name).collect()
    }

    /// Threshold parameter names in their conventional order.
    pub fn threshold_names(&self) -> &'static [&'static str] {
        self.kind.thresholds
    }

    /// Parameter names that are not thresholds, in declaration order.
    pub fn non_threshold_parameter_names(&self) -> Vec<&'static str> {
        self.kind
            .parameters
            .iter()
            .map(|spec| spec.name)
            .filter(|name| !self.kind.thresholds.contains(name))
            .collect()
    }

    /// True when only the first threshold may be varied independently.
    pub fn thresholds_are_correlated(&self) -> bool {
        self.kind.coupling == ThresholdCoupling::Locked
    }

    pub(crate) fn parameter_index(&self, name: &str) -> Option<usize> {
        self.kind
            .parameters
            .iter()
            .position(|spec| spec.name == name)
    }

    pub(crate) fn set_value_at(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }

    /// Value of a parameter, or None when the kind has no such parameter.
    pub fn try_parameter(&self, name: &str) -> Option<f64> {
        self.parameter_index(name).map(|index| self.values[index])
    }

    /// Value of a parameter by name.
    pub fn parameter(&self, name: &str) -> Result<f64> {
        self.try_parameter(name)
            .ok_or_else(|| Error::UnknownParameter {
                trigger: self.kind.name.to_string(),
                parameter: name.to_string(),
            })
    }

    /// Set a parameter by name.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        match self.parameter_index(name) {
            Some(index) => {
                self.values[index] = value;
                Ok(())
            }
            None => Err(Error::UnknownParameter {
                trigger: self.kind.name.to_string(),
                parameter: name.to_string(),
            }),
        }
    }

    /// The parameter values in declaration order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Apply this trigger's predicate to one event.
    pub fn apply(&self, event: &EventQuantities) -> bool {
        (self.kind.apply)(&self.values, event)
    }

    /// Ratios of every non-primary threshold to the primary, frozen at the
    /// current parameter values. Empty when the trigger has fewer than two
    /// thresholds. The primary is the first threshold name.
    pub fn threshold_scalings(&self) -> Result<Vec<ScaledParameter>> {
        let mut scalings = Vec::new();
        let Some(primary) = self.kind.thresholds.first() else {
            return Ok(scalings);
        };
        let primary_value = self.parameter(primary)?;

        for name in &self.kind.thresholds[1..] {
            scalings.push(ScaledParameter {
                name: name.to_string(),
                ratio: self.parameter(name)? / primary_value,
            });
        }
        Ok(scalings)
    }

    /// Frozen copy of the configuration for results and artifacts.
    pub fn snapshot(&self) -> TriggerSnapshot {
        TriggerSnapshot {
            name: self.kind.name.to_string(),
            version: self.kind.version,
            parameters: self
                .kind
                .parameters
                .iter()
                .zip(&self.values)
                .map(|(spec, &value)| ParameterValue {
                    name: spec.name.to_string(),
                    value,
                })
                .collect(),
            thresholds: self
                .kind
                .thresholds
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.kind.name)
            .field("version", &self.kind.version)
            .field("values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_jet() -> Trigger {
        TriggerRegistry::standard().latest("SingleJet").unwrap()
    }

    #[test]
    fn parameter_access() {
        let mut trigger = single_jet();
        assert!(trigger.try_parameter("threshold1").is_some());
        assert!(trigger.try_parameter("threshold9").is_none());
        assert!(trigger.parameter("threshold9").is_err());

        trigger.set_parameter("threshold1", 42.0).unwrap();
        assert_eq!(trigger.parameter("threshold1").unwrap(), 42.0);
    }

    #[test]
    fn snapshot_freezes_values() {
        let mut trigger = single_jet();
        trigger.set_parameter("threshold1", 35.0).unwrap();
        let snapshot = trigger.snapshot();

        trigger.set_parameter("threshold1", 99.0).unwrap();
        assert_eq!(snapshot.parameter("threshold1"), Some(35.0));
        assert_eq!(snapshot.name, "SingleJet");
    }

    #[test]
    fn threshold_scalings_use_current_values() {
        let registry = TriggerRegistry::standard();
        let mut trigger = registry.latest("DoubleJet").unwrap();
        trigger.set_parameter("threshold1", 100.0).unwrap();
        trigger.set_parameter("threshold2", 60.0).unwrap();

        let scalings = trigger.threshold_scalings().unwrap();
        assert_eq!(scalings.len(), 1);
        assert_eq!(scalings[0].name, "threshold2");
        assert!((scalings[0].ratio - 0.6).abs() < 1e-12);
    }
}
