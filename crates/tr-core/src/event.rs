//! Physics-quantity interface to external reconstruction.
//!
//! Trigger predicates only ever see an [`EventQuantities`]: the candidate
//! objects and scalar sums an upstream reconstruction derived from the raw
//! detector record. How those quantities are produced is outside this
//! crate; full samples load them from JSONL files, one event per line.

use serde::{Deserialize, Serialize};

/// Kind of reconstructed candidate object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Jet,
    Muon,
    Egamma,
    Tau,
}

/// One reconstructed candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsObject {
    pub kind: ObjectKind,
    /// Transverse energy in GeV.
    pub energy: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Whether the candidate passed the upstream isolation requirement.
    #[serde(default)]
    pub isolated: bool,
}

/// Everything a trigger predicate can test on one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventQuantities {
    #[serde(default)]
    pub objects: Vec<PhysicsObject>,
    /// Scalar sum of hadronic transverse energy, in GeV.
    #[serde(default)]
    pub total_energy: f64,
    /// Magnitude of the missing transverse energy vector, in GeV.
    #[serde(default)]
    pub missing_energy: f64,
}

impl EventQuantities {
    /// Candidates of one kind, in no particular order.
    pub fn objects_of(&self, kind: ObjectKind) -> impl Iterator<Item = &PhysicsObject> {
        self.objects.iter().filter(move |object| object.kind == kind)
    }

    /// Number of candidates of `kind` with at least `min_energy`, within
    /// `|eta| <= max_abs_eta`, and isolated if `require_isolated`.
    pub fn count_passing(
        &self,
        kind: ObjectKind,
        min_energy: f64,
        max_abs_eta: f64,
        require_isolated: bool,
    ) -> usize {
        self.objects_of(kind)
            .filter(|object| {
                object.energy >= min_energy
                    && object.eta.abs() <= max_abs_eta
                    && (!require_isolated || object.isolated)
            })
            .count()
    }
}

/// One record of a full-sample JSONL file: the reconstructed quantities
/// plus the generator weight (1 when omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullEvent {
    #[serde(flatten)]
    pub quantities: EventQuantities,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl FullEvent {
    pub fn new(quantities: EventQuantities) -> Self {
        FullEvent {
            quantities,
            weight: 1.0,
        }
    }

    pub fn with_weight(quantities: EventQuantities, weight: f64) -> Self {
        FullEvent { quantities, weight }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jet(energy: f64, eta: f64) -> PhysicsObject {
        PhysicsObject {
            kind: ObjectKind::Jet,
            energy,
            eta,
            isolated: false,
        }
    }

    #[test]
    fn count_passing_applies_all_cuts() {
        let event = EventQuantities {
            objects: vec![
                jet(50.0, 0.5),
                jet(50.0, 4.0), // outside eta window
                jet(10.0, 0.1), // below energy
                PhysicsObject {
                    kind: ObjectKind::Muon,
                    energy: 60.0,
                    eta: 0.0,
                    isolated: true,
                },
            ],
            ..Default::default()
        };

        assert_eq!(event.count_passing(ObjectKind::Jet, 30.0, 3.0, false), 1);
        assert_eq!(event.count_passing(ObjectKind::Muon, 30.0, 3.0, true), 1);
        assert_eq!(event.count_passing(ObjectKind::Jet, 30.0, 3.0, true), 0);
    }

    #[test]
    fn jsonl_record_defaults_weight() {
        let record: FullEvent =
            serde_json::from_str(r#"{"objects":[],"total_energy":120.0}"#).unwrap();
        assert_eq!(record.weight, 1.0);
        assert_eq!(record.quantities.total_energy, 120.0);
    }
}
