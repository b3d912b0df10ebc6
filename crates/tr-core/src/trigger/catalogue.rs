//! The standard trigger catalogue.
//!
//! Each kind is a static capability table with a pure predicate. The
//! predicates are deliberately simple — the engine around them carries the
//! algorithmic weight. Index constants sit next to each parameter list so
//! `apply` implementations never do name lookups.

use super::{ParameterSpec, ThresholdCoupling, TriggerKind, TriggerRegistry};
use crate::event::{EventQuantities, ObjectKind};
use crate::trigger::Binning;

/// Every kind in the standard catalogue.
pub static ALL_KINDS: &[&TriggerKind] = &[
    &SINGLE_JET_V0,
    &DOUBLE_JET_V0,
    &ASYMMETRIC_DIJET_V0,
    &SINGLE_MUON_V0,
    &SINGLE_MUON_V1,
    &SINGLE_EGAMMA_V0,
    &ISO_EGAMMA_V0,
    &TOTAL_ENERGY_V0,
    &MISSING_ENERGY_V0,
    &JET_MUON_V0,
];

/// Suggested rate-curve binnings for kinds whose thresholds live outside
/// the default [0, 100] axis or are hardware-discretized more coarsely.
pub fn register_suggested_binnings(registry: &mut TriggerRegistry) {
    registry.register_suggested_binning(
        "TotalEnergy",
        "threshold1",
        Binning {
            bins: 160,
            low: 0.0,
            high: 800.0,
        },
    );
    registry.register_suggested_binning(
        "MissingEnergy",
        "threshold1",
        Binning {
            bins: 100,
            low: 0.0,
            high: 200.0,
        },
    );
    registry.register_suggested_binning(
        "SingleMuon",
        "threshold1",
        Binning {
            bins: 140,
            low: 0.0,
            high: 140.0,
        },
    );
    registry.register_suggested_binning(
        "SingleJet",
        "threshold1",
        Binning {
            bins: 128,
            low: 0.0,
            high: 256.0,
        },
    );
}

// --- single-object kinds ---------------------------------------------------

const SINGLE_THRESHOLD: usize = 0;
const SINGLE_ETA_CUT: usize = 1;

static SINGLE_JET_V0: TriggerKind = TriggerKind {
    name: "SingleJet",
    version: 0,
    parameters: &[
        ParameterSpec {
            name: "threshold1",
            default: 20.0,
        },
        ParameterSpec {
            name: "etaCut",
            default: 3.0,
        },
    ],
    thresholds: &["threshold1"],
    coupling: ThresholdCoupling::Independent,
    apply: |values, event| single_object_passes(values, event, ObjectKind::Jet, false),
};

static SINGLE_MUON_V0: TriggerKind = TriggerKind {
    name: "SingleMuon",
    version: 0,
    parameters: &[
        ParameterSpec {
            name: "threshold1",
            default: 10.0,
        },
        ParameterSpec {
            name: "etaCut",
            default: 2.4,
        },
    ],
    thresholds: &["threshold1"],
    coupling: ThresholdCoupling::Independent,
    apply: |values, event| single_object_passes(values, event, ObjectKind::Muon, false),
};

// v1 restricts the muon acceptance to the region with full chamber
// coverage.
static SINGLE_MUON_V1: TriggerKind = TriggerKind {
    name: "SingleMuon",
    version: 1,
    parameters: &[
        ParameterSpec {
            name: "threshold1",
            default: 10.0,
        },
        ParameterSpec {
            name: "etaCut",
            default: 2.1,
        },
    ],
    thresholds: &["threshold1"],
    coupling: ThresholdCoupling::Independent,
    apply: |values, event| single_object_passes(values, event, ObjectKind::Muon, false),
};

static SINGLE_EGAMMA_V0: TriggerKind = TriggerKind {
    name: "SingleEgamma",
    version: 0,
    parameters: &[
        ParameterSpec {
            name: "threshold1",
            default: 15.0,
        },
        ParameterSpec {
            name: "etaCut",
            default: 2.5,
        },
    ],
    thresholds: &["threshold1"],
    coupling: ThresholdCoupling::Independent,
    apply: |values, event| single_object_passes(values, event, ObjectKind::Egamma, false),
};

static ISO_EGAMMA_V0: TriggerKind = TriggerKind {
    name: "IsoEgamma",
    version: 0,
    parameters: &[
        ParameterSpec {
            name: "threshold1",
            default: 15.0,
        },
        ParameterSpec {
            name: "etaCut",
            default: 2.5,
        },
    ],
    thresholds: &["threshold1"],
    coupling: ThresholdCoupling::Independent,
    apply: |values, event| single_object_passes(values, event, ObjectKind::Egamma, true),
};

fn single_object_passes(
    values: &[f64],
    event: &EventQuantities,
    kind: ObjectKind,
    require_isolated: bool,
) -> bool {
    event.count_passing(
        kind,
        values[SINGLE_THRESHOLD],
        values[SINGLE_ETA_CUT],
        require_isolated,
    ) >= 1
}

// --- two-object kinds ------------------------------------------------------

const DIJET_THRESHOLD1: usize = 0;
const DIJET_THRESHOLD2: usize = 1;
const DIJET_ETA_CUT: usize = 2;

static DOUBLE_JET_V0: TriggerKind = TriggerKind {
    name: "DoubleJet",
    version: 0,
    parameters: &[
        ParameterSpec {
            name: "threshold1",
            default: 40.0,
        },
        ParameterSpec {
            name: "threshold2",
            default: 30.0,
        },
        ParameterSpec {
            name: "etaCut",
            default: 3.0,
        },
    ],
    thresholds: &["threshold1", "threshold2"],
    coupling: ThresholdCoupling::Independent,
    apply: dijet_passes,
};

// Same selection as DoubleJet, but the subleading threshold is locked to
// the leading one, so a scan moves both together.
static ASYMMETRIC_DIJET_V0: TriggerKind = TriggerKind {
    name: "AsymmetricDijet",
    version: 0,
    parameters: &[
        ParameterSpec {
            name: "threshold1",
            default: 60.0,
        },
        ParameterSpec {
            name: "threshold2",
            default: 30.0,
        },
        ParameterSpec {
            name: "etaCut",
            default: 3.0,
        },
    ],
    thresholds: &["threshold1", "threshold2"],
    coupling: ThresholdCoupling::Locked,
    apply: dijet_passes,
};

fn dijet_passes(values: &[f64], event: &EventQuantities) -> bool {
    let eta_cut = values[DIJET_ETA_CUT];
    event.count_passing(ObjectKind::Jet, values[DIJET_THRESHOLD1], eta_cut, false) >= 1
        && event.count_passing(ObjectKind::Jet, values[DIJET_THRESHOLD2], eta_cut, false) >= 2
}

// --- energy-sum kinds ------------------------------------------------------

const SUM_THRESHOLD: usize = 0;

static TOTAL_ENERGY_V0: TriggerKind = TriggerKind {
    name: "TotalEnergy",
    version: 0,
    parameters: &[ParameterSpec {
        name: "threshold1",
        default: 150.0,
    }],
    thresholds: &["threshold1"],
    coupling: ThresholdCoupling::Independent,
    apply: |values, event| event.total_energy >= values[SUM_THRESHOLD],
};

static MISSING_ENERGY_V0: TriggerKind = TriggerKind {
    name: "MissingEnergy",
    version: 0,
    parameters: &[ParameterSpec {
        name: "threshold1",
        default: 50.0,
    }],
    thresholds: &["threshold1"],
    coupling: ThresholdCoupling::Independent,
    apply: |values, event| event.missing_energy >= values[SUM_THRESHOLD],
};

// --- cross kinds -----------------------------------------------------------

const CROSS_LEG1_THRESHOLD: usize = 0;
const CROSS_LEG1_ETA_CUT: usize = 1;
const CROSS_LEG2_THRESHOLD: usize = 2;
const CROSS_LEG2_ETA_CUT: usize = 3;

static JET_MUON_V0: TriggerKind = TriggerKind {
    name: "JetMuon",
    version: 0,
    parameters: &[
        ParameterSpec {
            name: "leg1threshold1",
            default: 40.0,
        },
        ParameterSpec {
            name: "leg1etaCut",
            default: 3.0,
        },
        ParameterSpec {
            name: "leg2threshold1",
            default: 8.0,
        },
        ParameterSpec {
            name: "leg2etaCut",
            default: 2.4,
        },
    ],
    thresholds: &["leg1threshold1", "leg2threshold1"],
    coupling: ThresholdCoupling::Independent,
    apply: |values, event| {
        event.count_passing(
            ObjectKind::Jet,
            values[CROSS_LEG1_THRESHOLD],
            values[CROSS_LEG1_ETA_CUT],
            false,
        ) >= 1
            && event.count_passing(
                ObjectKind::Muon,
                values[CROSS_LEG2_THRESHOLD],
                values[CROSS_LEG2_ETA_CUT],
                false,
            ) >= 1
    },
};
