//! Reduction equivalence and artifact round-trips.

use tempfile::TempDir;
use tr_core::event::{EventQuantities, FullEvent, ObjectKind, PhysicsObject};
use tr_core::menu::TriggerMenu;
use tr_core::rate::menu_rate;
use tr_core::sample::{FullSample, ReducedSample, ReducedSampleBuilder, Sample};
use tr_core::trigger::TriggerRegistry;

const TOLERANCE: f64 = 0.001;

fn object(kind: ObjectKind, energy: f64, eta: f64) -> PhysicsObject {
    PhysicsObject {
        kind,
        energy,
        eta,
        isolated: false,
    }
}

/// A deterministic but irregular sample: event i gets a jet, sometimes a
/// second jet, sometimes a muon, and a hadronic sum.
fn varied_sample() -> FullSample {
    let mut sample = FullSample::new();
    for i in 0..60u32 {
        let base = f64::from(i * 7 % 97);
        let mut objects = vec![object(ObjectKind::Jet, base, 0.4)];
        if i % 3 == 0 {
            objects.push(object(ObjectKind::Jet, base * 0.6, -1.2));
        }
        if i % 4 == 0 {
            objects.push(object(ObjectKind::Muon, f64::from(i % 40), 0.9));
        }
        sample.push(FullEvent::with_weight(
            EventQuantities {
                objects,
                total_energy: base * 2.0,
                missing_energy: 0.0,
            },
            if i % 5 == 0 { 0.5 } else { 1.0 },
        ));
    }
    sample.set_event_rate(1_000.0);
    sample
}

fn menu(registry: &TriggerRegistry) -> TriggerMenu {
    let mut menu = TriggerMenu::new();
    menu.add_trigger(registry.latest("SingleJet").unwrap());
    menu.add_trigger(registry.latest("DoubleJet").unwrap());
    menu.add_trigger(registry.latest("TotalEnergy").unwrap());
    menu.add_trigger(registry.latest("JetMuon").unwrap());
    menu
}

fn reduce(registry: &TriggerRegistry, full: &FullSample) -> ReducedSample {
    let mut builder = ReducedSampleBuilder::new(menu(registry), registry);
    builder.set_event_rate(full.event_rate());
    builder.append_full_sample(full);
    builder.finish()
}

/// For every event, uncorrelated trigger, and probed threshold away from
/// the stored crossing, the reduced pass decision matches re-deriving from
/// the full event.
#[test]
fn reduction_is_equivalent_to_full_evaluation() {
    let registry = TriggerRegistry::standard();
    let full = varied_sample();
    let reduced = reduce(&registry, &full);

    for trigger_name in ["SingleJet", "TotalEnergy"] {
        let base = registry.latest(trigger_name).unwrap();
        // Probe between bin-ish values, avoiding the bisection tolerance
        // band around each stored crossing.
        for step in 0..40 {
            let threshold = step as f64 * 5.0 + 1.5;
            let mut probe = base.clone();
            probe.set_parameter("threshold1", threshold).unwrap();

            let cached = reduced.cached_trigger(&probe).unwrap();
            for event in 0..full.len() {
                let slots = reduced.trigger_parameter_slots(&probe, false).unwrap();
                let stored = f64::from(reduced.threshold(event, slots[0].1));
                if (stored - threshold).abs() <= TOLERANCE {
                    continue;
                }
                assert_eq!(
                    cached.passes(event),
                    probe.apply(full.quantities(event)),
                    "{trigger_name} at {threshold} on event {event} (stored {stored})"
                );
            }
        }
    }
}

#[test]
fn reduced_rates_match_full_rates() {
    let registry = TriggerRegistry::standard();
    let full = varied_sample();
    let reduced = reduce(&registry, &full);

    // Thresholds chosen away from any stored crossing tolerance band.
    let mut menu = TriggerMenu::new();
    let mut jet = registry.latest("SingleJet").unwrap();
    jet.set_parameter("threshold1", 30.5).unwrap();
    menu.add_trigger(jet);
    let mut sum = registry.latest("TotalEnergy").unwrap();
    sum.set_parameter("threshold1", 80.5).unwrap();
    menu.add_trigger(sum);

    let from_full = menu_rate(&menu, &full).unwrap();
    let from_reduced = menu_rate(&menu, &reduced).unwrap();

    assert!((from_full.total_rate - from_reduced.total_rate).abs() < 1e-6);
    for (full_rate, reduced_rate) in from_full
        .trigger_rates
        .iter()
        .zip(&from_reduced.trigger_rates)
    {
        assert!((full_rate.rate - reduced_rate.rate).abs() < 1e-6);
        assert!((full_rate.pure_rate - reduced_rate.pure_rate).abs() < 1e-6);
    }
}

#[test]
fn artifact_roundtrip_preserves_rates_and_menu() {
    let registry = TriggerRegistry::standard();
    let full = varied_sample();
    let reduced = reduce(&registry, &full);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("varied.trs");
    reduced.save(&path).unwrap();

    let reloaded = ReducedSample::load(&path, &registry).unwrap();
    assert_eq!(reloaded.len(), reduced.len());
    assert_eq!(reloaded.event_rate(), reduced.event_rate());
    assert_eq!(reloaded.sum_of_weights(), reduced.sum_of_weights());
    assert_eq!(reloaded.menu().len(), reduced.menu().len());

    let probe_menu = reduced.menu().clone();
    let before = menu_rate(&probe_menu, &reduced).unwrap();
    let after = menu_rate(&probe_menu, &reloaded).unwrap();
    assert_eq!(before.total_rate, after.total_rate);
    for (rate_before, rate_after) in before.trigger_rates.iter().zip(&after.trigger_rates) {
        assert_eq!(rate_before.rate, rate_after.rate);
        assert_eq!(rate_before.pure_rate, rate_after.pure_rate);
    }
}

#[test]
fn incremental_build_from_several_full_inputs() {
    let registry = TriggerRegistry::standard();

    let mut first = FullSample::new();
    let mut second = FullSample::new();
    for i in 0..20 {
        first.push(FullEvent::new(EventQuantities {
            objects: vec![object(ObjectKind::Jet, f64::from(i) * 3.0, 0.0)],
            ..Default::default()
        }));
        second.push(FullEvent::new(EventQuantities {
            objects: vec![object(ObjectKind::Jet, f64::from(i) * 4.0, 0.0)],
            ..Default::default()
        }));
    }

    let mut small_menu = TriggerMenu::new();
    small_menu.add_trigger(registry.latest("SingleJet").unwrap());

    let mut builder = ReducedSampleBuilder::new(small_menu, &registry);
    builder.append_full_sample(&first);
    builder.append_full_sample(&second);
    let sample = builder.finish();

    assert_eq!(sample.len(), 40);
    assert_eq!(sample.sum_of_weights(), 40.0);
}
