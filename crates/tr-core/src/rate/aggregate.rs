//! Single-pass menu-rate aggregation.
//!
//! One loop over the sample evaluates every menu trigger through its cached
//! evaluator, accumulating per-trigger weighted pass counts (and squared
//! weights for errors), the pure counts for events passing exactly one
//! trigger, and the menu totals for events passing at least one.

use crate::menu::TriggerMenu;
use crate::sample::Sample;
use tr_common::{MenuRate, Result, TriggerRate};
use tr_math::WeightedCount;

/// Compute per-trigger, pure, and total rates for a menu over a sample.
///
/// Each trigger's cached evaluator is created exactly once and reused for
/// every event. The result references frozen trigger snapshots, so later
/// menu edits cannot change it.
pub fn menu_rate<S: Sample + ?Sized>(menu: &TriggerMenu, sample: &S) -> Result<MenuRate> {
    let mut cached = Vec::with_capacity(menu.len());
    for trigger in menu.iter() {
        cached.push(sample.cached_trigger(trigger)?);
    }

    let mut passed = vec![WeightedCount::default(); menu.len()];
    let mut pure = vec![WeightedCount::default(); menu.len()];
    let mut any = WeightedCount::default();
    let mut total_weight = 0.0;

    for event in 0..sample.len() {
        let weight = sample.weight(event);
        total_weight += weight;

        let mut triggers_passed = 0;
        let mut last_passed = 0;
        for (index, evaluator) in cached.iter().enumerate() {
            if evaluator.passes(event) {
                triggers_passed += 1;
                passed[index].add(weight);
                last_passed = index;
            }
        }

        if triggers_passed == 1 {
            pure[last_passed].add(weight);
        }
        if triggers_passed > 0 {
            any.add(weight);
        }
    }

    let scaling = sample.event_rate();
    let (total_fraction, total_fraction_error) = any.fraction_of(total_weight);

    let trigger_rates = menu
        .iter()
        .zip(passed.iter().zip(&pure))
        .map(|(trigger, (passed_count, pure_count))| {
            let (fraction, fraction_error) = passed_count.fraction_of(total_weight);
            let (pure_fraction, pure_fraction_error) = pure_count.fraction_of(total_weight);
            TriggerRate {
                trigger: trigger.snapshot(),
                fraction,
                fraction_error,
                rate: fraction * scaling,
                rate_error: fraction_error * scaling,
                pure_fraction,
                pure_fraction_error,
                pure_rate: pure_fraction * scaling,
                pure_rate_error: pure_fraction_error * scaling,
            }
        })
        .collect();

    Ok(MenuRate {
        total_fraction,
        total_fraction_error,
        total_rate: total_fraction * scaling,
        total_rate_error: total_fraction_error * scaling,
        trigger_rates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventQuantities, FullEvent, ObjectKind, PhysicsObject};
    use crate::sample::FullSample;
    use crate::trigger::TriggerRegistry;

    fn object(kind: ObjectKind, energy: f64) -> PhysicsObject {
        PhysicsObject {
            kind,
            energy,
            eta: 0.0,
            isolated: false,
        }
    }

    /// Four unit-weight events: jet only, muon only, both, neither.
    fn sample() -> FullSample {
        let mut sample = FullSample::new();
        sample.push(FullEvent::new(EventQuantities {
            objects: vec![object(ObjectKind::Jet, 50.0)],
            ..Default::default()
        }));
        sample.push(FullEvent::new(EventQuantities {
            objects: vec![object(ObjectKind::Muon, 20.0)],
            ..Default::default()
        }));
        sample.push(FullEvent::new(EventQuantities {
            objects: vec![object(ObjectKind::Jet, 50.0), object(ObjectKind::Muon, 20.0)],
            ..Default::default()
        }));
        sample.push(FullEvent::new(EventQuantities::default()));
        sample
    }

    fn menu(registry: &TriggerRegistry) -> TriggerMenu {
        let mut menu = TriggerMenu::new();
        let mut jet = registry.latest("SingleJet").unwrap();
        jet.set_parameter("threshold1", 30.0).unwrap();
        menu.add_trigger(jet);
        let mut muon = registry.latest("SingleMuon").unwrap();
        muon.set_parameter("threshold1", 10.0).unwrap();
        menu.add_trigger(muon);
        menu
    }

    #[test]
    fn fractions_pure_and_totals() {
        let registry = TriggerRegistry::standard();
        let mut sample = sample();
        sample.set_event_rate(1000.0);

        let rate = menu_rate(&menu(&registry), &sample).unwrap();

        // Jet passes events 0 and 2, muon passes 1 and 2; each is pure once.
        assert_eq!(rate.trigger_rates[0].fraction, 0.5);
        assert_eq!(rate.trigger_rates[1].fraction, 0.5);
        assert_eq!(rate.trigger_rates[0].pure_fraction, 0.25);
        assert_eq!(rate.trigger_rates[1].pure_fraction, 0.25);

        // Three of four events pass at least one trigger.
        assert_eq!(rate.total_fraction, 0.75);
        assert_eq!(rate.total_rate, 750.0);

        // Unit weights: error = sqrt(n_pass) / n_total.
        assert!((rate.trigger_rates[0].fraction_error - 2.0f64.sqrt() / 4.0).abs() < 1e-12);
        assert!((rate.total_rate_error - 3.0f64.sqrt() / 4.0 * 1000.0).abs() < 1e-9);
    }

    #[test]
    fn aggregation_consistency_bounds() {
        let registry = TriggerRegistry::standard();
        let sample = sample();

        let rate = menu_rate(&menu(&registry), &sample).unwrap();

        let sum_of_rates = rate.rate_without_overlaps();
        let sum_of_pure = rate.pure_rate_total();
        assert!(sum_of_pure <= rate.total_rate + 1e-12);
        assert!(rate.total_rate <= sum_of_rates + 1e-12);
    }

    #[test]
    fn snapshots_are_frozen_copies() {
        let registry = TriggerRegistry::standard();
        let sample = sample();
        let mut menu = menu(&registry);

        let rate = menu_rate(&menu, &sample).unwrap();
        menu.trigger_mut(0)
            .set_parameter("threshold1", 99.0)
            .unwrap();

        assert_eq!(rate.trigger_rates[0].trigger.parameter("threshold1"), Some(30.0));
    }

    #[test]
    fn empty_sample_yields_zero_rates() {
        let registry = TriggerRegistry::standard();
        let sample = FullSample::new();

        let rate = menu_rate(&menu(&registry), &sample).unwrap();
        assert_eq!(rate.total_fraction, 0.0);
        assert_eq!(rate.total_rate, 0.0);
    }
}
