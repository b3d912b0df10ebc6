//! Iterative menu-threshold fitting.
//!
//! The fitter owns a menu, a rate curve per scalable trigger, and the
//! bandwidth share each of those triggers should get. It first sets every
//! scalable trigger's primary threshold from its curve at
//! `target × share`, then repeatedly rescales all per-trigger targets by
//! `target / current_total` until the menu's total rate lands within
//! tolerance.
//!
//! This is proportional rescaling, not gradient descent: it assumes the
//! triggers overlap weakly, so convergence is empirical. The iteration cap
//! exists precisely because strongly correlated menus may never converge;
//! hitting it is a distinct, non-fatal outcome carrying the last attempt
//! and the full per-iteration log, for the caller to accept or discard.

use crate::menu::{MenuEntry, TriggerMenu};
use crate::rate::{menu_rate, RateCurve, RateCurveSet};
use crate::sample::Sample;
use crate::trigger::{ScaledParameter, Trigger, TriggerRegistry};
use serde::Serialize;
use tr_common::{Error, MenuRate, Result};
use tracing::debug;

/// Default iteration cap, matching long-standing practice.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Everything the fitter tracks about one scalable trigger.
struct ScalingDetails {
    trigger_index: usize,
    bandwidth_fraction: f64,
    /// The absolute rate currently requested for this trigger; rescaled
    /// every iteration.
    current_target: f64,
    curve: RateCurve,
    primary: String,
    scalings: Vec<ScaledParameter>,
}

/// One threshold assignment inside an iteration.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdSetting {
    pub trigger: String,
    pub threshold: f64,
    pub target_rate: f64,
}

/// One fitter iteration: every tried threshold and the resulting total.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub settings: Vec<ThresholdSetting>,
    pub total_rate: f64,
}

/// How a fit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum FitOutcome {
    Converged { iterations: usize },
    CapReached { cap: usize },
}

/// A finished fit: the outcome, the menu rate of the last attempt, and the
/// per-iteration log.
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub outcome: FitOutcome,
    pub rate: MenuRate,
    pub iterations: Vec<IterationRecord>,
}

impl FitResult {
    pub fn converged(&self) -> bool {
        matches!(self.outcome, FitOutcome::Converged { .. })
    }
}

/// Iteratively rescales menu thresholds to converge on a target total rate.
pub struct MenuFitter<'a> {
    sample: &'a dyn Sample,
    registry: &'a TriggerRegistry,
    prebuilt: RateCurveSet,
    menu: TriggerMenu,
    scalable: Vec<ScalingDetails>,
    max_iterations: usize,
}

impl<'a> MenuFitter<'a> {
    pub fn new(sample: &'a dyn Sample, registry: &'a TriggerRegistry) -> Self {
        Self::with_curves(sample, registry, RateCurveSet::default())
    }

    /// A fitter that reuses pre-built curves where they match; curves are
    /// only built from the sample for triggers with no matching entry.
    pub fn with_curves(
        sample: &'a dyn Sample,
        registry: &'a TriggerRegistry,
        curves: RateCurveSet,
    ) -> Self {
        MenuFitter {
            sample,
            registry,
            prebuilt: curves,
            menu: TriggerMenu::new(),
            scalable: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Change the iteration cap.
    pub fn set_max_iterations(&mut self, cap: usize) {
        self.max_iterations = cap;
    }

    pub fn menu(&self) -> &TriggerMenu {
        &self.menu
    }

    /// The rate curve the fitter uses for one menu trigger, if it is
    /// scalable.
    pub fn curve_for(&self, trigger_index: usize) -> Option<&RateCurve> {
        self.scalable
            .iter()
            .find(|details| details.trigger_index == trigger_index)
            .map(|details| &details.curve)
    }

    /// The bandwidth share of one menu trigger, if it is scalable.
    pub fn bandwidth_fraction(&self, trigger_index: usize) -> Option<f64> {
        self.scalable
            .iter()
            .find(|details| details.trigger_index == trigger_index)
            .map(|details| details.bandwidth_fraction)
    }

    /// Add one trigger with its share of the total bandwidth.
    ///
    /// Locked triggers keep their thresholds and need no curve; they still
    /// count toward the total rate. A trigger without thresholds cannot be
    /// scaled and is treated as locked.
    pub fn add_trigger(
        &mut self,
        trigger: Trigger,
        bandwidth_fraction: f64,
        locked: bool,
    ) -> Result<()> {
        if !locked && !(0.0..=1.0).contains(&bandwidth_fraction) {
            return Err(Error::Config(format!(
                "bandwidth fraction {bandwidth_fraction} for {} is outside [0, 1]",
                trigger.name()
            )));
        }

        let trigger_index = self.menu.len();
        let scalable = !locked && !trigger.threshold_names().is_empty();
        self.menu.add_trigger(trigger.clone());
        if !scalable {
            return Ok(());
        }

        let primary = trigger.threshold_names()[0].to_string();
        let scalings = trigger.threshold_scalings()?;

        let curve = match self.prebuilt.find_matching(&trigger, true) {
            Some(curve) => curve.clone(),
            None => {
                debug!(trigger = trigger.name(), "building rate curve for fitter");
                let mut curve = RateCurve::for_trigger(&trigger, self.registry)?;
                curve.fill(self.sample)?;
                curve
            }
        };

        self.scalable.push(ScalingDetails {
            trigger_index,
            bandwidth_fraction,
            current_target: 0.0,
            curve,
            primary,
            scalings,
        });
        Ok(())
    }

    /// Add menu entries, converting their requested absolute rates into
    /// bandwidth fractions normalized across the scalable entries.
    pub fn load_entries(&mut self, entries: &[MenuEntry]) -> Result<()> {
        let total_requested: f64 = entries
            .iter()
            .filter(|entry| !entry.locked)
            .map(|entry| entry.requested_rate)
            .sum();

        let any_scalable = entries.iter().any(|entry| !entry.locked);
        if any_scalable && total_requested <= 0.0 {
            return Err(Error::Config(
                "requested rates of the scalable triggers sum to zero".to_string(),
            ));
        }

        for entry in entries {
            let fraction = if entry.locked {
                0.0
            } else {
                entry.requested_rate / total_requested
            };
            self.add_trigger(entry.trigger.clone(), fraction, entry.locked)?;
        }
        Ok(())
    }

    /// Fit the menu to `target_rate` within `tolerance`.
    pub fn fit(&mut self, target_rate: f64, tolerance: f64) -> Result<FitResult> {
        let mut iterations = Vec::new();

        // First pass: give every scalable trigger its requested share.
        // Overlaps usually pull the total below the target; the loop below
        // corrects for that.
        let mut settings = Vec::with_capacity(self.scalable.len());
        for details in &mut self.scalable {
            details.current_target = target_rate * details.bandwidth_fraction;
            let threshold = details.curve.threshold_for(details.current_target);
            apply_thresholds(&mut self.menu, details, threshold)?;
            debug!(
                trigger = self.menu.trigger(details.trigger_index).name(),
                threshold,
                target = details.current_target,
                "initial threshold"
            );
            settings.push(ThresholdSetting {
                trigger: self.menu.trigger(details.trigger_index).name().to_string(),
                threshold,
                target_rate: details.current_target,
            });
        }

        let mut rate = menu_rate(&self.menu, self.sample)?;
        iterations.push(IterationRecord {
            settings,
            total_rate: rate.total_rate,
        });

        let mut iteration = 0;
        while (rate.total_rate - target_rate).abs() > tolerance {
            // A non-positive total leaves nothing to rescale by.
            if iteration >= self.max_iterations || rate.total_rate <= 0.0 {
                debug!(
                    iterations = iteration,
                    total_rate = rate.total_rate,
                    "fit stopped before convergence"
                );
                return Ok(FitResult {
                    outcome: FitOutcome::CapReached {
                        cap: self.max_iterations,
                    },
                    rate,
                    iterations,
                });
            }
            iteration += 1;

            let scale = target_rate / rate.total_rate;
            debug!(
                iteration,
                total_rate = rate.total_rate,
                scale,
                "rescaling bandwidths"
            );

            let mut settings = Vec::with_capacity(self.scalable.len());
            for details in &mut self.scalable {
                details.current_target *= scale;
                let threshold = details.curve.threshold_for(details.current_target);
                apply_thresholds(&mut self.menu, details, threshold)?;
                settings.push(ThresholdSetting {
                    trigger: self.menu.trigger(details.trigger_index).name().to_string(),
                    threshold,
                    target_rate: details.current_target,
                });
            }

            rate = menu_rate(&self.menu, self.sample)?;
            iterations.push(IterationRecord {
                settings,
                total_rate: rate.total_rate,
            });
        }

        Ok(FitResult {
            outcome: FitOutcome::Converged {
                iterations: iteration,
            },
            rate,
            iterations,
        })
    }
}

/// Move a trigger's primary threshold and propagate the locked ratios.
fn apply_thresholds(
    menu: &mut TriggerMenu,
    details: &ScalingDetails,
    threshold: f64,
) -> Result<()> {
    let trigger = menu.trigger_mut(details.trigger_index);
    trigger.set_parameter(&details.primary, threshold)?;
    for scaled in &details.scalings {
        trigger.set_parameter(&scaled.name, scaled.ratio * threshold)?;
    }
    Ok(())
}
