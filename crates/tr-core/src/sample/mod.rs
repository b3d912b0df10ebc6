//! Event samples and cached trigger evaluation.
//!
//! Two sample kinds exist: [`FullSample`] holds reconstructed physics
//! quantities and re-derives every pass/fail decision from them;
//! [`ReducedSample`] holds, per event, the tightest threshold value per
//! trigger slot, so pass/fail is a float comparison.
//!
//! Both hand out cached evaluators. For full samples no speed-up is
//! possible (reconstruction dominates); for reduced samples the evaluator
//! resolves each threshold's storage slot once and never does a name lookup
//! again. Samples are immutable for rate purposes once any curve or rate
//! has been built from them; all appending happens before that point.

pub mod full;
pub mod reduce;
pub mod reduced;

pub use full::FullSample;
pub use reduce::{tightest_thresholds, ReducedSampleBuilder};
pub use reduced::ReducedSample;

use crate::menu::TriggerMenu;
use crate::trigger::{ScaledParameter, Trigger};
use tr_common::{MenuRate, Result};

/// A per-sample evaluator equivalent to a trigger's predicate at the
/// thresholds it was built with, but cheaper under repeated calls.
pub trait CachedTrigger {
    fn passes(&self, event: usize) -> bool;
}

/// A per-sample evaluator for threshold scans: the primary threshold moves
/// to the probed value and any co-scaled thresholds move with it at their
/// construction-time ratios; everything else stays at the built values.
pub trait ScanTrigger {
    fn passes_at(&self, event: usize, primary: f64) -> bool;
}

/// An ordered event collection with normalization.
pub trait Sample {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Weight of one event.
    fn weight(&self, event: usize) -> f64;

    /// Absolute rate corresponding to "every event passes", in Hz.
    fn event_rate(&self) -> f64;

    /// Cached sum of all event weights.
    fn sum_of_weights(&self) -> f64;

    /// Build a cached evaluator for this trigger.
    fn cached_trigger<'a>(&'a self, trigger: &Trigger) -> Result<Box<dyn CachedTrigger + 'a>>;

    /// Build a scan evaluator varying `versus`, with `scaled` parameters
    /// following it at fixed ratios.
    fn scan_trigger<'a>(
        &'a self,
        trigger: &Trigger,
        versus: &str,
        scaled: &[ScaledParameter],
    ) -> Result<Box<dyn ScanTrigger + 'a>>;

    /// Single-pass menu-rate aggregation over this sample.
    fn rate(&self, menu: &TriggerMenu) -> Result<MenuRate>
    where
        Self: Sized,
    {
        crate::rate::menu_rate(menu, self)
    }
}
