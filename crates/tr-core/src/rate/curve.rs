//! Rate-versus-threshold curves.
//!
//! A [`RateCurve`] is a monotonic-non-increasing histogram of menu rate
//! against one trigger threshold, built in a single pass over a sample and
//! queried many times afterwards. Construction exploits monotonicity:
//! raising a threshold (and its co-scaled companions) can only remove
//! passing events, so per event only the pass/fail crossing bin needs to be
//! found, by bisection over the bin edges.

use crate::menu::TriggerMenu;
use crate::sample::{Sample, ScanTrigger};
use crate::trigger::{Binning, ScaledParameter, Trigger, TriggerRegistry};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tr_common::{Error, Result, TriggerSnapshot};
use tr_math::{BinLocation, Histogram};
use tracing::debug;

/// Slopes flatter than this are treated as zero when inverting the curve.
/// Hardware-discretized thresholds produce genuinely flat steps.
const SLOPE_TOLERANCE: f64 = 1e-4;

/// How many bins the inverted threshold may land away from the crossing
/// before the fit is redone with just the two straddling bins.
const MAX_BIN_DRIFT: i64 = 4;

/// Relative tolerance when comparing co-scaling ratios of two triggers.
const RATIO_TOLERANCE: f64 = 1e-4;

/// Rate as a function of one trigger threshold, over one sample.
#[derive(Debug, Clone)]
pub struct RateCurve {
    trigger: Trigger,
    versus: String,
    scaled: Vec<ScaledParameter>,
    hist: Histogram,
}

impl RateCurve {
    /// Create an empty curve for `trigger` against the `versus` threshold.
    ///
    /// Every name in `scaled_parameters` (other than `versus` itself) is
    /// locked to `versus` at the ratio implied by the trigger's current
    /// values. The trigger configuration is frozen into the curve.
    pub fn new(
        trigger: &Trigger,
        binning: Binning,
        versus: &str,
        scaled_parameters: &[String],
    ) -> Result<Self> {
        let trigger = trigger.clone();
        let primary_value = trigger.parameter(versus)?;

        let mut scaled = Vec::new();
        for name in scaled_parameters {
            if name == versus {
                continue;
            }
            scaled.push(ScaledParameter {
                name: name.clone(),
                ratio: trigger.parameter(name)? / primary_value,
            });
        }

        Ok(RateCurve {
            trigger,
            versus: versus.to_string(),
            scaled,
            hist: Histogram::new(binning.bins, binning.low, binning.high),
        })
    }

    /// Create the standard curve for one trigger: versus its primary
    /// threshold, with every other threshold co-scaled, on the suggested
    /// binning (or the default axis).
    pub fn for_trigger(trigger: &Trigger, registry: &TriggerRegistry) -> Result<Self> {
        let primary = trigger.threshold_names().first().ok_or_else(|| {
            Error::Config(format!(
                "trigger {} has no threshold to plot against",
                trigger.name()
            ))
        })?;
        let binning = registry.binning_or_default(trigger.name(), primary);
        let scaled: Vec<String> = trigger
            .threshold_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        RateCurve::new(trigger, binning, primary, &scaled)
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn versus(&self) -> &str {
        &self.versus
    }

    pub fn scaled_parameters(&self) -> &[ScaledParameter] {
        &self.scaled
    }

    pub fn histogram(&self) -> &Histogram {
        &self.hist
    }

    /// Fill the curve from every event of a sample.
    pub fn fill(&mut self, sample: &(impl Sample + ?Sized)) -> Result<()> {
        let weight_per_event = sample.event_rate() / sample.sum_of_weights();
        let scan = sample.scan_trigger(&self.trigger, &self.versus, &self.scaled)?;

        for event in 0..sample.len() {
            let weight = sample.weight(event) * weight_per_event;
            add_event(&mut self.hist, scan.as_ref(), event, weight);
        }
        debug!(
            trigger = self.trigger.name(),
            versus = %self.versus,
            events = sample.len(),
            "filled rate curve"
        );
        Ok(())
    }

    /// Rate at a threshold: direct bin lookup.
    pub fn rate_at(&self, threshold: f64) -> Result<f64> {
        match self.hist.find_bin(threshold) {
            BinLocation::Bin(bin) => Ok(self.hist.content(bin)),
            _ => Err(Error::ThresholdOutsideAxis {
                threshold,
                low: self.hist.low(),
                high: self.hist.high(),
            }),
        }
    }

    /// The threshold at which the curve reaches `target_rate`.
    ///
    /// Scans from low threshold for the first bin below the target, then
    /// inverts a least-squares line through that bin and the three around
    /// it. Flat steps (discretized thresholds) return the low edge of the
    /// step instead of dividing by a near-zero slope; a fit landing far
    /// from the crossing (possible near inflection points) is redone with
    /// only the two straddling bins. The result is clamped to the axis.
    pub fn threshold_for(&self, target_rate: f64) -> f64 {
        let bins = self.hist.bins();

        let mut crossing = bins - 1;
        for bin in 0..bins - 1 {
            if self.hist.content(bin) < target_rate {
                crossing = bin;
                break;
            }
        }
        // Keep the four-bin fit window on the histogram.
        let crossing = crossing.max(2);

        let window = [
            crossing as i64 - 2,
            crossing as i64 - 1,
            crossing as i64,
            crossing as i64 + 1,
        ];
        let points: Vec<(f64, f64)> = window
            .iter()
            .map(|&bin| bin.clamp(0, bins as i64 - 1) as usize)
            .map(|bin| (self.hist.low_edge(bin), self.hist.content(bin)))
            .collect();

        let line = tr_math::linear_fit(&points);
        let threshold = match line {
            Some(line) if line.slope.abs() >= SLOPE_TOLERANCE => {
                (target_rate - line.intercept) / line.slope
            }
            _ => return self.low_edge_of_flat_run(crossing),
        };

        let drift = match self.hist.find_bin(threshold) {
            BinLocation::Bin(bin) => (crossing as i64 - bin as i64).abs(),
            _ => i64::MAX,
        };
        if drift > MAX_BIN_DRIFT {
            // Refit with just the two bins straddling the crossing so the
            // result is guaranteed to land between them.
            let straddle = [
                (
                    self.hist.low_edge(crossing - 1),
                    self.hist.content(crossing - 1),
                ),
                (self.hist.low_edge(crossing), self.hist.content(crossing)),
            ];
            return match tr_math::linear_fit(&straddle) {
                Some(line) if line.slope.abs() >= SLOPE_TOLERANCE => {
                    self.clamp_to_axis((target_rate - line.intercept) / line.slope)
                }
                _ => self.hist.low_edge(crossing - 1),
            };
        }

        self.clamp_to_axis(threshold)
    }

    fn low_edge_of_flat_run(&self, mut bin: usize) -> f64 {
        while bin > 0 && self.hist.content(bin) == self.hist.content(bin - 1) {
            bin -= 1;
        }
        self.hist.low_edge(bin)
    }

    fn clamp_to_axis(&self, threshold: f64) -> f64 {
        threshold.clamp(0.0, self.hist.high())
    }

    /// Asymmetric uncertainty on a threshold: how far the threshold can
    /// move in each direction while the neighbouring bins' content ± error
    /// still brackets the rate at the threshold.
    ///
    /// Fails when the threshold lies outside the axis — there is no bin
    /// content to compare against.
    pub fn threshold_error(&self, threshold: f64) -> Result<(f64, f64)> {
        let bin = match self.hist.find_bin(threshold) {
            BinLocation::Bin(bin) => bin,
            _ => {
                return Err(Error::ThresholdOutsideAxis {
                    threshold,
                    low: self.hist.low(),
                    high: self.hist.high(),
                })
            }
        };
        let rate = self.hist.content(bin);

        let mut lowest = bin;
        while lowest > 0 {
            if self.hist.content(lowest - 1) - self.hist.error(lowest - 1) > rate {
                break;
            }
            lowest -= 1;
        }

        let mut highest = bin;
        while highest < self.hist.bins() {
            if self.hist.content(highest) + self.hist.error(highest) < rate {
                break;
            }
            highest += 1;
        }

        Ok((
            threshold - self.hist.low_edge(lowest),
            self.hist.low_edge(highest) - threshold,
        ))
    }

    /// Whether this curve was built for an equivalent trigger: same name
    /// (and version when requested), identical fixed parameters, and the
    /// same co-scaling ratios within tolerance. Threshold values may
    /// differ — that is the axis the curve varies.
    pub fn matches_trigger(&self, trigger: &Trigger, match_version: bool) -> bool {
        if trigger.name() != self.trigger.name() {
            return false;
        }
        if match_version && trigger.version() != self.trigger.version() {
            return false;
        }

        for name in self.trigger.parameter_names() {
            if name == self.versus {
                continue;
            }
            if self.scaled.iter().any(|scaled| scaled.name == name) {
                continue;
            }
            if trigger.try_parameter(name) != self.trigger.try_parameter(name) {
                return false;
            }
        }

        let Some(main_threshold) = trigger.try_parameter(&self.versus) else {
            return false;
        };
        for scaled in &self.scaled {
            let Some(value) = trigger.try_parameter(&scaled.name) else {
                return false;
            };
            if (value / main_threshold - scaled.ratio).abs() > RATIO_TOLERANCE {
                return false;
            }
        }
        true
    }

    /// Serializable form of the curve.
    pub fn to_record(&self) -> CurveRecord {
        CurveRecord {
            trigger: self.trigger.snapshot(),
            versus: self.versus.clone(),
            scaled: self.scaled.clone(),
            histogram: self.hist.clone(),
        }
    }

    /// Rebuild a curve from its serialized form, resolving the trigger
    /// through the registry.
    pub fn from_record(record: CurveRecord, registry: &TriggerRegistry) -> Result<Self> {
        let mut trigger = registry.exact(&record.trigger.name, record.trigger.version)?;
        for parameter in &record.trigger.parameters {
            trigger.set_parameter(&parameter.name, parameter.value)?;
        }
        Ok(RateCurve {
            trigger,
            versus: record.versus,
            scaled: record.scaled,
            hist: record.histogram,
        })
    }
}

/// Bisection fill for one event: find the crossing bin, then credit the
/// event's weight to every bin at or below it.
fn add_event(hist: &mut Histogram, scan: &dyn ScanTrigger, event: usize, weight: f64) {
    let mut low_bin = 0;
    let mut high_bin = hist.bins() - 1;

    // Fails at the lowest edge: fails everywhere higher, nothing to fill.
    if !scan.passes_at(event, hist.low_edge(low_bin)) {
        return;
    }

    // Passes at the highest edge: every bin gets the weight.
    if scan.passes_at(event, hist.low_edge(high_bin)) {
        low_bin = high_bin;
    } else {
        while high_bin - low_bin > 1 {
            let middle = (high_bin + low_bin) / 2;
            if scan.passes_at(event, hist.low_edge(middle)) {
                low_bin = middle;
            } else {
                high_bin = middle;
            }
        }
    }

    hist.fill_up_to(low_bin, weight);
}

/// Serialized form of a [`RateCurve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveRecord {
    pub trigger: TriggerSnapshot,
    pub versus: String,
    pub scaled: Vec<ScaledParameter>,
    pub histogram: Histogram,
}

/// The standard curves for a whole menu, filled in a single event pass.
///
/// Fetching an event can dominate the cost for full samples, so all curves
/// share one loop over the sample rather than one pass each.
#[derive(Debug, Clone, Default)]
pub struct RateCurveSet {
    curves: Vec<RateCurve>,
}

impl RateCurveSet {
    /// One empty standard curve per menu trigger.
    pub fn for_menu(menu: &TriggerMenu, registry: &TriggerRegistry) -> Result<Self> {
        let mut curves = Vec::with_capacity(menu.len());
        for trigger in menu.iter() {
            curves.push(RateCurve::for_trigger(trigger, registry)?);
        }
        Ok(RateCurveSet { curves })
    }

    pub fn curves(&self) -> &[RateCurve] {
        &self.curves
    }

    /// Fill every curve from one pass over the sample.
    pub fn fill(&mut self, sample: &(impl Sample + ?Sized)) -> Result<()> {
        let weight_per_event = sample.event_rate() / sample.sum_of_weights();

        let mut scans = Vec::with_capacity(self.curves.len());
        for curve in &self.curves {
            scans.push(sample.scan_trigger(&curve.trigger, &curve.versus, &curve.scaled)?);
        }

        for event in 0..sample.len() {
            let weight = sample.weight(event) * weight_per_event;
            for (curve, scan) in self.curves.iter_mut().zip(&scans) {
                add_event(&mut curve.hist, scan.as_ref(), event, weight);
            }
        }
        Ok(())
    }

    /// The first curve built for an equivalent trigger, if any.
    pub fn find_matching(&self, trigger: &Trigger, match_version: bool) -> Option<&RateCurve> {
        self.curves
            .iter()
            .find(|curve| curve.matches_trigger(trigger, match_version))
    }

    pub fn to_records(&self) -> Vec<CurveRecord> {
        self.curves.iter().map(RateCurve::to_record).collect()
    }

    pub fn from_records(records: Vec<CurveRecord>, registry: &TriggerRegistry) -> Result<Self> {
        let mut curves = Vec::with_capacity(records.len());
        for record in records {
            curves.push(RateCurve::from_record(record, registry)?);
        }
        Ok(RateCurveSet { curves })
    }

    /// Write the curves as a JSON array of records.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.to_records())?;
        Ok(())
    }

    /// Load curves from a JSON array of records.
    pub fn load_json(path: &Path, registry: &TriggerRegistry) -> Result<Self> {
        let file = File::open(path)?;
        let records: Vec<CurveRecord> = serde_json::from_reader(BufReader::new(file))?;
        Self::from_records(records, registry)
    }
}
