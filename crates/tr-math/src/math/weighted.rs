//! Weighted pass-count statistics.
//!
//! An accumulator for Σw and Σw² over a subset of events, and the
//! fraction-with-error computation used by the menu-rate aggregator:
//! fraction = Σw(pass)/Σw(all), error = sqrt(Σw²(pass))/Σw(all).

use serde::{Deserialize, Serialize};

/// Running sum of weights and squared weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedCount {
    pub sum: f64,
    pub sum_sq: f64,
}

impl WeightedCount {
    pub fn add(&mut self, weight: f64) {
        self.sum += weight;
        self.sum_sq += weight * weight;
    }

    /// Statistical error on the sum, `sqrt(Σw²)`.
    pub fn error(&self) -> f64 {
        self.sum_sq.sqrt()
    }

    /// Fraction of `total_weight` this count represents, with its error.
    ///
    /// Returns (0, 0) when the total weight is zero (an empty sample has no
    /// meaningful fraction).
    pub fn fraction_of(&self, total_weight: f64) -> (f64, f64) {
        if total_weight == 0.0 {
            return (0.0, 0.0);
        }
        (self.sum / total_weight, self.error() / total_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_weights() {
        let mut count = WeightedCount::default();
        for _ in 0..25 {
            count.add(1.0);
        }
        assert_eq!(count.sum, 25.0);
        assert_eq!(count.error(), 5.0);

        let (fraction, error) = count.fraction_of(100.0);
        assert_eq!(fraction, 0.25);
        assert_eq!(error, 0.05);
    }

    #[test]
    fn non_unit_weights() {
        let mut count = WeightedCount::default();
        count.add(2.0);
        count.add(3.0);
        assert_eq!(count.sum, 5.0);
        assert!((count.error() - 13.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_total_gives_zero() {
        let count = WeightedCount::default();
        assert_eq!(count.fraction_of(0.0), (0.0, 0.0));
    }
}
