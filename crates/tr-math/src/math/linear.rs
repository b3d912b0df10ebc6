//! Closed-form least-squares line fit.

/// Slope and intercept of a fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    /// X value at which the line reaches `y`. None if the slope is zero.
    pub fn solve_for_x(&self, y: f64) -> Option<f64> {
        if self.slope == 0.0 {
            return None;
        }
        Some((y - self.intercept) / self.slope)
    }
}

/// Least-squares fit of a straight line through the given points.
///
/// Returns None for fewer than two points or when all x values coincide.
pub fn linear_fit(points: &[(f64, f64)]) -> Option<Line> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mut xy_bar = 0.0;
    let mut x_bar = 0.0;
    let mut y_bar = 0.0;
    let mut x_sq_bar = 0.0;

    for &(x, y) in points {
        xy_bar += x * y;
        x_bar += x;
        y_bar += y;
        x_sq_bar += x * x;
    }
    xy_bar /= n;
    x_bar /= n;
    y_bar /= n;
    x_sq_bar /= n;

    let denominator = x_sq_bar - x_bar * x_bar;
    if denominator == 0.0 {
        return None;
    }

    let slope = (xy_bar - x_bar * y_bar) / denominator;
    let intercept = y_bar - slope * x_bar;

    Some(Line { slope, intercept })
}
