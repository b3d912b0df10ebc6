//! Rate curves and menu-rate aggregation.

pub mod aggregate;
pub mod curve;

pub use aggregate::menu_rate;
pub use curve::{CurveRecord, RateCurve, RateCurveSet};
