//! Trigrate math utilities.

pub mod math;

pub use math::bisect::*;
pub use math::histogram::*;
pub use math::linear::*;
pub use math::weighted::*;
