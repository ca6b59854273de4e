//! Mathematical utilities: summary statistics and feature-space distances.

pub mod distance;
pub mod stats;

pub use distance::*;
pub use stats::*;
