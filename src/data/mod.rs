//! Dataset helpers that are not part of the fit path.
//!
//! - deterministic synthetic inventory generation (`sample`)
//! - exploratory summaries of the raw dataset (`summary`)

pub mod sample;
pub mod summary;

pub use sample::*;
pub use summary::*;
