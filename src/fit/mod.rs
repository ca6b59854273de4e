//! Training orchestration.
//!
//! Responsibilities:
//!
//! - seeded stratified train/test split
//! - encoder + classifier assembly into a `TrainedPipeline`
//! - fitting both classifier families on one shared encoder and split

pub mod pipeline;
pub mod split;
pub mod training;

pub use pipeline::*;
pub use split::*;
pub use training::*;
