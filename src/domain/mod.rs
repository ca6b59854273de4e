//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - validated input rows (`InventoryRecord`, `PredictionRequest`)
//! - the classifier input (`FeatureVector`) and target (`DemandLabel`)
//! - model identities and run configuration (`ModelKind`, `TrainConfig`)

pub mod types;

pub use types::*;
