//! Input/output helpers.
//!
//! - inventory CSV ingest + validation (`ingest`)
//! - held-out split CSV read/write (`holdout`)
//! - pipeline persistence and the cached model registry (`registry`)

pub mod holdout;
pub mod ingest;
pub mod registry;

pub use holdout::*;
pub use ingest::*;
pub use registry::*;
