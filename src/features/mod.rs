//! Feature engineering shared by training and inference.
//!
//! - date decomposition and pass-through fields (`derive`)
//! - the units-sold → demand-level rule (`label`)
//! - numeric pass-through + one-hot encoding (`encoder`)

pub mod derive;
pub mod encoder;
pub mod label;

pub use derive::*;
pub use encoder::*;
pub use label::*;
