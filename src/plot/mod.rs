//! Terminal charts for the CLI reports.

pub mod ascii;

pub use ascii::*;
