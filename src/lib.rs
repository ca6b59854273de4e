//! `demand-dash` library crate.
//!
//! The binary (`demand`) is a thin wrapper around this library so that:
//!
//! - training, evaluation and inference are testable without a terminal
//! - the CLI and the dashboard share the same page handlers

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod fit;
pub mod inference;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
