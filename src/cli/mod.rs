//! Command-line parsing for the demand dashboard.
//!
//! Parsing and dispatch stay here; nothing in this module touches models.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{PredictionRequest, TrainConfig};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "demand", version, about = "Retail demand-level dashboard (k-NN + Gaussian Naive Bayes)")]
pub struct Cli {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands. With no subcommand the terminal dashboard starts.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train both classifiers on the dataset and persist them.
    Train(TrainArgs),
    /// Print exploratory summaries of the dataset.
    Explore(ExploreArgs),
    /// Print accuracy, classification reports and confusion matrices.
    Report,
    /// Classify one observation with both persisted models.
    Predict(PredictArgs),
    /// Write a synthetic inventory CSV.
    Sample(SampleArgs),
    /// Launch the interactive terminal dashboard.
    Tui,
}

/// Where the dataset and the artifacts live.
#[derive(Debug, Args, Clone)]
pub struct PathArgs {
    /// Inventory CSV.
    #[arg(long, global = true, env = "DEMAND_DATASET", default_value = "inventory_data.csv")]
    pub dataset: PathBuf,

    /// Directory holding the persisted models and held-out split.
    #[arg(long, global = true, env = "DEMAND_ARTIFACTS", default_value = "artifacts")]
    pub artifacts: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Fraction of rows held out for evaluation.
    #[arg(long, default_value_t = TrainConfig::DEFAULT_TEST_FRACTION)]
    pub test_fraction: f64,

    /// Seed for the stratified split.
    #[arg(long, default_value_t = TrainConfig::DEFAULT_SEED)]
    pub seed: u64,

    /// Neighbours consulted by k-NN.
    #[arg(short = 'k', long, default_value_t = TrainConfig::DEFAULT_NEIGHBORS)]
    pub neighbors: usize,

    /// Gaussian NB variance smoothing.
    #[arg(long, default_value_t = TrainConfig::DEFAULT_VAR_SMOOTHING)]
    pub var_smoothing: f64,
}

#[derive(Debug, Args, Clone)]
pub struct ExploreArgs {
    /// Chart width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Daily-sales sparkline height (rows).
    #[arg(long, default_value_t = 8)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub region: String,

    #[arg(long, default_value_t = 100)]
    pub inventory: u32,

    #[arg(long)]
    pub weather: String,

    /// 1 when the day is a holiday or runs a promotion.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub holiday: u8,

    /// Observation date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl PredictArgs {
    pub fn to_request(&self, today: NaiveDate) -> PredictionRequest {
        PredictionRequest {
            category: self.category.clone(),
            region: self.region.clone(),
            inventory_level: self.inventory,
            weather_condition: self.weather.clone(),
            holiday_or_promotion: self.holiday == 1,
            date: self.date.unwrap_or(today),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV (defaults to the dataset path).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Number of consecutive days.
    #[arg(long, default_value_t = 365)]
    pub days: u32,

    /// Rows generated per day.
    #[arg(long, default_value_t = 10)]
    pub rows_per_day: u32,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First date in the sample.
    #[arg(long, default_value = "2022-01-01")]
    pub start: NaiveDate,
}

pub fn train_config(paths: &PathArgs, args: &TrainArgs) -> TrainConfig {
    TrainConfig {
        test_fraction: args.test_fraction,
        seed: args.seed,
        neighbors: args.neighbors,
        var_smoothing: args.var_smoothing,
        ..TrainConfig::new(&paths.dataset, &paths.artifacts)
    }
}
