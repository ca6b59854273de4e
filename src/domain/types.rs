//! Shared domain types.
//!
//! These types are intentionally kept small and strongly typed so the rest of
//! the crate never touches raw CSV columns:
//!
//! - raw rows are validated once, at ingest, into `InventoryRecord`
//! - training and inference both go through `FeatureVector`
//! - fitted state is serializable so it can be persisted and reloaded

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One validated row of the inventory dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    pub date: NaiveDate,
    pub category: String,
    pub region: String,
    pub inventory_level: u32,
    pub weather_condition: String,
    pub holiday_or_promotion: bool,
    pub units_sold: u32,
}

/// A new observation to classify. Same shape as `InventoryRecord` without the
/// unknown `units_sold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub category: String,
    pub region: String,
    pub inventory_level: u32,
    pub weather_condition: String,
    pub holiday_or_promotion: bool,
    pub date: NaiveDate,
}

/// Classifier input, derived identically at training and inference time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub category: String,
    pub region: String,
    pub inventory_level: u32,
    pub weather_condition: String,
    pub holiday_or_promotion: bool,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    /// Monday = 0 … Sunday = 6.
    pub day_of_week: u32,
}

/// Three-way demand target.
///
/// The declaration order (Low < Medium < High) is the order used for class
/// indices, probability vectors and confusion matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DemandLabel {
    Low,
    Medium,
    High,
}

impl DemandLabel {
    pub const ALL: [DemandLabel; 3] = [DemandLabel::Low, DemandLabel::Medium, DemandLabel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            DemandLabel::Low => "Low",
            DemandLabel::Medium => "Medium",
            DemandLabel::High => "High",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            DemandLabel::Low => "Low demand",
            DemandLabel::Medium => "Medium demand",
            DemandLabel::High => "High demand",
        }
    }

    pub fn index(self) -> usize {
        match self {
            DemandLabel::Low => 0,
            DemandLabel::Medium => 1,
            DemandLabel::High => 2,
        }
    }
}

impl fmt::Display for DemandLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DemandLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Low" => Ok(DemandLabel::Low),
            "Medium" => Ok(DemandLabel::Medium),
            "High" => Ok(DemandLabel::High),
            other => Err(format!("Unknown demand label '{other}'. Expected Low, Medium or High.")),
        }
    }
}

/// Which classifier family a pipeline wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Knn,
    GaussianNb,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Knn, ModelKind::GaussianNb];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Knn => "K-Nearest Neighbors (KNN)",
            ModelKind::GaussianNb => "Gaussian Naive Bayes",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            ModelKind::Knn => "KNN",
            ModelKind::GaussianNb => "Naive Bayes",
        }
    }

    /// Fixed artifact file name inside the artifact directory.
    pub fn artifact_file_name(self) -> &'static str {
        match self {
            ModelKind::Knn => "knn_model.json",
            ModelKind::GaussianNb => "nb_model.json",
        }
    }
}

/// Held-out rows carved off at training time.
///
/// Persisted next to the pipelines so evaluation never re-runs the split.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSplit {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<DemandLabel>,
}

impl EvaluationSplit {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A training run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, environment variables and defaults.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub dataset_path: PathBuf,
    pub artifact_dir: PathBuf,
    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the stratified split shuffle.
    pub seed: u64,
    /// Number of neighbours consulted by the k-NN classifier.
    pub neighbors: usize,
    /// Portion of the largest feature variance added to every NB variance.
    pub var_smoothing: f64,
}

impl TrainConfig {
    pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
    pub const DEFAULT_SEED: u64 = 42;
    pub const DEFAULT_NEIGHBORS: usize = 5;
    pub const DEFAULT_VAR_SMOOTHING: f64 = 1e-9;

    pub fn new(dataset_path: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            artifact_dir: artifact_dir.into(),
            test_fraction: Self::DEFAULT_TEST_FRACTION,
            seed: Self::DEFAULT_SEED,
            neighbors: Self::DEFAULT_NEIGHBORS,
            var_smoothing: Self::DEFAULT_VAR_SMOOTHING,
        }
    }
}
