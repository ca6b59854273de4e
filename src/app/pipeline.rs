//! Shared training job used by both the CLI and the TUI.
//!
//! ingest -> derive/label -> split -> fit both models -> persist -> score
//!
//! The front-ends only decide how to present the returned summary.

use crate::domain::{DemandLabel, ModelKind, TrainConfig};
use crate::error::AppError;
use crate::fit::train_models;
use crate::io::{load_inventory, save_training_artifacts, ArtifactPaths, RowError};
use crate::report::{evaluate, EvaluationReport};

/// What a finished training run reports back.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub rows_read: usize,
    pub rows_used: usize,
    pub row_errors: Vec<RowError>,
    pub class_counts: Vec<(DemandLabel, usize)>,
    pub n_train: usize,
    pub n_test: usize,
    /// Held-out score per model, in `ModelKind::ALL` order.
    pub evaluations: Vec<(ModelKind, EvaluationReport)>,
    pub artifacts: ArtifactPaths,
}

/// Train both models from `config.dataset_path` and persist them.
///
/// Nothing is written when the dataset is missing or unusable.
pub fn run_training(config: &TrainConfig) -> Result<TrainingSummary, AppError> {
    tracing::info!(dataset = %config.dataset_path.display(), "loading dataset");
    let dataset = load_inventory(&config.dataset_path)?;
    if !dataset.row_errors.is_empty() {
        tracing::warn!(
            skipped = dataset.row_errors.len(),
            first_line = dataset.row_errors[0].line,
            "rows skipped during ingest"
        );
    }

    let trained = train_models(&dataset.records, config)?;
    tracing::info!(train = trained.n_train, test = trained.split.len(), "split ready");

    let artifacts = ArtifactPaths::new(&config.artifact_dir);
    save_training_artifacts(&artifacts, &trained)?;

    let mut evaluations = Vec::with_capacity(ModelKind::ALL.len());
    for kind in ModelKind::ALL {
        let report = evaluate(trained.pipeline(kind), &trained.split)?;
        tracing::info!(model = kind.short_name(), accuracy = report.accuracy, "held-out accuracy");
        evaluations.push((kind, report));
    }

    Ok(TrainingSummary {
        rows_read: dataset.rows_read,
        rows_used: dataset.records.len(),
        row_errors: dataset.row_errors,
        class_counts: trained.class_counts,
        n_train: trained.n_train,
        n_test: trained.split.len(),
        evaluations,
        artifacts,
    })
}
