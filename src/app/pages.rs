//! Request/response handlers for the three dashboard pages.
//!
//! A `Session` owns the only mutable state: a dataset cache and the model
//! registry. Handlers take the session and return plain data; rendering is
//! left to the CLI formatter or the TUI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::{distinct_in_order, summarize, DatasetSummary};
use crate::domain::{InventoryRecord, ModelKind, PredictionRequest};
use crate::error::AppError;
use crate::inference::{predict, ModelPrediction};
use crate::io::{load_inventory, ArtifactPaths, LoadedDataset, ModelRegistry};
use crate::report::{evaluate, EvaluationReport};

/// Rows shown in the dataset preview.
pub const PREVIEW_ROWS: usize = 5;

pub struct Session {
    dataset_path: PathBuf,
    dataset: Option<Arc<LoadedDataset>>,
    registry: ModelRegistry,
}

impl Session {
    pub fn new(dataset_path: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            dataset: None,
            registry: ModelRegistry::new(ArtifactPaths::new(artifact_dir)),
        }
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn artifacts(&self) -> &ArtifactPaths {
        self.registry.paths()
    }

    pub fn registry(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    /// The dataset, loaded on first use and then served from memory.
    pub fn dataset(&mut self) -> Result<Arc<LoadedDataset>, AppError> {
        if let Some(hit) = &self.dataset {
            return Ok(Arc::clone(hit));
        }
        let loaded = Arc::new(load_inventory(&self.dataset_path)?);
        tracing::debug!(rows = loaded.records.len(), "dataset cached");
        self.dataset = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drop every cached object so the next request re-reads from disk.
    pub fn reload(&mut self) {
        self.dataset = None;
        self.registry.invalidate();
        tracing::info!("session caches cleared");
    }
}

#[derive(Debug, Clone)]
pub struct ExplorePage {
    pub preview: Vec<InventoryRecord>,
    pub skipped_rows: usize,
    pub summary: DatasetSummary,
}

pub fn explore_page(session: &mut Session) -> Result<ExplorePage, AppError> {
    let dataset = session.dataset()?;
    let summary = summarize(&dataset.records)
        .ok_or_else(|| AppError::InvalidInput("The dataset has no rows to summarize.".to_string()))?;
    Ok(ExplorePage {
        preview: dataset.records.iter().take(PREVIEW_ROWS).cloned().collect(),
        skipped_rows: dataset.row_errors.len(),
        summary,
    })
}

#[derive(Debug, Clone)]
pub struct PerformancePage {
    pub test_rows: usize,
    pub reports: Vec<(ModelKind, EvaluationReport)>,
}

/// Score both persisted models on the persisted held-out split.
pub fn performance_page(session: &mut Session) -> Result<PerformancePage, AppError> {
    let registry = session.registry();
    let split = registry.split()?;
    let mut reports = Vec::with_capacity(ModelKind::ALL.len());
    for kind in ModelKind::ALL {
        let pipeline = registry.pipeline(kind)?;
        reports.push((kind, evaluate(&pipeline, &split)?));
    }
    Ok(PerformancePage {
        test_rows: split.len(),
        reports,
    })
}

/// Choices offered by the prediction form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    pub categories: Vec<String>,
    pub regions: Vec<String>,
    pub weather_conditions: Vec<String>,
}

pub fn form_options(session: &mut Session) -> Result<FormOptions, AppError> {
    let dataset = session.dataset()?;
    let records = &dataset.records;
    Ok(FormOptions {
        categories: distinct_in_order(records, |r| &r.category),
        regions: distinct_in_order(records, |r| &r.region),
        weather_conditions: distinct_in_order(records, |r| &r.weather_condition),
    })
}

/// One model's slot on the prediction page.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    Predicted(ModelPrediction),
    Failed { kind: ModelKind, message: String },
}

impl ModelOutcome {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelOutcome::Predicted(p) => p.kind,
            ModelOutcome::Failed { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionPage {
    pub request: PredictionRequest,
    pub outcomes: Vec<ModelOutcome>,
}

/// Run `request` through both models. Never fails: each model slot carries
/// either its prediction or the error message to show in its place.
pub fn predict_page(session: &mut Session, request: &PredictionRequest) -> PredictionPage {
    let outcomes = ModelKind::ALL
        .into_iter()
        .map(|kind| {
            let result = session
                .registry()
                .pipeline(kind)
                .and_then(|pipeline| predict(&pipeline, request));
            match result {
                Ok(prediction) => ModelOutcome::Predicted(prediction),
                Err(e) => {
                    tracing::warn!(model = kind.short_name(), error = %e, "prediction unavailable");
                    ModelOutcome::Failed {
                        kind,
                        message: e.to_string(),
                    }
                }
            }
        })
        .collect();

    PredictionPage {
        request: request.clone(),
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_training;
    use crate::data::{generate_sample, write_inventory_csv, SampleConfig};
    use crate::domain::TrainConfig;
    use chrono::NaiveDate;

    fn request() -> PredictionRequest {
        PredictionRequest {
            category: "Electronics".to_string(),
            region: "North".to_string(),
            inventory_level: 100,
            weather_condition: "Sunny".to_string(),
            holiday_or_promotion: false,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("inventory.csv");
        let config = SampleConfig {
            days: 30,
            rows_per_day: 6,
            ..SampleConfig::default()
        };
        write_inventory_csv(&path, &generate_sample(&config).unwrap()).unwrap();
        path
    }

    #[test]
    fn pages_degrade_before_training_and_work_after() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_sample(dir.path());
        let artifacts = dir.path().join("artifacts");
        let mut session = Session::new(&dataset, &artifacts);

        let explore = explore_page(&mut session).unwrap();
        assert_eq!(explore.preview.len(), PREVIEW_ROWS);
        assert_eq!(explore.summary.rows, 180);

        let err = performance_page(&mut session).unwrap_err();
        assert!(matches!(err, AppError::MissingArtifact { .. }));

        let page = predict_page(&mut session, &request());
        assert!(page.outcomes.iter().all(|o| matches!(o, ModelOutcome::Failed { .. })));

        run_training(&TrainConfig::new(&dataset, &artifacts)).unwrap();
        // Failed loads are never cached, so no reload is needed here.
        let performance = performance_page(&mut session).unwrap();
        assert_eq!(performance.test_rows, 36);
        assert_eq!(performance.reports.len(), 2);

        let page = predict_page(&mut session, &request());
        assert_eq!(page.outcomes[0].kind(), ModelKind::Knn);
        assert!(page.outcomes.iter().all(|o| matches!(o, ModelOutcome::Predicted(_))));
    }

    #[test]
    fn reload_picks_up_a_new_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_sample(dir.path());
        let mut session = Session::new(&dataset, dir.path().join("artifacts"));

        let before = form_options(&mut session).unwrap();
        assert!(!before.categories.is_empty());

        std::fs::write(
            &dataset,
            "Date,Category,Region,Inventory Level,Weather Condition,Holiday/Promotion,Units Sold\n\
             2024-01-01,Garden,Central,10,Foggy,0,5\n",
        )
        .unwrap();
        assert_eq!(form_options(&mut session).unwrap(), before);

        session.reload();
        let after = form_options(&mut session).unwrap();
        assert_eq!(after.categories, vec!["Garden"]);
        assert_eq!(after.weather_conditions, vec!["Foggy"]);
    }

    #[test]
    fn missing_dataset_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path().join("missing.csv"), dir.path());
        assert!(matches!(explore_page(&mut session), Err(AppError::MissingData { .. })));
    }
}
