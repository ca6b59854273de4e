//! Persisted models and the in-memory registry that serves them.
//!
//! Artifact directory layout (fixed names):
//! - `knn_model.json` / `nb_model.json`: fitted pipelines
//! - `X_test.csv` / `y_test.csv`: the held-out split
//!
//! Training writes every file to a temporary sibling first and renames only
//! once all four writes succeeded. Files being replaced are moved to backup
//! siblings during the renames and restored if any rename fails, so a failed
//! run never leaves a half-updated directory behind.
//!
//! Loading checks the envelope and the pipeline's internal consistency; a
//! file that parses but would break scoring is reported as corrupt.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{EvaluationSplit, ModelKind};
use crate::error::AppError;
use crate::fit::{TrainedModels, TrainedPipeline};
use crate::io::holdout::{read_split, write_features_csv, write_labels_csv};

pub const TOOL_NAME: &str = "demand-dash";
pub const X_TEST_FILE: &str = "X_test.csv";
pub const Y_TEST_FILE: &str = "y_test.csv";

/// Resolved artifact file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn model(&self, kind: ModelKind) -> PathBuf {
        self.dir.join(kind.artifact_file_name())
    }

    pub fn x_test(&self) -> PathBuf {
        self.dir.join(X_TEST_FILE)
    }

    pub fn y_test(&self) -> PathBuf {
        self.dir.join(Y_TEST_FILE)
    }
}

/// On-disk wrapper around a pipeline.
#[derive(Debug, Serialize, Deserialize)]
struct PipelineFile {
    tool: String,
    kind: ModelKind,
    pipeline: TrainedPipeline,
}

/// Persist both pipelines and the held-out split.
pub fn save_training_artifacts(paths: &ArtifactPaths, trained: &TrainedModels) -> Result<(), AppError> {
    fs::create_dir_all(&paths.dir)
        .map_err(|e| AppError::io(format!("Failed to create artifact directory '{}'", paths.dir.display()), e))?;

    let knn_path = paths.model(ModelKind::Knn);
    let nb_path = paths.model(ModelKind::GaussianNb);
    let x_path = paths.x_test();
    let y_path = paths.y_test();

    let staged = [
        (tmp_sibling(&knn_path), knn_path),
        (tmp_sibling(&nb_path), nb_path),
        (tmp_sibling(&x_path), x_path),
        (tmp_sibling(&y_path), y_path),
    ];

    let written = write_pipeline(&staged[0].0, &trained.knn)
        .and_then(|_| write_pipeline(&staged[1].0, &trained.naive_bayes))
        .and_then(|_| write_features_csv(&staged[2].0, &trained.split.features))
        .and_then(|_| write_labels_csv(&staged[3].0, &trained.split.labels));

    if let Err(e) = written {
        for (tmp, _) in &staged {
            let _ = fs::remove_file(tmp);
        }
        return Err(e);
    }

    commit_staged(&staged)?;

    tracing::info!(dir = %paths.dir.display(), "artifacts saved");
    Ok(())
}

/// Rename every `(tmp, dest)` pair into place, all or nothing.
fn commit_staged(staged: &[(PathBuf, PathBuf)]) -> Result<(), AppError> {
    let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut committed: Vec<PathBuf> = Vec::new();

    for (tmp, dest) in staged {
        if let Err(e) = commit_one(tmp, dest, &mut backups) {
            tracing::warn!(path = %dest.display(), error = %e, "rolling back artifact update");
            for path in &committed {
                let _ = fs::remove_file(path);
            }
            for (backup, original) in &backups {
                let _ = fs::rename(backup, original);
            }
            for (tmp, _) in staged {
                let _ = fs::remove_file(tmp);
            }
            return Err(e);
        }
        committed.push(dest.clone());
    }

    for (backup, _) in &backups {
        let _ = fs::remove_file(backup);
    }
    Ok(())
}

fn commit_one(tmp: &Path, dest: &Path, backups: &mut Vec<(PathBuf, PathBuf)>) -> Result<(), AppError> {
    if dest.exists() {
        let backup = sibling(dest, ".bak");
        fs::rename(dest, &backup)
            .map_err(|e| AppError::io(format!("Failed to back up '{}'", dest.display()), e))?;
        backups.push((backup, dest.to_path_buf()));
    }
    fs::rename(tmp, dest).map_err(|e| AppError::io(format!("Failed to move '{}' into place", dest.display()), e))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn write_pipeline(path: &Path, pipeline: &TrainedPipeline) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(format!("Failed to create '{}'", path.display()), e))?;
    let envelope = PipelineFile {
        tool: TOOL_NAME.to_string(),
        kind: pipeline.kind(),
        pipeline: pipeline.clone(),
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &envelope).map_err(|e| {
        AppError::io(
            format!("Failed to write '{}'", path.display()),
            std::io::Error::other(e),
        )
    })?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush '{}'", path.display()), e))
}

/// Read one pipeline file, checking it holds a consistent model of the
/// expected kind.
pub fn load_pipeline(path: &Path, kind: ModelKind) -> Result<TrainedPipeline, AppError> {
    if !path.exists() {
        return Err(AppError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| AppError::io(format!("Failed to open '{}'", path.display()), e))?;
    let envelope: PipelineFile =
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| AppError::corrupt(path, e))?;

    if envelope.tool != TOOL_NAME {
        return Err(AppError::corrupt(
            path,
            format!("written by '{}', expected '{TOOL_NAME}'", envelope.tool),
        ));
    }
    if envelope.kind != kind || envelope.pipeline.kind() != kind {
        return Err(AppError::corrupt(
            path,
            format!(
                "expected a {} model, found {}",
                kind.short_name(),
                envelope.pipeline.kind().short_name()
            ),
        ));
    }
    envelope.pipeline.validate().map_err(|reason| AppError::corrupt(path, reason))?;
    Ok(envelope.pipeline)
}

/// Loaded artifacts keyed by file path.
///
/// Entries are filled on first access and only dropped by [`invalidate`],
/// so retraining while a session is open is invisible until the caller asks
/// for a reload.
///
/// [`invalidate`]: ModelRegistry::invalidate
#[derive(Debug)]
pub struct ModelRegistry {
    paths: ArtifactPaths,
    pipelines: HashMap<PathBuf, Arc<TrainedPipeline>>,
    splits: HashMap<PathBuf, Arc<EvaluationSplit>>,
}

impl ModelRegistry {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            pipelines: HashMap::new(),
            splits: HashMap::new(),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn pipeline(&mut self, kind: ModelKind) -> Result<Arc<TrainedPipeline>, AppError> {
        let path = self.paths.model(kind);
        if let Some(hit) = self.pipelines.get(&path) {
            return Ok(Arc::clone(hit));
        }
        let loaded = Arc::new(load_pipeline(&path, kind)?);
        tracing::debug!(path = %path.display(), "pipeline loaded");
        self.pipelines.insert(path, Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn split(&mut self) -> Result<Arc<EvaluationSplit>, AppError> {
        let key = self.paths.x_test();
        if let Some(hit) = self.splits.get(&key) {
            return Ok(Arc::clone(hit));
        }
        let loaded = Arc::new(read_split(&key, &self.paths.y_test())?);
        tracing::debug!(rows = loaded.len(), "evaluation split loaded");
        self.splits.insert(key, Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn cached_entries(&self) -> usize {
        self.pipelines.len() + self.splits.len()
    }

    pub fn invalidate(&mut self) {
        self.pipelines.clear();
        self.splits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InventoryRecord, TrainConfig};
    use crate::features::derive_features;
    use crate::fit::train_models;
    use chrono::NaiveDate;

    fn trained() -> TrainedModels {
        let records: Vec<InventoryRecord> = (1..=30u32)
            .map(|d| InventoryRecord {
                date: NaiveDate::from_ymd_opt(2024, 5, d).unwrap(),
                category: ["Toys", "Clothing", "Electronics"][(d % 3) as usize].to_string(),
                region: "West".to_string(),
                inventory_level: 100 * (d % 3) + d,
                weather_condition: if d % 2 == 0 { "Rainy" } else { "Sunny" }.to_string(),
                holiday_or_promotion: d % 4 == 0,
                units_sold: [10, 40, 90][(d % 3) as usize],
            })
            .collect();
        train_models(&records, &TrainConfig::new("unused.csv", "unused")).unwrap()
    }

    #[test]
    fn reloaded_pipelines_predict_identically() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let trained = trained();
        save_training_artifacts(&paths, &trained).unwrap();

        for kind in ModelKind::ALL {
            assert!(paths.model(kind).exists());
            assert!(!tmp_sibling(&paths.model(kind)).exists());
        }

        let mut registry = ModelRegistry::new(paths.clone());
        let split = registry.split().unwrap();
        assert_eq!(split.labels, trained.split.labels);

        for kind in ModelKind::ALL {
            let loaded = registry.pipeline(kind).unwrap();
            let original = trained.pipeline(kind);
            for row in &split.features {
                assert_eq!(loaded.predict_proba(row).unwrap(), original.predict_proba(row).unwrap());
            }
        }

        let probe = InventoryRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            category: "Electronics".to_string(),
            region: "North".to_string(),
            inventory_level: 100,
            weather_condition: "Sunny".to_string(),
            holiday_or_promotion: false,
            units_sold: 0,
        };
        let row = derive_features(&probe);
        let knn = registry.pipeline(ModelKind::Knn).unwrap();
        assert_eq!(knn.predict(&row).unwrap(), trained.knn.predict(&row).unwrap());
    }

    #[test]
    fn missing_and_mismatched_artifacts_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let mut registry = ModelRegistry::new(paths.clone());

        let err = registry.pipeline(ModelKind::Knn).unwrap_err();
        assert!(matches!(err, AppError::MissingArtifact { .. }));
        assert!(err.is_recoverable());
        assert!(matches!(registry.split(), Err(AppError::MissingArtifact { .. })));

        save_training_artifacts(&paths, &trained()).unwrap();
        fs::copy(paths.model(ModelKind::Knn), paths.model(ModelKind::GaussianNb)).unwrap();
        assert!(matches!(
            load_pipeline(&paths.model(ModelKind::GaussianNb), ModelKind::GaussianNb),
            Err(AppError::CorruptArtifact { .. })
        ));

        fs::write(paths.model(ModelKind::Knn), "{ not json").unwrap();
        assert!(matches!(
            load_pipeline(&paths.model(ModelKind::Knn), ModelKind::Knn),
            Err(AppError::CorruptArtifact { .. })
        ));
    }

    fn edit_json(path: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
        let mut value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        edit(&mut value);
        fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
    }

    #[test]
    fn well_formed_but_inconsistent_pipelines_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        save_training_artifacts(&paths, &trained()).unwrap();

        let knn_path = paths.model(ModelKind::Knn);
        edit_json(&knn_path, |v| {
            for label in v["pipeline"]["classifier"]["knn"]["train_y"].as_array_mut().unwrap() {
                *label = serde_json::json!(9);
            }
        });
        let mut registry = ModelRegistry::new(paths.clone());
        let err = registry.pipeline(ModelKind::Knn).unwrap_err();
        assert!(matches!(err, AppError::CorruptArtifact { .. }), "{err}");
        assert!(err.is_recoverable());
        assert_eq!(registry.cached_entries(), 0);

        let nb_path = paths.model(ModelKind::GaussianNb);
        edit_json(&nb_path, |v| {
            v["pipeline"]["classifier"]["gaussian_nb"]["class_prior"]
                .as_array_mut()
                .unwrap()
                .pop();
        });
        assert!(matches!(
            load_pipeline(&nb_path, ModelKind::GaussianNb),
            Err(AppError::CorruptArtifact { .. })
        ));

        save_training_artifacts(&paths, &trained()).unwrap();
        edit_json(&nb_path, |v| {
            v["pipeline"]["encoder"]["categories"].as_array_mut().unwrap().reverse();
        });
        assert!(matches!(
            load_pipeline(&nb_path, ModelKind::GaussianNb),
            Err(AppError::CorruptArtifact { .. })
        ));

        edit_json(&knn_path, |v| v["tool"] = serde_json::json!("something-else"));
        assert!(matches!(load_pipeline(&knn_path, ModelKind::Knn), Err(AppError::CorruptArtifact { .. })));
    }

    #[test]
    fn failed_rename_restores_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("a.json");
        let other = dir.path().join("b.json");
        fs::write(&old, "old a").unwrap();
        fs::write(&other, "old b").unwrap();

        let staged_a = tmp_sibling(&old);
        fs::write(&staged_a, "new a").unwrap();
        // The second staged file was never written, so its rename fails.
        let staged = [(staged_a.clone(), old.clone()), (tmp_sibling(&other), other.clone())];

        assert!(commit_staged(&staged).is_err());
        assert_eq!(fs::read_to_string(&old).unwrap(), "old a");
        assert_eq!(fs::read_to_string(&other).unwrap(), "old b");
        assert!(!staged_a.exists());
        assert!(!sibling(&old, ".bak").exists());
        assert!(!sibling(&other, ".bak").exists());
    }

    #[test]
    fn cache_serves_stale_entries_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        save_training_artifacts(&paths, &trained()).unwrap();

        let mut registry = ModelRegistry::new(paths.clone());
        let first = registry.pipeline(ModelKind::Knn).unwrap();
        registry.split().unwrap();
        assert_eq!(registry.cached_entries(), 2);

        fs::remove_file(paths.model(ModelKind::Knn)).unwrap();
        let cached = registry.pipeline(ModelKind::Knn).unwrap();
        assert!(Arc::ptr_eq(&first, &cached));

        registry.invalidate();
        assert_eq!(registry.cached_entries(), 0);
        assert!(matches!(registry.pipeline(ModelKind::Knn), Err(AppError::MissingArtifact { .. })));
    }
}
