//! Encoder + classifier as one fit/predict unit.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{DemandLabel, FeatureVector, ModelKind, TrainConfig};
use crate::error::AppError;
use crate::features::FeatureEncoder;
use crate::math::argmax;
use crate::models::{Classifier, FittedClassifier, GaussianNb, KnnClassifier};

/// A fitted pipeline. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedPipeline {
    encoder: FeatureEncoder,
    classifier: FittedClassifier,
}

impl TrainedPipeline {
    /// Fit a classifier of `kind` on rows already encoded by `encoder`.
    pub fn fit(
        kind: ModelKind,
        encoder: FeatureEncoder,
        x_train: &DMatrix<f64>,
        y_train: &[DemandLabel],
        config: &TrainConfig,
    ) -> Result<Self, AppError> {
        if x_train.ncols() != encoder.width() {
            return Err(AppError::Training(format!(
                "Encoded training width {} does not match encoder width {}.",
                x_train.ncols(),
                encoder.width()
            )));
        }

        let classifier = match kind {
            ModelKind::Knn => FittedClassifier::Knn(KnnClassifier::fit(x_train, y_train, config.neighbors)?),
            ModelKind::GaussianNb => {
                FittedClassifier::GaussianNb(GaussianNb::fit(x_train, y_train, config.var_smoothing)?)
            }
        };

        Ok(Self { encoder, classifier })
    }

    pub fn kind(&self) -> ModelKind {
        self.classifier.kind()
    }

    /// Consistency checks for a pipeline read back from disk. A pipeline that
    /// passes can be scored without panicking.
    pub fn validate(&self) -> Result<(), String> {
        self.encoder.validate()?;
        self.classifier.validate()?;
        if self.encoder.width() != self.classifier.n_features() {
            return Err(format!(
                "encoder width {} does not match classifier width {}",
                self.encoder.width(),
                self.classifier.n_features()
            ));
        }
        Ok(())
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Classes in probability-vector order.
    pub fn classes(&self) -> &[DemandLabel] {
        self.classifier.classes()
    }

    pub fn predict_proba(&self, row: &FeatureVector) -> Result<Vec<f64>, AppError> {
        let x = DVector::from_vec(self.encoder.transform(row));
        if x.len() != self.classifier.n_features() {
            return Err(AppError::Prediction(format!(
                "Encoder produced {} features but the classifier expects {}.",
                x.len(),
                self.classifier.n_features()
            )));
        }
        self.classifier.predict_proba(&x)
    }

    /// Predicted label and the probabilities it was taken from.
    pub fn predict_with_proba(&self, row: &FeatureVector) -> Result<(DemandLabel, Vec<f64>), AppError> {
        let proba = self.predict_proba(row)?;
        let idx = argmax(&proba)
            .ok_or_else(|| AppError::Prediction("Classifier returned no class scores.".to_string()))?;
        Ok((self.classes()[idx], proba))
    }

    pub fn predict(&self, row: &FeatureVector) -> Result<DemandLabel, AppError> {
        self.predict_with_proba(row).map(|(label, _)| label)
    }

    /// Predict many rows (in parallel); output order matches input order.
    pub fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<DemandLabel>, AppError> {
        rows.par_iter().map(|row| self.predict(row)).collect()
    }
}
