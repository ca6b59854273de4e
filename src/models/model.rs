//! The classifier seam.
//!
//! A fitted classifier exposes:
//! - its class list (the order of every probability vector it returns)
//! - per-row class probabilities for an encoded feature vector
//!
//! The predicted label is always the argmax of the probabilities, so the two
//! can never disagree.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::{DemandLabel, ModelKind};
use crate::error::AppError;
use crate::math::argmax;
use crate::models::{GaussianNb, KnnClassifier};

pub trait Classifier {
    /// Classes in probability-vector order (ascending `DemandLabel`).
    fn classes(&self) -> &[DemandLabel];

    /// Encoded width the classifier was fitted on.
    fn n_features(&self) -> usize;

    /// Class probabilities for one encoded row. Sums to 1.
    fn predict_proba(&self, x: &DVector<f64>) -> Result<Vec<f64>, AppError>;

    fn predict(&self, x: &DVector<f64>) -> Result<DemandLabel, AppError> {
        let proba = self.predict_proba(x)?;
        argmax(&proba)
            .map(|i| self.classes()[i])
            .ok_or_else(|| AppError::Prediction("Classifier returned no class scores.".to_string()))
    }
}

/// A fitted classifier of either family, in serializable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FittedClassifier {
    Knn(KnnClassifier),
    GaussianNb(GaussianNb),
}

impl FittedClassifier {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedClassifier::Knn(_) => ModelKind::Knn,
            FittedClassifier::GaussianNb(_) => ModelKind::GaussianNb,
        }
    }

    /// Check the internal consistency of a deserialized classifier.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            FittedClassifier::Knn(m) => m.validate(),
            FittedClassifier::GaussianNb(m) => m.validate(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            FittedClassifier::Knn(m) => m,
            FittedClassifier::GaussianNb(m) => m,
        }
    }
}

impl Classifier for FittedClassifier {
    fn classes(&self) -> &[DemandLabel] {
        self.inner().classes()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict_proba(&self, x: &DVector<f64>) -> Result<Vec<f64>, AppError> {
        self.inner().predict_proba(x)
    }
}

/// Validate a training matrix/label pair and return the sorted class list
/// plus each row's class index.
pub(crate) fn index_labels(
    x: &DMatrix<f64>,
    y: &[DemandLabel],
) -> Result<(Vec<DemandLabel>, Vec<usize>), AppError> {
    if x.nrows() != y.len() {
        return Err(AppError::Training(format!(
            "Feature rows ({}) and labels ({}) differ in length.",
            x.nrows(),
            y.len()
        )));
    }
    if y.is_empty() {
        return Err(AppError::Training("Cannot fit a classifier on zero rows.".to_string()));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Training("Training matrix contains non-finite values.".to_string()));
    }

    let mut classes: Vec<DemandLabel> = y.to_vec();
    classes.sort();
    classes.dedup();

    let indices = y
        .iter()
        .map(|label| classes.binary_search(label).unwrap_or_default())
        .collect();

    Ok((classes, indices))
}

/// Classes must be non-empty, strictly ascending and therefore unique.
pub(crate) fn check_classes(classes: &[DemandLabel]) -> Result<(), String> {
    if classes.is_empty() {
        return Err("classifier has no classes".to_string());
    }
    if classes.windows(2).any(|w| w[0] >= w[1]) {
        return Err(format!("classes {classes:?} are not sorted and unique"));
    }
    Ok(())
}

/// Reject query rows the classifier cannot score.
pub(crate) fn check_query(x: &DVector<f64>, n_features: usize) -> Result<(), AppError> {
    if x.len() != n_features {
        return Err(AppError::Prediction(format!(
            "Expected {n_features} encoded features, got {}.",
            x.len()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Prediction("Input contains non-finite values.".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_labels_sorts_semantically() {
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let y = [DemandLabel::High, DemandLabel::Low, DemandLabel::High];
        let (classes, idx) = index_labels(&x, &y).unwrap();
        assert_eq!(classes, vec![DemandLabel::Low, DemandLabel::High]);
        assert_eq!(idx, vec![1, 0, 1]);
    }

    #[test]
    fn class_lists_must_be_sorted_and_unique() {
        assert!(check_classes(&[DemandLabel::Low, DemandLabel::High]).is_ok());
        assert!(check_classes(&[]).is_err());
        assert!(check_classes(&[DemandLabel::High, DemandLabel::Low]).is_err());
        assert!(check_classes(&[DemandLabel::Low, DemandLabel::Low]).is_err());
    }

    #[test]
    fn index_labels_rejects_length_mismatch() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        assert!(index_labels(&x, &[DemandLabel::Low]).is_err());
    }
}
