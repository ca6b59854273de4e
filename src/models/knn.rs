//! k-nearest-neighbours classifier (brute force, Euclidean, uniform vote).
//!
//! The fitted state is the encoded training matrix itself. For one query row:
//! - compute squared distances to every training row
//! - keep the `k` closest (distance ties resolved by training-row order)
//! - probabilities are the vote shares of each class among those `k`

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::DemandLabel;
use crate::error::AppError;
use crate::math::squared_euclidean_to_row;
use crate::models::model::{check_classes, check_query, index_labels, Classifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    classes: Vec<DemandLabel>,
    train_x: DMatrix<f64>,
    /// Class index (into `classes`) of each training row.
    train_y: Vec<usize>,
}

impl KnnClassifier {
    pub fn fit(x: &DMatrix<f64>, y: &[DemandLabel], k: usize) -> Result<Self, AppError> {
        if k == 0 {
            return Err(AppError::InvalidInput("k-NN needs at least one neighbour.".to_string()));
        }
        let (classes, train_y) = index_labels(x, y)?;
        if x.nrows() < k {
            return Err(AppError::Training(format!(
                "k-NN with k={k} needs at least {k} training rows, got {}.",
                x.nrows()
            )));
        }

        Ok(Self {
            k,
            classes,
            train_x: x.clone(),
            train_y,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Shape and index checks for a deserialized model; scoring indexes
    /// `classes` by `train_y` without bounds checks.
    pub fn validate(&self) -> Result<(), String> {
        check_classes(&self.classes)?;
        let rows = self.train_x.nrows();
        if self.train_y.len() != rows {
            return Err(format!("{} labels for {rows} training rows", self.train_y.len()));
        }
        if self.k == 0 || self.k > rows {
            return Err(format!("k={} is outside 1..={rows}", self.k));
        }
        if let Some(bad) = self.train_y.iter().find(|&&c| c >= self.classes.len()) {
            return Err(format!(
                "training label index {bad} is out of range for {} classes",
                self.classes.len()
            ));
        }
        if self.train_x.iter().any(|v| !v.is_finite()) {
            return Err("training matrix contains non-finite values".to_string());
        }
        Ok(())
    }

    /// Indices of the `k` nearest training rows, closest first.
    pub fn neighbors(&self, x: &DVector<f64>) -> Result<Vec<usize>, AppError> {
        check_query(x, self.n_features())?;

        let mut dist: Vec<(f64, usize)> = (0..self.train_x.nrows())
            .map(|i| (squared_euclidean_to_row(&self.train_x, i, x), i))
            .collect();
        dist.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        Ok(dist.into_iter().take(self.k).map(|(_, i)| i).collect())
    }
}

impl Classifier for KnnClassifier {
    fn classes(&self) -> &[DemandLabel] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.train_x.ncols()
    }

    fn predict_proba(&self, x: &DVector<f64>) -> Result<Vec<f64>, AppError> {
        let neighbors = self.neighbors(x)?;
        let mut votes = vec![0usize; self.classes.len()];
        for i in &neighbors {
            votes[self.train_y[*i]] += 1;
        }
        let n = neighbors.len() as f64;
        Ok(votes.into_iter().map(|v| v as f64 / n).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (DMatrix<f64>, Vec<DemandLabel>) {
        // Two clusters on a line: low around 0, high around 10.
        let x = DMatrix::from_row_slice(6, 1, &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        let y = vec![
            DemandLabel::Low,
            DemandLabel::Low,
            DemandLabel::Low,
            DemandLabel::High,
            DemandLabel::High,
            DemandLabel::High,
        ];
        (x, y)
    }

    #[test]
    fn majority_vote_and_vote_share() {
        let (x, y) = toy();
        let knn = KnnClassifier::fit(&x, &y, 3).unwrap();
        assert_eq!(knn.classes(), [DemandLabel::Low, DemandLabel::High]);

        let q = DVector::from_row_slice(&[1.5]);
        assert_eq!(knn.predict(&q).unwrap(), DemandLabel::Low);
        assert_eq!(knn.predict_proba(&q).unwrap(), vec![1.0, 0.0]);

        // Neighbours of 6.0: 2.0 (d=4), 10.0 (d=4), 1.0 (d=5).
        let q = DVector::from_row_slice(&[6.0]);
        assert_eq!(knn.neighbors(&q).unwrap(), vec![2, 3, 1]);
        let p = knn.predict_proba(&q).unwrap();
        assert!((p[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn validate_catches_out_of_range_labels_and_k() {
        let (x, y) = toy();
        let knn = KnnClassifier::fit(&x, &y, 3).unwrap();
        assert!(knn.validate().is_ok());

        let mut bad = knn.clone();
        bad.train_y[0] = 9;
        assert!(bad.validate().unwrap_err().contains("out of range"));

        let mut bad = knn.clone();
        bad.k = 7;
        assert!(bad.validate().is_err());

        let mut bad = knn;
        bad.train_y.pop();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn rejects_too_few_rows_and_bad_queries() {
        let (x, y) = toy();
        assert!(KnnClassifier::fit(&x, &y, 7).is_err());

        let knn = KnnClassifier::fit(&x, &y, 5).unwrap();
        let wrong_width = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(matches!(knn.predict(&wrong_width), Err(AppError::Prediction(_))));
    }
}
