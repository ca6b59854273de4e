//! Gaussian Naive Bayes.
//!
//! Fit (maximum likelihood, per class `c` and feature `j`):
//!
//! ```text
//! prior_c   = n_c / n
//! theta_cj  = mean of feature j over rows of class c
//! var_cj    = population variance of feature j over rows of class c + epsilon
//! epsilon   = var_smoothing * max_j var(feature j over all rows)
//! ```
//!
//! Scoring uses the joint log-likelihood
//! `ln prior_c - ½ Σ_j [ln(2π var_cj) + (x_j - theta_cj)² / var_cj]`
//! normalized with log-sum-exp.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::DemandLabel;
use crate::error::AppError;
use crate::math::{log_sum_exp, mean, population_variance};
use crate::models::model::{check_classes, check_query, index_labels, Classifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNb {
    classes: Vec<DemandLabel>,
    class_prior: Vec<f64>,
    /// `n_classes × n_features` means.
    theta: DMatrix<f64>,
    /// `n_classes × n_features` smoothed variances.
    var: DMatrix<f64>,
    epsilon: f64,
}

impl GaussianNb {
    pub fn fit(x: &DMatrix<f64>, y: &[DemandLabel], var_smoothing: f64) -> Result<Self, AppError> {
        if !(var_smoothing.is_finite() && var_smoothing >= 0.0) {
            return Err(AppError::InvalidInput("var_smoothing must be finite and >= 0.".to_string()));
        }
        let (classes, y_idx) = index_labels(x, y)?;
        let n_features = x.ncols();

        let max_var = (0..n_features)
            .filter_map(|j| {
                let col: Vec<f64> = x.column(j).iter().copied().collect();
                population_variance(&col)
            })
            .fold(0.0, f64::max);
        // A dataset of constant columns has zero spread; keep variances positive.
        let epsilon = (var_smoothing * max_var).max(f64::MIN_POSITIVE);

        let mut theta = DMatrix::zeros(classes.len(), n_features);
        let mut var = DMatrix::zeros(classes.len(), n_features);
        let mut class_prior = Vec::with_capacity(classes.len());

        for c in 0..classes.len() {
            let rows: Vec<usize> = y_idx
                .iter()
                .enumerate()
                .filter(|(_, yi)| **yi == c)
                .map(|(i, _)| i)
                .collect();
            class_prior.push(rows.len() as f64 / y.len() as f64);

            let sub = x.select_rows(rows.iter());
            for j in 0..n_features {
                let col: Vec<f64> = sub.column(j).iter().copied().collect();
                theta[(c, j)] = mean(&col).unwrap_or(0.0);
                var[(c, j)] = population_variance(&col).unwrap_or(0.0) + epsilon;
            }
        }

        Ok(Self {
            classes,
            class_prior,
            theta,
            var,
            epsilon,
        })
    }

    pub fn class_prior(&self) -> &[f64] {
        &self.class_prior
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Shape checks for a deserialized model; scoring indexes priors, means
    /// and variances by class without bounds checks.
    pub fn validate(&self) -> Result<(), String> {
        check_classes(&self.classes)?;
        let n_classes = self.classes.len();
        if self.class_prior.len() != n_classes {
            return Err(format!("{} priors for {n_classes} classes", self.class_prior.len()));
        }
        if self.class_prior.iter().any(|p| !(p.is_finite() && *p > 0.0)) {
            return Err("class priors must be positive".to_string());
        }
        if self.theta.nrows() != n_classes || self.var.shape() != self.theta.shape() {
            return Err(format!(
                "means are {:?} and variances {:?}, expected {n_classes} rows each",
                self.theta.shape(),
                self.var.shape()
            ));
        }
        if self.theta.iter().any(|v| !v.is_finite()) {
            return Err("class means contain non-finite values".to_string());
        }
        if self.var.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err("variances must be positive".to_string());
        }
        Ok(())
    }

    /// Unnormalized log posterior per class.
    pub fn joint_log_likelihood(&self, x: &DVector<f64>) -> Result<Vec<f64>, AppError> {
        check_query(x, self.n_features())?;

        let mut out = Vec::with_capacity(self.classes.len());
        for c in 0..self.classes.len() {
            let mut ll = self.class_prior[c].ln();
            for j in 0..self.n_features() {
                let v = self.var[(c, j)];
                let d = x[j] - self.theta[(c, j)];
                ll -= 0.5 * ((2.0 * PI * v).ln() + d * d / v);
            }
            out.push(ll);
        }
        Ok(out)
    }
}

impl Classifier for GaussianNb {
    fn classes(&self) -> &[DemandLabel] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.theta.ncols()
    }

    fn predict_proba(&self, x: &DVector<f64>) -> Result<Vec<f64>, AppError> {
        let jll = self.joint_log_likelihood(x)?;
        let norm = log_sum_exp(&jll);
        if !norm.is_finite() {
            return Err(AppError::Prediction("Naive Bayes produced non-finite scores.".to_string()));
        }
        Ok(jll.iter().map(|v| (v - norm).exp()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (DMatrix<f64>, Vec<DemandLabel>) {
        let x = DMatrix::from_row_slice(
            6,
            2,
            &[
                1.0, 5.0, //
                2.0, 6.0, //
                3.0, 5.5, //
                20.0, 1.0, //
                21.0, 0.5, //
                22.0, 1.5,
            ],
        );
        let y = vec![
            DemandLabel::Low,
            DemandLabel::Low,
            DemandLabel::Low,
            DemandLabel::Medium,
            DemandLabel::Medium,
            DemandLabel::Medium,
        ];
        (x, y)
    }

    #[test]
    fn fits_means_priors_and_variances() {
        let (x, y) = toy();
        let nb = GaussianNb::fit(&x, &y, 1e-9).unwrap();
        assert_eq!(nb.class_prior(), [0.5, 0.5]);
        assert!((nb.theta[(0, 0)] - 2.0).abs() < 1e-12);
        assert!((nb.theta[(1, 1)] - 1.0).abs() < 1e-12);
        // Population variance of [1, 2, 3] is 2/3.
        assert!((nb.var[(0, 0)] - (2.0 / 3.0 + nb.epsilon())).abs() < 1e-12);
    }

    #[test]
    fn separates_clusters_with_normalized_probabilities() {
        let (x, y) = toy();
        let nb = GaussianNb::fit(&x, &y, 1e-9).unwrap();

        let q = DVector::from_row_slice(&[2.5, 5.2]);
        let p = nb.predict_proba(&q).unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(nb.predict(&q).unwrap(), DemandLabel::Low);

        let q = DVector::from_row_slice(&[21.5, 1.1]);
        assert_eq!(nb.predict(&q).unwrap(), DemandLabel::Medium);
    }

    #[test]
    fn validate_catches_shape_and_variance_damage() {
        let (x, y) = toy();
        let nb = GaussianNb::fit(&x, &y, 1e-9).unwrap();
        assert!(nb.validate().is_ok());

        let mut bad = nb.clone();
        bad.class_prior.pop();
        assert!(bad.validate().is_err());

        let mut bad = nb.clone();
        bad.var[(1, 0)] = 0.0;
        assert!(bad.validate().unwrap_err().contains("variances"));

        let mut bad = nb;
        bad.classes.reverse();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn constant_columns_do_not_break_scoring() {
        let x = DMatrix::from_row_slice(4, 1, &[3.0, 3.0, 3.0, 3.0]);
        let y = [DemandLabel::Low, DemandLabel::Low, DemandLabel::High, DemandLabel::High];
        let nb = GaussianNb::fit(&x, &y, 1e-9).unwrap();
        let p = nb.predict_proba(&DVector::from_row_slice(&[3.0])).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-12);
    }
}
