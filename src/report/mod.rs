//! Evaluation reporting: accuracy, per-class metrics and confusion matrices.
//!
//! All metrics are computed from the persisted held-out split; nothing here
//! refits or mutates a pipeline.

pub mod format;

use crate::domain::{DemandLabel, EvaluationSplit};
use crate::error::AppError;
use crate::fit::TrainedPipeline;

/// Precision / recall / F1 for one class (or an average row).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// Labels present in the truth or the predictions, in `DemandLabel` order.
    pub rows: Vec<(DemandLabel, ClassMetrics)>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

/// `counts[actual][predicted]`, indexed by `DemandLabel::index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 3]; 3],
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[DemandLabel], predicted: &[DemandLabel]) -> Self {
        let mut counts = [[0usize; 3]; 3];
        for (t, p) in truth.iter().zip(predicted) {
            counts[t.index()][p.index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, actual: DemandLabel, predicted: DemandLabel) -> usize {
        self.counts[actual.index()][predicted.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..3).map(|i| self.counts[i][i]).sum()
    }

    /// Number of rows whose actual label is `label`.
    pub fn actual_total(&self, label: DemandLabel) -> usize {
        self.counts[label.index()].iter().sum()
    }

    pub fn predicted_total(&self, label: DemandLabel) -> usize {
        self.counts.iter().map(|row| row[label.index()]).sum()
    }
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let total = cm.total();
        let rows: Vec<(DemandLabel, ClassMetrics)> = DemandLabel::ALL
            .iter()
            .filter(|l| cm.actual_total(**l) > 0 || cm.predicted_total(**l) > 0)
            .map(|&label| {
                let tp = cm.get(label, label) as f64;
                let support = cm.actual_total(label);
                let precision = ratio(tp, cm.predicted_total(label) as f64);
                let recall = ratio(tp, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);
                (
                    label,
                    ClassMetrics {
                        precision,
                        recall,
                        f1,
                        support,
                    },
                )
            })
            .collect();

        let n_rows = rows.len() as f64;
        let macro_avg = ClassMetrics {
            precision: ratio(rows.iter().map(|(_, m)| m.precision).sum(), n_rows),
            recall: ratio(rows.iter().map(|(_, m)| m.recall).sum(), n_rows),
            f1: ratio(rows.iter().map(|(_, m)| m.f1).sum(), n_rows),
            support: total,
        };
        let weighted = |pick: fn(&ClassMetrics) -> f64| {
            ratio(
                rows.iter().map(|(_, m)| pick(m) * m.support as f64).sum(),
                total as f64,
            )
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            accuracy: ratio(cm.correct() as f64, total as f64),
            rows,
            macro_avg,
            weighted_avg,
        }
    }
}

/// `num / den`, or 0 when the denominator is zero.
fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Everything the performance page shows for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub classification: ClassificationReport,
    pub confusion: ConfusionMatrix,
}

impl EvaluationReport {
    pub fn from_predictions(truth: &[DemandLabel], predicted: &[DemandLabel]) -> Result<Self, AppError> {
        if truth.len() != predicted.len() {
            return Err(AppError::InvalidInput(format!(
                "{} predictions for {} labels.",
                predicted.len(),
                truth.len()
            )));
        }
        let confusion = ConfusionMatrix::from_predictions(truth, predicted);
        let classification = ClassificationReport::from_confusion(&confusion);
        Ok(Self {
            accuracy: classification.accuracy,
            classification,
            confusion,
        })
    }
}

/// Score `pipeline` on the held-out split.
pub fn evaluate(pipeline: &TrainedPipeline, split: &EvaluationSplit) -> Result<EvaluationReport, AppError> {
    if split.is_empty() {
        return Err(AppError::InvalidInput("The evaluation split is empty.".to_string()));
    }
    let predicted = pipeline.predict_batch(&split.features)?;
    EvaluationReport::from_predictions(&split.labels, &predicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use DemandLabel::{High, Low, Medium};

    fn fixture() -> (Vec<DemandLabel>, Vec<DemandLabel>) {
        let truth = vec![Low, Low, Low, Low, Medium, Medium, Medium, High, High, High];
        let predicted = vec![Low, Low, Low, Medium, Medium, Medium, Low, High, High, Medium];
        (truth, predicted)
    }

    #[test]
    fn accuracy_and_confusion_counts() {
        let (truth, predicted) = fixture();
        let report = EvaluationReport::from_predictions(&truth, &predicted).unwrap();

        assert!((report.accuracy - 0.7).abs() < 1e-12);
        assert_eq!(report.confusion.counts, [[3, 1, 0], [1, 2, 0], [0, 1, 2]]);
        for label in DemandLabel::ALL {
            let support = truth.iter().filter(|t| **t == label).count();
            assert_eq!(report.confusion.actual_total(label), support);
        }
        assert_eq!(report.confusion.total(), truth.len());
    }

    #[test]
    fn per_class_metrics_and_averages() {
        let (truth, predicted) = fixture();
        let report = EvaluationReport::from_predictions(&truth, &predicted).unwrap().classification;

        let (label, low) = report.rows[0];
        assert_eq!(label, Low);
        assert!((low.precision - 0.75).abs() < 1e-12);
        assert!((low.recall - 0.75).abs() < 1e-12);
        assert_eq!(low.support, 4);

        let (_, high) = report.rows[2];
        assert!((high.precision - 1.0).abs() < 1e-12);
        assert!((high.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((high.f1 - 0.8).abs() < 1e-12);

        let (_, medium) = report.rows[1];
        let expected_macro = (low.f1 + medium.f1 + high.f1) / 3.0;
        assert!((report.macro_avg.f1 - expected_macro).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 10);
        assert!((report.weighted_avg.recall - report.accuracy).abs() < 1e-12);
    }

    #[test]
    fn absent_classes_are_left_out_and_undefined_metrics_are_zero() {
        let truth = vec![Low, Low, Medium];
        let predicted = vec![Low, Medium, Medium];
        let report = EvaluationReport::from_predictions(&truth, &predicted).unwrap();
        let labels: Vec<DemandLabel> = report.classification.rows.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec![Low, Medium]);
        assert_eq!(report.confusion.get(High, High), 0);

        let report = EvaluationReport::from_predictions(&[Low], &[High]).unwrap();
        let (_, high) = report.classification.rows[1];
        assert_eq!(high.recall, 0.0);
        assert_eq!(high.f1, 0.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(EvaluationReport::from_predictions(&[Low, High], &[Low]).is_err());
    }
}
