//! Single-request prediction against a loaded pipeline.

use crate::domain::{DemandLabel, ModelKind, PredictionRequest};
use crate::error::AppError;
use crate::features::derive_request_features;
use crate::fit::TrainedPipeline;

/// One model's answer to a prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrediction {
    pub kind: ModelKind,
    pub label: DemandLabel,
    /// Probability per class the model was trained on, in `DemandLabel` order.
    pub probabilities: Vec<(DemandLabel, f64)>,
}

impl ModelPrediction {
    pub fn probability_of(&self, label: DemandLabel) -> f64 {
        self.probabilities
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }
}

pub fn predict(pipeline: &TrainedPipeline, request: &PredictionRequest) -> Result<ModelPrediction, AppError> {
    validate_request(request)?;

    let features = derive_request_features(request);
    let (label, proba) = pipeline.predict_with_proba(&features)?;
    if proba.iter().any(|p| !p.is_finite()) {
        return Err(AppError::Prediction(format!(
            "{} returned non-finite probabilities.",
            pipeline.kind().short_name()
        )));
    }

    tracing::debug!(model = pipeline.kind().short_name(), %label, "prediction");
    Ok(ModelPrediction {
        kind: pipeline.kind(),
        label,
        probabilities: pipeline.classes().iter().copied().zip(proba).collect(),
    })
}

fn validate_request(request: &PredictionRequest) -> Result<(), AppError> {
    let blank = [
        ("category", &request.category),
        ("region", &request.region),
        ("weather condition", &request.weather_condition),
    ]
    .into_iter()
    .find(|(_, v)| v.trim().is_empty());

    match blank {
        Some((name, _)) => Err(AppError::Prediction(format!("The {name} must not be empty."))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InventoryRecord, TrainConfig};
    use crate::fit::{train_models, TrainedModels};
    use chrono::NaiveDate;

    fn trained() -> TrainedModels {
        let records: Vec<InventoryRecord> = (0..45u32)
            .map(|i| InventoryRecord {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(i)),
                category: ["Toys", "Groceries", "Electronics"][(i % 3) as usize].to_string(),
                region: ["North", "South"][(i % 2) as usize].to_string(),
                inventory_level: 80 + 120 * (i % 3) + i,
                weather_condition: ["Sunny", "Rainy", "Cloudy"][(i % 3) as usize].to_string(),
                holiday_or_promotion: i % 5 == 0,
                units_sold: [12, 35, 120][(i % 3) as usize],
            })
            .collect();
        train_models(&records, &TrainConfig::new("unused.csv", "unused")).unwrap()
    }

    fn request(category: &str) -> PredictionRequest {
        PredictionRequest {
            category: category.to_string(),
            region: "North".to_string(),
            inventory_level: 100,
            weather_condition: "Sunny".to_string(),
            holiday_or_promotion: false,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    #[test]
    fn probabilities_sum_to_one_and_label_is_argmax() {
        let trained = trained();
        for kind in ModelKind::ALL {
            let out = predict(trained.pipeline(kind), &request("Electronics")).unwrap();
            assert_eq!(out.kind, kind);
            let total: f64 = out.probabilities.iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < 1e-6);

            let best = out
                .probabilities
                .iter()
                .fold(f64::NEG_INFINITY, |acc, (_, p)| acc.max(*p));
            assert_eq!(out.probability_of(out.label), best);
        }
    }

    #[test]
    fn unseen_category_still_predicts() {
        let trained = trained();
        for kind in ModelKind::ALL {
            let out = predict(trained.pipeline(kind), &request("Garden")).unwrap();
            assert_eq!(out.kind, kind);
            assert!(DemandLabel::ALL.contains(&out.label));
            let total: f64 = out.probabilities.iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < 1e-6, "{kind:?}");
        }
    }

    #[test]
    fn blank_fields_are_prediction_errors() {
        let trained = trained();
        let err = predict(&trained.knn, &request("  ")).unwrap_err();
        assert!(matches!(err, AppError::Prediction(_)));
        assert!(err.is_recoverable());
    }
}
