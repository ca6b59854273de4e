//! Fit both classifier families on one shared split and encoder.
//!
//! Steps:
//! 1. derive features + labels for every record
//! 2. stratified split (seeded)
//! 3. fit the encoder on training rows only
//! 4. fit k-NN and Gaussian NB on the same encoded training matrix

use crate::domain::{DemandLabel, EvaluationSplit, FeatureVector, InventoryRecord, ModelKind, TrainConfig};
use crate::error::AppError;
use crate::features::{demand_label, derive_all, FeatureEncoder};
use crate::fit::pipeline::TrainedPipeline;
use crate::fit::split::stratified_split;

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub knn: TrainedPipeline,
    pub naive_bayes: TrainedPipeline,
    pub split: EvaluationSplit,
    pub n_train: usize,
    /// Row counts per label over the full dataset.
    pub class_counts: Vec<(DemandLabel, usize)>,
}

impl TrainedModels {
    pub fn pipeline(&self, kind: ModelKind) -> &TrainedPipeline {
        match kind {
            ModelKind::Knn => &self.knn,
            ModelKind::GaussianNb => &self.naive_bayes,
        }
    }
}

pub fn train_models(records: &[InventoryRecord], config: &TrainConfig) -> Result<TrainedModels, AppError> {
    if records.is_empty() {
        return Err(AppError::Training("No records to train on.".to_string()));
    }

    let rows = derive_all(records);
    let labels: Vec<DemandLabel> = records.iter().map(|r| demand_label(r.units_sold)).collect();

    let class_counts = DemandLabel::ALL
        .iter()
        .map(|label| (*label, labels.iter().filter(|l| *l == label).count()))
        .collect();

    let split = stratified_split(&labels, config.test_fraction, config.seed)?;

    let train_rows: Vec<FeatureVector> = split.train.iter().map(|&i| rows[i].clone()).collect();
    let train_labels: Vec<DemandLabel> = split.train.iter().map(|&i| labels[i]).collect();

    let encoder = FeatureEncoder::fit(&train_rows)?;
    let x_train = encoder.transform_batch(&train_rows);
    tracing::debug!(
        width = encoder.width(),
        categories = encoder.categories().len(),
        regions = encoder.regions().len(),
        weather = encoder.weather_conditions().len(),
        columns = ?encoder.feature_names(),
        "encoder fitted"
    );

    let knn = TrainedPipeline::fit(ModelKind::Knn, encoder.clone(), &x_train, &train_labels, config)?;
    tracing::info!(k = config.neighbors, "k-NN fitted");
    let naive_bayes = TrainedPipeline::fit(ModelKind::GaussianNb, encoder, &x_train, &train_labels, config)?;
    tracing::info!(var_smoothing = config.var_smoothing, "Gaussian NB fitted");

    let holdout = EvaluationSplit {
        features: split.test.iter().map(|&i| rows[i].clone()).collect(),
        labels: split.test.iter().map(|&i| labels[i]).collect(),
    };

    Ok(TrainedModels {
        knn,
        naive_bayes,
        split: holdout,
        n_train: train_rows.len(),
        class_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, category: &str, inventory: u32, units: u32) -> InventoryRecord {
        InventoryRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            category: category.to_string(),
            region: if day % 2 == 0 { "North" } else { "South" }.to_string(),
            inventory_level: inventory,
            weather_condition: "Sunny".to_string(),
            holiday_or_promotion: day % 3 == 0,
            units_sold: units,
        }
    }

    fn dataset() -> Vec<InventoryRecord> {
        (1..=30)
            .map(|d| match d % 3 {
                0 => record(d, "Toys", 50 + d, 10),
                1 => record(d, "Clothing", 200 + d, 35),
                _ => record(d, "Electronics", 400 + d, 80),
            })
            .collect()
    }

    #[test]
    fn both_models_share_one_split() {
        let records = dataset();
        let config = TrainConfig::new("unused.csv", "unused");
        let trained = train_models(&records, &config).unwrap();

        assert_eq!(trained.split.len(), 6);
        assert_eq!(trained.n_train, 24);
        assert_eq!(
            trained.class_counts,
            vec![(DemandLabel::Low, 10), (DemandLabel::Medium, 10), (DemandLabel::High, 10)]
        );
        assert_eq!(trained.knn.encoder().categories(), trained.naive_bayes.encoder().categories());
        assert_eq!(trained.pipeline(ModelKind::Knn).kind(), ModelKind::Knn);
        assert_eq!(trained.pipeline(ModelKind::GaussianNb).kind(), ModelKind::GaussianNb);

        for label in DemandLabel::ALL {
            assert_eq!(trained.split.labels.iter().filter(|l| **l == label).count(), 2);
        }
    }

    #[test]
    fn retraining_with_same_seed_is_reproducible() {
        let records = dataset();
        let config = TrainConfig::new("unused.csv", "unused");
        let a = train_models(&records, &config).unwrap();
        let b = train_models(&records, &config).unwrap();
        assert_eq!(a.split.features, b.split.features);
        assert_eq!(a.split.labels, b.split.labels);
    }

    #[test]
    fn empty_dataset_is_a_training_error() {
        let config = TrainConfig::new("unused.csv", "unused");
        assert!(matches!(train_models(&[], &config), Err(AppError::Training(_))));
    }
}
