//! Record → `FeatureVector` derivation.
//!
//! Training rows and prediction requests both funnel through the same private
//! `derive` so the two paths cannot drift apart.

use chrono::{Datelike, NaiveDate};

use crate::domain::{FeatureVector, InventoryRecord, PredictionRequest};

/// Derive the feature vector for a historical row.
pub fn derive_features(record: &InventoryRecord) -> FeatureVector {
    derive(
        record.date,
        &record.category,
        &record.region,
        record.inventory_level,
        &record.weather_condition,
        record.holiday_or_promotion,
    )
}

/// Derive the feature vector for a prediction request.
pub fn derive_request_features(request: &PredictionRequest) -> FeatureVector {
    derive(
        request.date,
        &request.category,
        &request.region,
        request.inventory_level,
        &request.weather_condition,
        request.holiday_or_promotion,
    )
}

pub fn derive_all(records: &[InventoryRecord]) -> Vec<FeatureVector> {
    records.iter().map(derive_features).collect()
}

fn derive(
    date: NaiveDate,
    category: &str,
    region: &str,
    inventory_level: u32,
    weather_condition: &str,
    holiday_or_promotion: bool,
) -> FeatureVector {
    FeatureVector {
        category: category.to_string(),
        region: region.to_string(),
        inventory_level,
        weather_condition: weather_condition.to_string(),
        holiday_or_promotion,
        day: date.day(),
        month: date.month(),
        year: date.year(),
        day_of_week: date.weekday().num_days_from_monday(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: NaiveDate) -> InventoryRecord {
        InventoryRecord {
            date,
            category: "Electronics".to_string(),
            region: "North".to_string(),
            inventory_level: 100,
            weather_condition: "Sunny".to_string(),
            holiday_or_promotion: false,
            units_sold: 42,
        }
    }

    #[test]
    fn monday_is_zero_and_sunday_is_six() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();

        assert_eq!(derive_features(&record(monday)).day_of_week, 0);
        assert_eq!(derive_features(&record(sunday)).day_of_week, 6);
    }

    #[test]
    fn derivation_is_pure() {
        let r = record(NaiveDate::from_ymd_opt(2022, 2, 28).unwrap());
        let a = derive_features(&r);
        let b = derive_features(&r);
        assert_eq!(a, b);
        assert_eq!((a.day, a.month, a.year), (28, 2, 2022));
        assert_eq!(a.inventory_level, 100);
        assert_eq!(a.category, "Electronics");
    }

    #[test]
    fn request_and_record_paths_agree() {
        let r = record(NaiveDate::from_ymd_opt(2023, 7, 4).unwrap());
        let request = PredictionRequest {
            category: r.category.clone(),
            region: r.region.clone(),
            inventory_level: r.inventory_level,
            weather_condition: r.weather_condition.clone(),
            holiday_or_promotion: r.holiday_or_promotion,
            date: r.date,
        };
        assert_eq!(derive_features(&r), derive_request_features(&request));
    }
}
