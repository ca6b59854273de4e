//! Numeric pass-through + one-hot encoding of categorical columns.
//!
//! Encoded column layout (fixed):
//!
//! ```text
//! [inventory, holiday, day, month, year, day_of_week,
//!  category one-hot..., region one-hot..., weather one-hot...]
//! ```
//!
//! Each one-hot block follows the vocabulary observed at fit time, sorted
//! lexicographically. A value that was never seen during fit encodes as an
//! all-zero block instead of failing.

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::FeatureVector;
use crate::error::AppError;

/// Names of the pass-through numeric columns, in encoded order.
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "Inventory Level",
    "Holiday/Promotion",
    "Day",
    "Month",
    "Year",
    "DayOfWeek",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    categories: Vec<String>,
    regions: Vec<String>,
    weather_conditions: Vec<String>,
}

impl FeatureEncoder {
    /// Learn the categorical vocabulary from training rows.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self, AppError> {
        if rows.is_empty() {
            return Err(AppError::Training("Cannot fit the encoder on zero rows.".to_string()));
        }

        Ok(Self {
            categories: vocabulary(rows, |r| r.category.as_str()),
            regions: vocabulary(rows, |r| r.region.as_str()),
            weather_conditions: vocabulary(rows, |r| r.weather_condition.as_str()),
        })
    }

    /// Total encoded width.
    pub fn width(&self) -> usize {
        NUMERIC_COLUMNS.len() + self.categories.len() + self.regions.len() + self.weather_conditions.len()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn weather_conditions(&self) -> &[String] {
        &self.weather_conditions
    }

    /// Column names of the encoded matrix (for diagnostics).
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect();
        names.extend(self.categories.iter().map(|v| format!("Category={v}")));
        names.extend(self.regions.iter().map(|v| format!("Region={v}")));
        names.extend(self.weather_conditions.iter().map(|v| format!("Weather Condition={v}")));
        names
    }

    /// Each vocabulary must be strictly sorted; `transform` looks values up
    /// by binary search.
    pub fn validate(&self) -> Result<(), String> {
        let blocks = [
            ("Category", &self.categories),
            ("Region", &self.regions),
            ("Weather Condition", &self.weather_conditions),
        ];
        for (column, vocab) in blocks {
            if vocab.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("{column} vocabulary is not sorted and unique"));
            }
        }
        Ok(())
    }

    /// Encode one row.
    pub fn transform(&self, row: &FeatureVector) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        out.push(f64::from(row.inventory_level));
        out.push(if row.holiday_or_promotion { 1.0 } else { 0.0 });
        out.push(f64::from(row.day));
        out.push(f64::from(row.month));
        out.push(f64::from(row.year));
        out.push(f64::from(row.day_of_week));

        push_one_hot(&mut out, &self.categories, &row.category, "Category");
        push_one_hot(&mut out, &self.regions, &row.region, "Region");
        push_one_hot(&mut out, &self.weather_conditions, &row.weather_condition, "Weather Condition");
        out
    }

    /// Encode many rows into a `rows × width` matrix.
    pub fn transform_batch(&self, rows: &[FeatureVector]) -> DMatrix<f64> {
        let width = self.width();
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            data.extend(self.transform(row));
        }
        DMatrix::from_row_slice(rows.len(), width, &data)
    }
}

fn vocabulary<'a>(rows: &'a [FeatureVector], pick: impl Fn(&'a FeatureVector) -> &'a str) -> Vec<String> {
    rows.iter()
        .map(pick)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn push_one_hot(out: &mut Vec<f64>, vocab: &[String], value: &str, column: &str) {
    let hit = vocab.binary_search_by(|v| v.as_str().cmp(value)).ok();
    if hit.is_none() {
        tracing::debug!(column, value, "value not seen during fit; encoding as zeros");
    }
    out.extend((0..vocab.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, region: &str, weather: &str) -> FeatureVector {
        FeatureVector {
            category: category.to_string(),
            region: region.to_string(),
            inventory_level: 120,
            weather_condition: weather.to_string(),
            holiday_or_promotion: true,
            day: 15,
            month: 1,
            year: 2024,
            day_of_week: 0,
        }
    }

    #[test]
    fn vocab_is_sorted_and_layout_is_fixed() {
        let rows = vec![
            row("Toys", "West", "Sunny"),
            row("Electronics", "North", "Rainy"),
            row("Toys", "East", "Sunny"),
        ];
        let enc = FeatureEncoder::fit(&rows).unwrap();
        assert_eq!(enc.categories(), ["Electronics", "Toys"]);
        assert_eq!(enc.regions(), ["East", "North", "West"]);
        assert_eq!(enc.width(), 6 + 2 + 3 + 2);

        let x = enc.transform(&rows[1]);
        assert_eq!(&x[..6], &[120.0, 1.0, 15.0, 1.0, 2024.0, 0.0]);
        assert_eq!(&x[6..8], &[1.0, 0.0]);
        assert_eq!(&x[8..11], &[0.0, 1.0, 0.0]);
        assert_eq!(&x[11..13], &[1.0, 0.0]);
        assert_eq!(enc.feature_names()[6], "Category=Electronics");
    }

    #[test]
    fn unseen_values_encode_as_zero_blocks() {
        let enc = FeatureEncoder::fit(&[row("Toys", "West", "Sunny")]).unwrap();
        let x = enc.transform(&row("Groceries", "Mars", "Snowy"));
        assert_eq!(x.len(), enc.width());
        assert!(x[6..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn validate_requires_sorted_vocabularies() {
        let rows = vec![row("Toys", "West", "Sunny"), row("Electronics", "North", "Rainy")];
        let mut enc = FeatureEncoder::fit(&rows).unwrap();
        assert!(enc.validate().is_ok());
        enc.regions.reverse();
        assert!(enc.validate().unwrap_err().starts_with("Region"));
    }

    #[test]
    fn batch_matches_rows() {
        let rows = vec![row("Toys", "West", "Sunny"), row("Electronics", "North", "Rainy")];
        let enc = FeatureEncoder::fit(&rows).unwrap();
        let m = enc.transform_batch(&rows);
        assert_eq!(m.shape(), (2, enc.width()));
        let second: Vec<f64> = m.row(1).iter().copied().collect();
        assert_eq!(second, enc.transform(&rows[1]));
    }
}
