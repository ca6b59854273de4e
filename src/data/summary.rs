//! Exploratory summaries of the raw inventory dataset.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::domain::InventoryRecord;
use crate::math::{mean, quantile_sorted, sample_std};

/// `describe()`-style statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub name: &'static str,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `NaN` with fewer than two rows.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnStats {
    pub fn from_values(name: &'static str, values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        Some(Self {
            name,
            count: sorted.len(),
            mean: mean(&sorted)?,
            std: sample_std(&sorted).unwrap_or(f64::NAN),
            min,
            q25: quantile_sorted(&sorted, 0.25)?,
            median: quantile_sorted(&sorted, 0.5)?,
            q75: quantile_sorted(&sorted, 0.75)?,
            max,
        })
    }
}

/// A grouped total or mean, with its share of the grand total where relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupValue {
    pub key: String,
    pub value: f64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub rows: usize,
    pub date_range: (NaiveDate, NaiveDate),
    pub columns: Vec<ColumnStats>,
    /// Units sold per calendar date, date ascending.
    pub daily_units: Vec<(NaiveDate, u64)>,
    pub units_by_category: Vec<GroupValue>,
    pub units_by_region: Vec<GroupValue>,
    pub mean_units_by_weather: Vec<GroupValue>,
}

pub fn summarize(records: &[InventoryRecord]) -> Option<DatasetSummary> {
    let first = records.first()?;
    let (mut lo, mut hi) = (first.date, first.date);
    for r in records {
        lo = lo.min(r.date);
        hi = hi.max(r.date);
    }

    let column = |name: &'static str, pick: fn(&InventoryRecord) -> f64| {
        let values: Vec<f64> = records.iter().map(pick).collect();
        ColumnStats::from_values(name, &values)
    };
    let columns = vec![
        column("Inventory Level", |r| f64::from(r.inventory_level))?,
        column("Holiday/Promotion", |r| f64::from(u8::from(r.holiday_or_promotion)))?,
        column("Units Sold", |r| f64::from(r.units_sold))?,
    ];

    let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for r in records {
        *daily.entry(r.date).or_default() += u64::from(r.units_sold);
    }

    Some(DatasetSummary {
        rows: records.len(),
        date_range: (lo, hi),
        columns,
        daily_units: daily.into_iter().collect(),
        units_by_category: group_totals(records, |r| &r.category),
        units_by_region: group_totals(records, |r| &r.region),
        mean_units_by_weather: group_means(records, |r| &r.weather_condition),
    })
}

/// Total units sold per key, largest first, with share of the grand total.
fn group_totals<'a>(records: &'a [InventoryRecord], key: impl Fn(&'a InventoryRecord) -> &'a String) -> Vec<GroupValue> {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for r in records {
        *sums.entry(key(r).as_str()).or_default() += f64::from(r.units_sold);
    }
    let total: f64 = sums.values().sum();
    sorted_desc(
        sums.into_iter()
            .map(|(k, v)| GroupValue {
                key: k.to_string(),
                value: v,
                share: if total > 0.0 { v / total } else { 0.0 },
            })
            .collect(),
    )
}

/// Mean units sold per key, largest first. `share` is the fraction of rows.
fn group_means<'a>(records: &'a [InventoryRecord], key: impl Fn(&'a InventoryRecord) -> &'a String) -> Vec<GroupValue> {
    let mut acc: HashMap<&str, (f64, usize)> = HashMap::new();
    for r in records {
        let e = acc.entry(key(r).as_str()).or_default();
        e.0 += f64::from(r.units_sold);
        e.1 += 1;
    }
    let n = records.len() as f64;
    sorted_desc(
        acc.into_iter()
            .map(|(k, (sum, count))| GroupValue {
                key: k.to_string(),
                value: sum / count as f64,
                share: count as f64 / n,
            })
            .collect(),
    )
}

fn sorted_desc(mut groups: Vec<GroupValue>) -> Vec<GroupValue> {
    // Ties fall back to the key so output order never depends on hashing.
    groups.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    groups
}

/// Distinct values of a column in first-appearance order.
pub fn distinct_in_order<'a>(records: &'a [InventoryRecord], key: impl Fn(&'a InventoryRecord) -> &'a String) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .map(key)
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}
