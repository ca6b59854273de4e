//! Held-out split files: `X_test.csv` (derived features) and `y_test.csv`
//! (labels).
//!
//! Both are plain CSV so the split can be inspected in a spreadsheet. Rows are
//! paired by position.

use std::fs::File;
use std::path::Path;

use crate::domain::{DemandLabel, EvaluationSplit, FeatureVector};
use crate::error::AppError;
use crate::io::ingest::{build_header_map, ensure_columns_exist, get_required, parse_flag, parse_u32};

pub const FEATURE_COLUMNS: [&str; 9] = [
    "Category",
    "Region",
    "Inventory Level",
    "Weather Condition",
    "Holiday/Promotion",
    "Day",
    "Month",
    "Year",
    "DayOfWeek",
];

pub const LABEL_COLUMN: &str = "Demand_Level";

pub fn write_features_csv(path: &Path, rows: &[FeatureVector]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, "create", e))?;
    writer.write_record(FEATURE_COLUMNS).map_err(|e| csv_error(path, "write", e))?;

    for r in rows {
        writer
            .write_record([
                r.category.clone(),
                r.region.clone(),
                r.inventory_level.to_string(),
                r.weather_condition.clone(),
                u8::from(r.holiday_or_promotion).to_string(),
                r.day.to_string(),
                r.month.to_string(),
                r.year.to_string(),
                r.day_of_week.to_string(),
            ])
            .map_err(|e| csv_error(path, "write", e))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush '{}'", path.display()), e))
}

pub fn write_labels_csv(path: &Path, labels: &[DemandLabel]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, "create", e))?;
    writer.write_record([LABEL_COLUMN]).map_err(|e| csv_error(path, "write", e))?;
    for label in labels {
        writer.write_record([label.as_str()]).map_err(|e| csv_error(path, "write", e))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush '{}'", path.display()), e))
}

/// Read a features file. Any malformed row makes the whole file corrupt.
pub fn read_features_csv(path: &Path) -> Result<Vec<FeatureVector>, AppError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers().map_err(|e| AppError::corrupt(path, e))?.clone();
    let header_map = build_header_map(&headers);
    ensure_columns_exist(&header_map, &FEATURE_COLUMNS).map_err(|e| AppError::corrupt(path, e))?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::corrupt(path, format!("line {line}: {e}")))?;
        let field = |name: &str| get_required(&record, &header_map, name);
        let parsed = (|| -> Result<FeatureVector, String> {
            Ok(FeatureVector {
                category: field("Category")?.to_string(),
                region: field("Region")?.to_string(),
                inventory_level: parse_u32(field("Inventory Level")?, "Inventory Level")?,
                weather_condition: field("Weather Condition")?.to_string(),
                holiday_or_promotion: parse_flag(field("Holiday/Promotion")?, "Holiday/Promotion")?,
                day: parse_u32(field("Day")?, "Day")?,
                month: parse_u32(field("Month")?, "Month")?,
                year: field("Year")?
                    .parse::<i32>()
                    .map_err(|e| format!("Invalid `Year`: {e}"))?,
                day_of_week: parse_u32(field("DayOfWeek")?, "DayOfWeek")?,
            })
        })();
        rows.push(parsed.map_err(|e| AppError::corrupt(path, format!("line {line}: {e}")))?);
    }
    Ok(rows)
}

pub fn read_labels_csv(path: &Path) -> Result<Vec<DemandLabel>, AppError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers().map_err(|e| AppError::corrupt(path, e))?.clone();
    let header_map = build_header_map(&headers);
    ensure_columns_exist(&header_map, &[LABEL_COLUMN]).map_err(|e| AppError::corrupt(path, e))?;

    let mut labels = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::corrupt(path, format!("line {line}: {e}")))?;
        let label = get_required(&record, &header_map, LABEL_COLUMN)
            .and_then(|s| s.parse::<DemandLabel>())
            .map_err(|e| AppError::corrupt(path, format!("line {line}: {e}")))?;
        labels.push(label);
    }
    Ok(labels)
}

/// Read both files and pair them into an `EvaluationSplit`.
pub fn read_split(features_path: &Path, labels_path: &Path) -> Result<EvaluationSplit, AppError> {
    let features = read_features_csv(features_path)?;
    let labels = read_labels_csv(labels_path)?;
    if features.len() != labels.len() {
        return Err(AppError::corrupt(
            labels_path,
            format!("{} labels for {} feature rows", labels.len(), features.len()),
        ));
    }
    Ok(EvaluationSplit { features, labels })
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, AppError> {
    if !path.exists() {
        return Err(AppError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| AppError::io(format!("Failed to open '{}'", path.display()), e))?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn csv_error(path: &Path, action: &str, e: csv::Error) -> AppError {
    AppError::io(
        format!("Failed to {action} '{}'", path.display()),
        std::io::Error::other(e),
    )
}
