//! CSV ingest and validation.
//!
//! Turns the raw inventory export into `InventoryRecord`s that the rest of the
//! crate can trust:
//!
//! - **Strict schema**: the seven required headers must exist verbatim
//!   (case-sensitive, BOM tolerated, extra columns ignored)
//! - **Row-level validation**: bad rows are skipped and reported with their
//!   1-based line number
//! - a file that yields no usable rows is an error

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::InventoryRecord;
use crate::error::AppError;

pub const COL_DATE: &str = "Date";
pub const COL_CATEGORY: &str = "Category";
pub const COL_REGION: &str = "Region";
pub const COL_INVENTORY: &str = "Inventory Level";
pub const COL_WEATHER: &str = "Weather Condition";
pub const COL_HOLIDAY: &str = "Holiday/Promotion";
pub const COL_UNITS_SOLD: &str = "Units Sold";

/// Required columns, in the order the dataset writer emits them.
pub const INVENTORY_COLUMNS: [&str; 7] = [
    COL_DATE,
    COL_CATEGORY,
    COL_REGION,
    COL_INVENTORY,
    COL_WEATHER,
    COL_HOLIDAY,
    COL_UNITS_SOLD,
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: validated records + what was skipped.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub records: Vec<InventoryRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load and validate the inventory CSV at `path`.
pub fn load_inventory(path: &Path) -> Result<LoadedDataset, AppError> {
    if !path.exists() {
        return Err(AppError::MissingData {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| AppError::io(format!("Failed to open '{}'", path.display()), e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::InvalidInput(format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_columns_exist(&header_map, &INVENTORY_COLUMNS)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, &header_map));
        match parsed {
            Ok(record) => records.push(record),
            Err(message) => {
                tracing::debug!(line, %message, "skipping row");
                row_errors.push(RowError { line, message });
            }
        }
    }

    if records.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "'{}' contains no usable rows ({} read, {} rejected).",
            path.display(),
            rows_read,
            row_errors.len()
        )));
    }

    Ok(LoadedDataset {
        records,
        row_errors,
        rows_read,
    })
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim_start_matches('\u{feff}').trim().to_string()
}

pub(crate) fn ensure_columns_exist(header_map: &HashMap<String, usize>, columns: &[&str]) -> Result<(), AppError> {
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Missing required column(s): {}",
            missing.iter().map(|c| format!("`{c}`")).collect::<Vec<_>>().join(", ")
        )))
    }
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<InventoryRecord, String> {
    Ok(InventoryRecord {
        date: parse_date(get_required(record, header_map, COL_DATE)?)?,
        category: get_required(record, header_map, COL_CATEGORY)?.to_string(),
        region: get_required(record, header_map, COL_REGION)?.to_string(),
        inventory_level: parse_u32(get_required(record, header_map, COL_INVENTORY)?, COL_INVENTORY)?,
        weather_condition: get_required(record, header_map, COL_WEATHER)?.to_string(),
        holiday_or_promotion: parse_flag(get_required(record, header_map, COL_HOLIDAY)?, COL_HOLIDAY)?,
        units_sold: parse_u32(get_required(record, header_map, COL_UNITS_SOLD)?, COL_UNITS_SOLD)?,
    })
}

pub(crate) fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

/// Accepts ISO dates plus the slash/dash variants common in spreadsheet exports.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
    // Timestamps like "2022-01-01 00:00:00" keep only the date part.
    let s = s.split_whitespace().next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, DD/MM/YYYY, DD-MM-YYYY."
    ))
}

pub(crate) fn parse_u32(s: &str, name: &str) -> Result<u32, String> {
    if let Ok(v) = s.parse::<u32>() {
        return Ok(v);
    }
    // Some exports write integer columns as "120.0".
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => Ok(v as u32),
        _ => Err(format!("Invalid `{name}` value '{s}' (expected a non-negative integer).")),
    }
}

pub(crate) fn parse_flag(s: &str, name: &str) -> Result<bool, String> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(format!("Invalid `{name}` value '{other}' (expected 0 or 1).")),
    }
}
