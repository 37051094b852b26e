//! Validation and normalization of raw spreadsheet rows into typed records.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::{MetricsError, Result};
use crate::metrics::{self, DerivedMetrics};
use crate::models::{Month, Record};

pub const CAMPAIGN_NAME: &str = "campaign_name";
pub const MARKETING_CHANNEL: &str = "marketing_channel";
pub const AGE_GROUP: &str = "age_group";
pub const GENDER: &str = "gender";
pub const START_DATE: &str = "start_date";
pub const IMPRESSIONS: &str = "impressions";
pub const CLICKS: &str = "clicks";
pub const CONVERSIONS: &str = "conversions";
pub const TOTAL_SPEND: &str = "total_spend";
pub const REVENUE_GENERATED: &str = "revenue_generated";

/// One untyped input row, keyed by exact column name.
pub type RawRow = HashMap<String, String>;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Rows accepted and rejected by [`normalize_rows_lenient`].
#[derive(Debug, Default)]
pub struct Ingested {
    pub records: Vec<Record>,
    pub rejected: Vec<MetricsError>,
}

/// Normalizes every row, stopping at the first schema error.
pub fn normalize_rows(rows: &[RawRow]) -> Result<Vec<Record>> {
    let records = rows
        .iter()
        .enumerate()
        .map(|(index, row)| normalize_row(index, row))
        .collect::<Result<Vec<_>>>()?;
    debug!(records = records.len(), "normalized rows");
    Ok(records)
}

/// Normalizes every row, skipping the ones that fail validation.
pub fn normalize_rows_lenient(rows: &[RawRow]) -> Ingested {
    let mut ingested = Ingested::default();

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(index, row) {
            Ok(record) => ingested.records.push(record),
            Err(err) => {
                warn!(row = index, error = %err, "skipping invalid row");
                ingested.rejected.push(err);
            }
        }
    }

    debug!(
        records = ingested.records.len(),
        rejected = ingested.rejected.len(),
        "normalized rows leniently"
    );
    ingested
}

pub fn normalize_row(index: usize, row: &RawRow) -> Result<Record> {
    let start_date = cell(row, START_DATE).and_then(parse_date);

    let record = Record {
        campaign_name: required_text(index, row, CAMPAIGN_NAME)?,
        marketing_channel: required_text(index, row, MARKETING_CHANNEL)?,
        age_group: cell(row, AGE_GROUP).map(str::to_string),
        gender: cell(row, GENDER).map(str::to_string),
        start_date,
        month: start_date.map(Month::of),
        impressions: required_count(index, row, IMPRESSIONS)?,
        clicks: required_count(index, row, CLICKS)?,
        conversions: required_count(index, row, CONVERSIONS)?,
        total_spend: required_amount(index, row, TOTAL_SPEND)?,
        revenue_generated: required_amount(index, row, REVENUE_GENERATED)?,
        metrics: DerivedMetrics::default(),
    };

    Ok(metrics::with_metrics(record))
}

/// Parses a date cell; `None` for anything unrecognized.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|datetime| datetime.date_naive())
        })
}

fn cell<'a>(row: &'a RawRow, column: &str) -> Option<&'a str> {
    row.get(column)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn required<'a>(index: usize, row: &'a RawRow, column: &str) -> Result<&'a str> {
    cell(row, column).ok_or_else(|| MetricsError::schema(index, column, "missing value"))
}

fn required_text(index: usize, row: &RawRow, column: &str) -> Result<String> {
    required(index, row, column).map(str::to_string)
}

fn required_count(index: usize, row: &RawRow, column: &str) -> Result<u64> {
    let raw = required(index, row, column)?;
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }

    let value = required_amount(index, row, column)?;
    if value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(MetricsError::schema(
            index,
            column,
            format!("expected a whole number, got '{raw}'"),
        ));
    }
    Ok(value as u64)
}

fn required_amount(index: usize, row: &RawRow, column: &str) -> Result<f64> {
    let raw = required(index, row, column)?;
    let value = raw.parse::<f64>().map_err(|_| {
        MetricsError::schema(index, column, format!("expected a number, got '{raw}'"))
    })?;

    if !value.is_finite() {
        return Err(MetricsError::schema(
            index,
            column,
            format!("expected a finite number, got '{raw}'"),
        ));
    }
    if value < 0.0 {
        return Err(MetricsError::schema(
            index,
            column,
            format!("expected a non-negative number, got '{raw}'"),
        ));
    }
    Ok(value)
}
