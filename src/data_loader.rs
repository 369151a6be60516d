use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use ndarray::Array1;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::config::CsvOptions;
use crate::data_structures::{Domain, Series};
use crate::error::{InjectError, Result};
use crate::pipeline::{InjectionResult, StageReport};

const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Load the time column and one value column as a [`Series`].
pub fn load_series(path: &Path, opts: &CsvOptions) -> Result<Series> {
    info!(path = %path.display(), column = %opts.value_column, "loading series");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?);

    let headers = reader.headers()?.clone();
    let time_idx = match &opts.time_column {
        Some(name) => column_index(&headers, name)?,
        None => 0,
    };
    let time_name = headers.get(time_idx).unwrap_or_default().to_string();
    let value_idx = column_index(&headers, &opts.value_column)?;

    let mut timestamps = Vec::new();
    let mut raw_times = Vec::new();
    let mut values = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        // 1-based, header is row 1
        let row = idx + 2;
        let raw_t = record.get(time_idx).unwrap_or_default();
        let t = parse_timestamp(raw_t).ok_or_else(|| InjectError::Parse {
            row,
            column: time_name.clone(),
            reason: format!("unrecognised timestamp '{raw_t}'"),
        })?;
        timestamps.push(t);
        raw_times.push(raw_t.to_string());
        values.push(cell_value(&record, value_idx, opts.decimal, row, &opts.value_column)?);
    }

    debug!(rows = values.len(), "parsed series");
    Series::new(timestamps, Array1::from(values))?.with_time_labels(raw_times)
}

/// Load several numeric columns, e.g. from a generated result file.
pub fn load_columns(
    path: &Path,
    delimiter: u8,
    decimal: char,
    columns: &[&str],
) -> Result<Vec<Array1<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?);

    let headers = reader.headers()?.clone();
    let idx = columns
        .iter()
        .map(|c| column_index(&headers, c))
        .collect::<Result<Vec<_>>>()?;

    let mut cols: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for (r, record) in reader.records().enumerate() {
        let record = record?;
        for (j, &i) in idx.iter().enumerate() {
            cols[j].push(cell_value(&record, i, decimal, r + 2, columns[j])?);
        }
    }
    Ok(cols.into_iter().map(Array1::from).collect())
}

/// Result CSV: `<time>, y, y_hat, anomalies`.
pub fn write_result(path: &Path, result: &InjectionResult, time_header: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([time_header, "y", "y_hat", "anomalies"])?;
    for i in 0..result.y.len() {
        writer.write_record([
            result.time_labels[i].clone(),
            result.y[i].to_string(),
            result.y_hat[i].to_string(),
            result.labels[i].to_string(),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = result.y.len(), "wrote result");
    Ok(())
}

#[derive(Serialize)]
struct RunSummary<'a> {
    domain: Domain,
    n: usize,
    anomalous_steps: usize,
    stages: &'a [StageReport],
}

/// JSON report of the windows each stage placed.
pub fn write_summary(path: &Path, domain: Domain, result: &InjectionResult) -> Result<()> {
    let summary = RunSummary {
        domain,
        n: result.y.len(),
        anomalous_steps: result.anomalous_steps(),
        stages: &result.stages,
    };
    serde_json::to_writer_pretty(File::create(path)?, &summary)?;
    info!(path = %path.display(), "wrote summary");
    Ok(())
}

// ------------------------ helpers ------------------------

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        InjectError::invalid_series(format!(
            "column '{name}' not found; available: {}",
            headers.iter().collect::<Vec<_>>().join(", ")
        ))
    })
}

fn cell_value(record: &StringRecord, idx: usize, decimal: char, row: usize, column: &str) -> Result<f64> {
    let raw = record.get(idx).unwrap_or_default();
    parse_value(raw, decimal).ok_or_else(|| InjectError::Parse {
        row,
        column: column.to_string(),
        reason: format!("'{raw}' is not a number"),
    })
}

pub fn parse_value(raw: &str, decimal: char) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    let normalised = if decimal == '.' { raw.to_string() } else { raw.replace(decimal, ".") };
    normalised.parse::<f64>().ok()
}

/// RFC 3339 (converted to UTC) or one of the common naive layouts.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Some(t) = TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
    {
        return Some(t);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
