//! Tabular output: the raw records table and the weekly aggregate table,
//! written as CSV files.

use crate::aggregate::WeeklyAggregate;
use crate::error::ReportError;
use async_trait::async_trait;
use chrono::Weekday;
use logbook_client::Record;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

pub const RECORDS_FILE: &str = "rowing_data.csv";
pub const WEEKLY_FILE: &str = "weekly-report.csv";

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Render as RFC 4180 CSV with `\n` line endings.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, &self.headers);
        for row in &self.rows {
            push_csv_line(&mut out, row);
        }
        out
    }
}

fn push_csv_line(out: &mut String, cells: &[String]) {
    let escaped: Vec<Cow<'_, str>> = cells.iter().map(|c| csv_field(c)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Whole numbers print without a fractional part; non-numbers print blank.
fn format_number(n: f64) -> String {
    if !n.is_finite() {
        String::new()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// One row per record: `id,date,distance,calories_total`, then every other
/// field in the order the provider first sent it. Missing fields are left blank.
pub fn records_table(records: &[Record]) -> Table {
    let mut seen = HashSet::new();
    let extra_keys: Vec<&str> = records
        .iter()
        .flat_map(|r| r.extra.keys().map(String::as_str))
        .filter(|k| seen.insert(*k))
        .collect();

    let mut headers: Vec<String> = ["id", "date", "distance", "calories_total"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend(extra_keys.iter().map(|k| k.to_string()));

    let rows = records
        .iter()
        .map(|r| {
            let mut row = vec![
                r.id.clone().unwrap_or_default(),
                r.date.clone().unwrap_or_default(),
                format_number(r.distance),
                format_number(r.calories_total),
            ];
            row.extend(
                extra_keys
                    .iter()
                    .map(|k| r.extra.get(*k).map(format_value).unwrap_or_default()),
            );
            row
        })
        .collect();

    Table { headers, rows }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// `Start-<anchor>,End-<anchor - 1>,sessions,distance_total,calories_total`,
/// one row per week in the order given.
pub fn weekly_table(weeks: &[WeeklyAggregate], anchor: Weekday) -> Table {
    let headers = vec![
        format!("Start-{}", weekday_name(anchor)),
        format!("End-{}", weekday_name(anchor.pred())),
        "sessions".to_string(),
        "distance_total".to_string(),
        "calories_total".to_string(),
    ];
    let rows = weeks
        .iter()
        .map(|w| {
            vec![
                w.window.start.format(DATE_FORMAT).to_string(),
                w.window.end.format(DATE_FORMAT).to_string(),
                w.sessions.to_string(),
                w.distance_total.to_string(),
                w.calories_total.to_string(),
            ]
        })
        .collect();
    Table { headers, rows }
}

/// Destination for rendered tables.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Write `table` under `name`, returning where it landed.
    async fn write_table(&self, table: &Table, name: &str) -> Result<PathBuf, ReportError>;
}

/// Writes each table as `<dir>/<name>`, creating `dir` as needed.
#[derive(Clone, Debug)]
pub struct CsvReportSink {
    dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReportSink for CsvReportSink {
    async fn write_table(&self, table: &Table, name: &str) -> Result<PathBuf, ReportError> {
        let path = self.dir.join(name);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ReportError::Write {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, table.to_csv())
            .await
            .map_err(|source| ReportError::Write {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), rows = table.rows.len(), "table written");
        Ok(path)
    }
}
