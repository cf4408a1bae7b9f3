//! CSV persistence for country series and the aggregate table

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::assemble::parse_count;
use crate::config::{Config, Country};
use crate::types::{AggregateColumn, AggregateEntry, AggregateSnapshot, TimeSeries, TimeSeriesRow};

/// Read and overwrite a country's full series
pub trait SeriesStore {
    fn read_series(&self, country: &Country) -> Result<TimeSeries>;
    fn write_series(&self, country: &Country, series: &TimeSeries) -> Result<()>;
}

// Counts are read as text so files holding "12.0" or "null" still load
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    total_cases: Option<String>,
    daily_cases: Option<String>,
    active_cases: Option<String>,
    total_deaths: Option<String>,
    daily_deaths: Option<String>,
}

fn count(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(parse_count)
}

impl From<CsvRow> for TimeSeriesRow {
    fn from(row: CsvRow) -> Self {
        Self {
            date: row.date,
            total_cases: count(&row.total_cases),
            daily_cases: count(&row.daily_cases),
            active_cases: count(&row.active_cases),
            total_deaths: count(&row.total_deaths),
            daily_deaths: count(&row.daily_deaths),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AggregateRecord {
    country: String,
    total_cases: Option<String>,
    total_deaths: Option<String>,
    total_recoveries: Option<String>,
}

pub struct CsvStore {
    config: Config,
}

impl CsvStore {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn series_path(&self, country: &Country) -> PathBuf {
        self.config.series_path(country)
    }

    pub fn overall_path(&self) -> PathBuf {
        self.config.overall_path()
    }

    pub fn write_aggregate(&self, snapshot: &AggregateSnapshot) -> Result<()> {
        let records = snapshot.entries.iter().map(|(country, entry)| AggregateRecord {
            country: country.clone(),
            total_cases: Some(entry.total_cases.to_string()),
            total_deaths: Some(entry.total_deaths.to_string()),
            total_recoveries: Some(entry.total_recoveries.to_string()),
        });
        write_replacing(&self.overall_path(), records)
    }

    /// Load the aggregate table. Its as-of date is the file's modification day.
    pub fn read_aggregate(&self) -> Result<AggregateSnapshot> {
        let path = self.overall_path();
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Aggregate table not found: {}", path.display()))?;
        let as_of = DateTime::<Local>::from(modified).date_naive();

        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut snapshot = AggregateSnapshot::new(as_of);
        for record in reader.deserialize::<AggregateRecord>() {
            let record = record.with_context(|| format!("Bad row in {}", path.display()))?;
            let mut entry = AggregateEntry::default();
            entry.set(AggregateColumn::TotalCases, count(&record.total_cases));
            entry.set(AggregateColumn::TotalDeaths, count(&record.total_deaths));
            entry.set(AggregateColumn::TotalRecoveries, count(&record.total_recoveries));
            snapshot.entries.insert(record.country, entry);
        }
        Ok(snapshot)
    }
}

impl SeriesStore for CsvStore {
    fn read_series(&self, country: &Country) -> Result<TimeSeries> {
        let path = self.series_path(country);
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let rows = reader
            .deserialize::<CsvRow>()
            .map(|r| r.map(TimeSeriesRow::from))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Bad row in {}", path.display()))?;
        Ok(TimeSeries::from_rows(rows))
    }

    fn write_series(&self, country: &Country, series: &TimeSeries) -> Result<()> {
        write_replacing(&self.series_path(country), series.rows())
    }
}

/// Write `records` next to `path` and rename over it, so a failed write
/// leaves the previous file in place.
fn write_replacing<T: Serialize>(path: &Path, records: impl IntoIterator<Item = T>) -> Result<()> {
    ensure_parent(path)?;
    let tmp_path = path.with_extension("csv.tmp");

    let written = (|| -> Result<()> {
        let mut writer = csv::Writer::from_path(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
