//! SQLite mirror of the CSV data: one table per country plus `overall_stats`

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::{Config, Country};
use crate::store::{CsvStore, SeriesStore};
use crate::types::{AggregateSnapshot, TimeSeries, TimeSeriesRow};

pub struct Database {
    conn: Connection,
}

/// Table names are interpolated into SQL, so only allow plain identifiers
fn checked_table(country: &Country) -> Result<String> {
    let name = country.table_name();
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("Country slug '{}' does not map to a valid table name", country.slug);
    }
    Ok(name)
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Drop and recreate a country's table, then load `series` into it
    pub fn create_country_table(&self, country: &Country, series: &TimeSeries) -> Result<()> {
        let table = checked_table(country)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
                 date TEXT PRIMARY KEY,
                 total_cases INTEGER,
                 daily_cases INTEGER,
                 active_cases INTEGER,
                 total_deaths INTEGER,
                 daily_deaths INTEGER
             );",
            table = table
        ))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                table
            ))?;
            for row in series.rows() {
                stmt.execute(params![
                    row.date.format("%Y-%m-%d").to_string(),
                    row.total_cases,
                    row.daily_cases,
                    row.active_cases,
                    row.total_deaths,
                    row.daily_deaths,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Drop and recreate `overall_stats` from the aggregate table.
    /// Country names are stored without spaces.
    pub fn create_overall_table(&self, snapshot: &AggregateSnapshot) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS overall_stats;
             CREATE TABLE overall_stats (
                 country TEXT,
                 total_cases INTEGER,
                 total_deaths INTEGER,
                 total_recoveries INTEGER
             );",
        )?;
        {
            let mut stmt = tx.prepare("INSERT INTO overall_stats VALUES (?1, ?2, ?3, ?4)")?;
            for (country, entry) in &snapshot.entries {
                stmt.execute(params![
                    country.replace(' ', ""),
                    entry.total_cases,
                    entry.total_deaths,
                    entry.total_recoveries,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn last_date(&self, country: &Country) -> Result<Option<NaiveDate>> {
        let table = checked_table(country)?;
        let date: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT date FROM {} ORDER BY date DESC LIMIT 1", table),
                [],
                |row| row.get(0),
            )
            .optional()?;
        date.map(|d| parse_date(&d)).transpose()
    }

    pub fn insert_row(&self, country: &Country, row: &TimeSeriesRow) -> Result<()> {
        let table = checked_table(country)?;
        self.conn.execute(
            &format!("INSERT INTO {} VALUES (?1, ?2, ?3, ?4, ?5, ?6)", table),
            params![
                row.date.format("%Y-%m-%d").to_string(),
                row.total_cases,
                row.daily_cases,
                row.active_cases,
                row.total_deaths,
                row.daily_deaths,
            ],
        )?;
        Ok(())
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Bad date in database: '{}'", s))
}

impl SeriesStore for Database {
    fn read_series(&self, country: &Country) -> Result<TimeSeries> {
        let table = checked_table(country)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT date, total_cases, daily_cases, active_cases, total_deaths, daily_deaths
             FROM {} ORDER BY date",
            table
        ))?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    TimeSeriesRow {
                        date: NaiveDate::MIN,
                        total_cases: row.get(1)?,
                        daily_cases: row.get(2)?,
                        active_cases: row.get(3)?,
                        total_deaths: row.get(4)?,
                        daily_deaths: row.get(5)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let rows = raw
            .into_iter()
            .map(|(date, row)| Ok(TimeSeriesRow { date: parse_date(&date)?, ..row }))
            .collect::<Result<Vec<_>>>()?;
        Ok(TimeSeries::from_rows(rows))
    }

    fn write_series(&self, country: &Country, series: &TimeSeries) -> Result<()> {
        self.create_country_table(country, series)
    }
}

/// Build the database from the CSV files: every country table plus `overall_stats`
pub fn run_db_init(config: &Config, output: &Path) -> Result<()> {
    let csv = CsvStore::new(config);
    let db = Database::open(output)?;

    let mut failed = 0usize;
    for country in &config.countries {
        let result = csv.read_series(country).and_then(|series| {
            if series.is_empty() {
                warn!(country = %country.slug, "series file has no rows");
            }
            db.write_series(country, &series)
        });
        match result {
            Ok(()) => println!("Table successfully created: {}", country.table_name()),
            Err(e) => {
                failed += 1;
                error!(country = %country.slug, "table creation failed: {:#}", e);
            }
        }
    }

    // every country depends on the aggregate table, so this one is fatal
    let snapshot = csv.read_aggregate()?;
    db.create_overall_table(&snapshot)?;
    println!("Table successfully created: overall_stats");

    if failed > 0 {
        bail!("{} of {} country tables failed", failed, config.countries.len());
    }
    Ok(())
}

/// Copy today's CSV row into each country table that does not have it yet
pub fn run_db_update(config: &Config, output: &Path, today: NaiveDate) -> Result<()> {
    let csv = CsvStore::new(config);
    let db = Database::open(output)?;

    let mut failed = 0usize;
    for country in &config.countries {
        let result = (|| -> Result<bool> {
            if db.last_date(country)? == Some(today) {
                return Ok(false);
            }
            let series = csv.read_series(country)?;
            match series.last() {
                Some(row) if row.date == today => {
                    db.insert_row(country, row)?;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })();

        match result {
            Ok(true) => {
                info!(country = %country.slug, "database row added");
                println!("Table {} updated", country.table_name());
            }
            Ok(false) => {}
            Err(e) => {
                failed += 1;
                error!(country = %country.slug, "database update failed: {:#}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} country tables failed to update", failed, config.countries.len());
    }
    Ok(())
}
