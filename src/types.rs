//! Time series and snapshot types shared by the extraction and update stages

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Role of a value run inside a chart blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    DateAxis,
    TotalCases,
    DailyCases,
    ActiveCases,
    TotalDeaths,
    DailyDeaths,
}

impl Field {
    /// The five numeric columns, in export order
    pub const STATS: [Field; 5] = [
        Field::TotalCases,
        Field::DailyCases,
        Field::ActiveCases,
        Field::TotalDeaths,
        Field::DailyDeaths,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::DateAxis => "date",
            Field::TotalCases => "total_cases",
            Field::DailyCases => "daily_cases",
            Field::ActiveCases => "active_cases",
            Field::TotalDeaths => "total_deaths",
            Field::DailyDeaths => "daily_deaths",
        }
    }

    /// Position of the chart container holding this field on a country page.
    /// The date axis is read from the first chart.
    pub fn chart_index(&self) -> usize {
        match self {
            Field::DateAxis | Field::TotalCases => 0,
            Field::DailyCases => 1,
            Field::ActiveCases => 2,
            Field::TotalDeaths => 3,
            Field::DailyDeaths => 4,
        }
    }

    /// Returns true for per-day delta series (bar charts with a moving average overlay)
    pub fn is_daily(&self) -> bool {
        matches!(self, Field::DailyCases | Field::DailyDeaths)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reporting day for one country. `None` means "not reported", which is
/// distinct from a reported zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    pub total_cases: Option<i64>,
    pub daily_cases: Option<i64>,
    pub active_cases: Option<i64>,
    pub total_deaths: Option<i64>,
    pub daily_deaths: Option<i64>,
}

impl TimeSeriesRow {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_cases: None,
            daily_cases: None,
            active_cases: None,
            total_deaths: None,
            daily_deaths: None,
        }
    }

    pub fn set(&mut self, field: Field, value: Option<i64>) {
        match field {
            Field::DateAxis => {}
            Field::TotalCases => self.total_cases = value,
            Field::DailyCases => self.daily_cases = value,
            Field::ActiveCases => self.active_cases = value,
            Field::TotalDeaths => self.total_deaths = value,
            Field::DailyDeaths => self.daily_deaths = value,
        }
    }
}

/// Ordered daily rows for a single country
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    rows: Vec<TimeSeriesRow>,
}

impl TimeSeries {
    /// Wrap rows as read from a store or produced by the assembler.
    /// Ordering is trusted, not re-validated.
    pub fn from_rows(rows: Vec<TimeSeriesRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn last(&self) -> Option<&TimeSeriesRow> {
        self.rows.last()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a copy of the series with `row` appended
    pub fn appended(&self, row: TimeSeriesRow) -> Self {
        let mut rows = self.rows.clone();
        rows.push(row);
        Self { rows }
    }
}

/// New cases/deaths announced for the current day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyDelta {
    pub new_cases: Option<i64>,
    pub new_deaths: Option<i64>,
}

/// Column of the aggregate table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateColumn {
    TotalCases,
    TotalDeaths,
    TotalRecoveries,
}

impl AggregateColumn {
    pub const ALL: [AggregateColumn; 3] = [
        AggregateColumn::TotalCases,
        AggregateColumn::TotalDeaths,
        AggregateColumn::TotalRecoveries,
    ];
}

/// Cumulative figures for one country in the aggregate table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateEntry {
    pub total_cases: i64,
    pub total_deaths: i64,
    pub total_recoveries: i64,
    /// Columns that were rendered as "no data" and defaulted to zero
    pub absent: Vec<AggregateColumn>,
}

impl AggregateEntry {
    pub fn is_absent(&self, column: AggregateColumn) -> bool {
        self.absent.contains(&column)
    }

    pub fn set(&mut self, column: AggregateColumn, value: Option<i64>) {
        let value = match value {
            Some(v) => v,
            None => {
                self.absent.push(column);
                0
            }
        };
        match column {
            AggregateColumn::TotalCases => self.total_cases = value,
            AggregateColumn::TotalDeaths => self.total_deaths = value,
            AggregateColumn::TotalRecoveries => self.total_recoveries = value,
        }
    }
}

/// Point-in-time cross-country totals, keyed by display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub as_of: NaiveDate,
    pub entries: BTreeMap<String, AggregateEntry>,
}

impl AggregateSnapshot {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, country: &str) -> Option<&AggregateEntry> {
        self.entries.get(country)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
