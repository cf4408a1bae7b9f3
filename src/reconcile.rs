//! Folding today's announced delta into a country's series.
//!
//! Active cases are derived from the aggregate table's recoveries and deaths,
//! not from the country's own death column, so they are only as fresh as the
//! last aggregate build.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::ReconcileError;
use crate::types::{AggregateColumn, AggregateEntry, DailyDelta, TimeSeries, TimeSeriesRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Page has not published figures for today
    Idle,
    /// Series ends with today's row
    Updated,
}

/// The aggregate table was built before the day being reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleAggregate {
    pub as_of: NaiveDate,
    pub today: NaiveDate,
}

/// Aggregate figures for one country, with the date they were taken
#[derive(Debug, Clone, Copy)]
pub struct CrossReference<'a> {
    pub entry: Option<&'a AggregateEntry>,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub series: TimeSeries,
    pub state: UpdateState,
    /// True when this call added a row
    pub appended: bool,
    pub stale: Option<StaleAggregate>,
}

/// Derive today's row from the previous one. Pure: nothing is mutated.
pub fn next_row(
    last: &TimeSeriesRow,
    delta: DailyDelta,
    aggregate: Option<&AggregateEntry>,
    today: NaiveDate,
) -> TimeSeriesRow {
    let total_cases = match delta.new_cases {
        Some(n) => last.total_cases.map(|t| t + n),
        None => last.total_cases,
    };
    let total_deaths = match delta.new_deaths {
        Some(n) => last.total_deaths.map(|t| t + n),
        None => last.total_deaths,
    };
    let active_cases = match aggregate {
        Some(agg) => total_cases.map(|t| t - (agg.total_recoveries + agg.total_deaths)),
        None => None,
    };

    TimeSeriesRow {
        date: today,
        total_cases,
        daily_cases: delta.new_cases,
        active_cases,
        total_deaths,
        daily_deaths: delta.new_deaths,
    }
}

/// Append today's row to `series` if a delta was published and the series
/// does not already end on `today`.
pub fn reconcile(
    series: &TimeSeries,
    delta: Option<DailyDelta>,
    cross: CrossReference<'_>,
    today: NaiveDate,
) -> Result<Reconciled, ReconcileError> {
    let Some(delta) = delta else {
        return Ok(Reconciled {
            series: series.clone(),
            state: UpdateState::Idle,
            appended: false,
            stale: None,
        });
    };

    let last = series.last().ok_or(ReconcileError::EmptySeries)?;
    if last.date > today {
        return Err(ReconcileError::FutureRow {
            last: last.date,
            today,
        });
    }
    if last.date == today {
        debug!(%today, "series already has a row for today");
        return Ok(Reconciled {
            series: series.clone(),
            state: UpdateState::Updated,
            appended: false,
            stale: None,
        });
    }

    let stale = (cross.as_of < today).then_some(StaleAggregate {
        as_of: cross.as_of,
        today,
    });
    match cross.entry {
        None => warn!("country missing from aggregate table, active cases left unreported"),
        Some(agg) if agg.is_absent(AggregateColumn::TotalRecoveries) => {
            warn!("recoveries not reported in aggregate table, counted as zero")
        }
        Some(_) => {}
    }

    let row = next_row(last, delta, cross.entry, today);
    Ok(Reconciled {
        series: series.appended(row),
        state: UpdateState::Updated,
        appended: true,
        stale,
    })
}
