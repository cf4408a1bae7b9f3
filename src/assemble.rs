//! Zipping extracted token runs into dated rows

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::ExtractError;
use crate::types::{Field, TimeSeries, TimeSeriesRow};

/// Tokens the charts use for "not reported"
const PLACEHOLDERS: &[&str] = &["null", "NaN", "nan", "-", "N/A", "undefined"];

/// Parse a date token like "Mar15" (no year on the page) into a calendar date
pub fn parse_date_token(token: &str, year: i32) -> Result<NaiveDate, ExtractError> {
    let token = token.trim();
    let bad = || ExtractError::BadDate {
        token: token.to_string(),
    };

    let split = token.find(|c: char| c.is_ascii_digit()).ok_or_else(bad)?;
    let (month, day) = token.split_at(split);
    if month.is_empty() || !day.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }

    NaiveDate::parse_from_str(&format!("{} {} {}", month, day, year), "%b %d %Y")
        .map_err(|_| bad())
}

/// Parse a numeric token; anything unparseable counts as not reported
pub fn parse_count(token: &str) -> Option<i64> {
    let token = token.trim();
    if token.is_empty() || PLACEHOLDERS.contains(&token) {
        return None;
    }
    if let Ok(v) = token.parse::<i64>() {
        return Some(v);
    }
    // Some charts emit whole numbers as floats
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => None,
    }
}

/// Zip two runs, failing instead of truncating when lengths differ
pub fn zip_checked<L, R>(
    field: Field,
    left: L,
    right: R,
) -> Result<std::iter::Zip<L, R>, ExtractError>
where
    L: ExactSizeIterator,
    R: ExactSizeIterator,
{
    if left.len() != right.len() {
        return Err(ExtractError::Alignment {
            field,
            expected: left.len(),
            found: right.len(),
        });
    }
    Ok(left.zip(right))
}

/// Build a series from the date axis and per-field tokens.
///
/// Fields missing from `fields` leave their column unreported. Every supplied
/// field must have exactly one token per date.
pub fn assemble(
    dates: &[String],
    fields: &BTreeMap<Field, Vec<String>>,
    year: i32,
) -> Result<TimeSeries, ExtractError> {
    let mut rows = dates
        .iter()
        .map(|d| parse_date_token(d, year).map(TimeSeriesRow::empty))
        .collect::<Result<Vec<_>, _>>()?;

    for (&field, tokens) in fields {
        if field == Field::DateAxis {
            continue;
        }
        let mut missing = 0usize;
        for (row, token) in zip_checked(field, rows.iter_mut(), tokens.iter())? {
            let value = parse_count(token);
            if value.is_none() {
                missing += 1;
            }
            row.set(field, value);
        }
        if missing > 0 {
            warn!(field = %field, missing, "values not reported, kept as missing");
        }
    }

    Ok(TimeSeries::from_rows(rows))
}
