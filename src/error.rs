use chrono::NaiveDate;
use thiserror::Error;

use crate::types::Field;

/// Failures while pulling one country's chart data out of its page.
/// Any of these aborts that country only.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("chart container {index} not found on page")]
    MissingChart { index: usize },
    #[error("marker '{marker}' not found while extracting {field}")]
    MarkerNotFound { field: Field, marker: &'static str },
    #[error("no values between markers for {field}")]
    EmptySpan { field: Field },
    #[error("{field} has {found} values but the date axis has {expected}")]
    Alignment {
        field: Field,
        expected: usize,
        found: usize,
    },
    #[error("unrecognised date token '{token}'")]
    BadDate { token: String },
}

/// Structural failures in the aggregate table. These abort the whole run.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table '#{id}' not found on page")]
    TableNotFound { id: String },
    #[error("{cells} cells do not split into rows of {columns} columns")]
    SchemaMismatch { cells: usize, columns: usize },
    #[error("table has {rows} data rows but {countries} country names")]
    RowCountMismatch { rows: usize, countries: usize },
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("series is empty, nothing to extend")]
    EmptySeries,
    #[error("last row is dated {last}, after {today}")]
    FutureRow { last: NaiveDate, today: NaiveDate },
}
