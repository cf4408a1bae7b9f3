//! Cross-country totals table (cases, deaths, recoveries per country)

use anyhow::Result;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::config::{Config, TableLayout};
use crate::error::SchemaError;
use crate::fetch::PageSource;
use crate::store::CsvStore;
use crate::types::{AggregateColumn, AggregateEntry, AggregateSnapshot};
use crate::utils::selector;

/// Data columns per country row
pub const COLUMNS: usize = AggregateColumn::ALL.len();

/// A data cell as scraped, before chunking into rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Value(String),
    /// Rendered as a "no data" badge instead of a number
    Placeholder,
}

impl Cell {
    fn count(&self) -> Option<i64> {
        match self {
            Cell::Value(s) => s.replace(',', "").trim().parse().ok(),
            Cell::Placeholder => None,
        }
    }
}

/// Country names and the flat cell list of the totals table
#[derive(Debug, Clone, Default)]
pub struct ScrapedTable {
    pub countries: Vec<String>,
    pub cells: Vec<Cell>,
}

pub struct TableParser {
    layout: TableLayout,
    table: Selector,
    row_header: Selector,
    anchor: Selector,
    cell: Selector,
    footnote: Selector,
    badge: Selector,
}

impl TableParser {
    pub fn new(layout: TableLayout) -> Result<Self> {
        let table = selector(&format!("table#{}", layout.table_id))?;
        Ok(Self {
            layout,
            table,
            row_header: selector(r#"th[scope="row"]"#)?,
            anchor: selector("a")?,
            cell: selector("td")?,
            footnote: selector("sup")?,
            badge: selector("span")?,
        })
    }

    pub fn parse(&self, html: &str) -> Result<ScrapedTable, SchemaError> {
        let document = Html::parse_document(html);
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| SchemaError::TableNotFound {
                id: self.layout.table_id.clone(),
            })?;

        let countries = table
            .select(&self.row_header)
            .filter_map(|th| th.select(&self.anchor).next())
            .filter_map(|a| a.text().next())
            .map(|name| name.trim().to_string())
            .collect();

        let mut cells = Vec::new();
        for td in table.select(&self.cell) {
            // footnote reference columns are not data
            if td.select(&self.footnote).next().is_some() {
                continue;
            }
            if td.select(&self.badge).next().is_some() {
                cells.push(Cell::Placeholder);
                continue;
            }
            let text = td.text().next().unwrap_or_default();
            cells.push(Cell::Value(text.trim_end().to_string()));
        }

        let keep = cells.len().saturating_sub(self.layout.trailing_cells);
        cells.truncate(keep);

        Ok(ScrapedTable { countries, cells })
    }
}

/// Group the flat cell list into per-country rows.
///
/// Unparseable and placeholder cells become zero and are flagged absent.
pub fn build(table: &ScrapedTable, as_of: NaiveDate) -> Result<AggregateSnapshot, SchemaError> {
    if table.cells.len() % COLUMNS != 0 {
        return Err(SchemaError::SchemaMismatch {
            cells: table.cells.len(),
            columns: COLUMNS,
        });
    }
    let rows = table.cells.len() / COLUMNS;
    if rows != table.countries.len() {
        return Err(SchemaError::RowCountMismatch {
            rows,
            countries: table.countries.len(),
        });
    }

    let mut snapshot = AggregateSnapshot::new(as_of);
    for (country, chunk) in table.countries.iter().zip(table.cells.chunks(COLUMNS)) {
        let mut entry = AggregateEntry::default();
        for (column, cell) in AggregateColumn::ALL.iter().zip(chunk) {
            entry.set(*column, cell.count());
        }
        if !entry.absent.is_empty() {
            debug!(country = %country, absent = entry.absent.len(), "aggregate columns without data");
        }
        if snapshot.entries.contains_key(country) {
            warn!(country = %country, "country listed twice in aggregate table, keeping the first row");
            continue;
        }
        snapshot.entries.insert(country.clone(), entry);
    }

    Ok(snapshot)
}

/// Rebuild the aggregate table from scratch and overwrite the stored copy
pub fn run_overall(
    config: &Config,
    source: &dyn PageSource,
    store: &CsvStore,
    today: NaiveDate,
) -> Result<AggregateSnapshot> {
    let html = source.fetch(&config.overall_url)?;
    let table = TableParser::new(config.table.clone())?.parse(&html)?;
    let snapshot = build(&table, today)?;
    if snapshot.is_empty() {
        warn!("aggregate table has no country rows");
    }
    store.write_aggregate(&snapshot)?;

    info!(countries = snapshot.len(), "aggregate table rebuilt");
    println!("Successfully scraped table ({} countries)", snapshot.len());
    Ok(snapshot)
}
