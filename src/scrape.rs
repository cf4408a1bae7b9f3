//! Historical extraction: country page -> full time series -> CSV

use anyhow::{bail, Result};
use scraper::Html;
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::assemble::assemble;
use crate::blob::{clean, ChartLocator};
use crate::config::{Config, Country};
use crate::error::ExtractError;
use crate::extract::extract;
use crate::fetch::PageSource;
use crate::store::SeriesStore;
use crate::types::{Field, TimeSeries};

/// Pull every chart off a country page and assemble the series
pub fn extract_series(
    locator: &ChartLocator,
    html: &str,
    year: i32,
) -> Result<TimeSeries, ExtractError> {
    let page = Html::parse_document(html);

    let axis_blob = clean(&locator.blob(&page, Field::DateAxis.chart_index())?);
    let dates = extract(&axis_blob, Field::DateAxis)?;

    let mut fields = BTreeMap::new();
    for field in Field::STATS {
        let blob = clean(&locator.blob(&page, field.chart_index())?);
        fields.insert(field, extract(&blob, field)?);
    }

    assemble(&dates, &fields, year)
}

fn scrape_country(
    locator: &ChartLocator,
    source: &dyn PageSource,
    store: &dyn SeriesStore,
    config: &Config,
    country: &Country,
) -> Result<usize> {
    let html = source.fetch(&country.url(&config.country_url))?;
    let series = extract_series(locator, &html, config.year())?;
    store.write_series(country, &series)?;
    Ok(series.len())
}

/// Scrape history for all configured countries, or just `filter`.
/// A failing country is reported and skipped; the run fails at the end.
pub fn run_scrape(
    config: &Config,
    source: &dyn PageSource,
    store: &dyn SeriesStore,
    filter: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let countries = config.select(filter);
    if countries.is_empty() {
        bail!("No configured country matches {:?}", filter.unwrap_or_default());
    }

    let locator = ChartLocator::new()?;
    let total = countries.len();
    let mut failed = 0usize;

    for (i, country) in countries.iter().enumerate() {
        match scrape_country(&locator, source, store, config, country) {
            Ok(rows) => {
                info!(country = %country.slug, rows, "history extracted");
                if !quiet {
                    println!("[{}/{}] Scraped successfully: {} ({} days)", i + 1, total, country.slug, rows);
                }
            }
            Err(e) => {
                failed += 1;
                error!(country = %country.slug, "extraction failed: {:#}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} countries failed to scrape", failed, total);
    }
    Ok(())
}
