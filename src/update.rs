//! Daily update: today's announced figures folded into each stored series

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use scraper::{Html, Selector};
use tracing::{error, info, warn};

use crate::config::{Config, Country};
use crate::fetch::PageSource;
use crate::reconcile::{reconcile, CrossReference, UpdateState};
use crate::store::SeriesStore;
use crate::types::{AggregateSnapshot, DailyDelta};
use crate::utils::{digits_only, selector};

/// Reads the "latest updates" block of a country page
pub struct NewsParser {
    news_date: Selector,
    news_item: Selector,
    strong: Selector,
}

impl NewsParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            news_date: selector("div.news_date h4")?,
            news_item: selector("li.news_li")?,
            strong: selector("strong")?,
        })
    }

    /// Date of the newest update block, e.g. "May 27 (GMT)"
    pub fn page_date(&self, page: &Html, year: i32) -> Result<NaiveDate> {
        let text: String = page
            .select(&self.news_date)
            .next()
            .ok_or_else(|| anyhow!("update date not found on page"))?
            .text()
            .collect();
        let text = text.split('(').next().unwrap_or_default().trim();
        NaiveDate::parse_from_str(&format!("{} {}", text, year), "%b %d %Y")
            .with_context(|| format!("Unrecognised update date '{}'", text))
    }

    /// Today's new cases/deaths, or `None` if the page has not been updated today
    pub fn delta(&self, html: &str, today: NaiveDate) -> Result<Option<DailyDelta>> {
        let page = Html::parse_document(html);
        if self.page_date(&page, today.year())? != today {
            return Ok(None);
        }

        let item = page
            .select(&self.news_item)
            .next()
            .ok_or_else(|| anyhow!("update block not found on page"))?;
        let figures: Vec<String> = item.select(&self.strong).map(|s| s.text().collect()).collect();

        Ok(Some(DailyDelta {
            new_cases: figures.first().and_then(|f| parse_figure(f)),
            new_deaths: figures.get(1).and_then(|f| parse_figure(f)),
        }))
    }
}

/// "1,234 new cases" -> 1234. Anything not announcing "new" figures is missing.
fn parse_figure(text: &str) -> Option<i64> {
    if !text.contains("new") {
        return None;
    }
    digits_only(text).parse().ok()
}

fn update_country(
    news: &NewsParser,
    source: &dyn PageSource,
    store: &dyn SeriesStore,
    snapshot: &AggregateSnapshot,
    config: &Config,
    country: &Country,
    today: NaiveDate,
) -> Result<bool> {
    let html = source.fetch(&country.url(&config.country_url))?;
    let delta = news.delta(&html, today)?;
    let series = store.read_series(country)?;

    let cross = CrossReference {
        entry: snapshot.get(&country.name),
        as_of: snapshot.as_of,
    };
    let out = reconcile(&series, delta, cross, today)?;
    if let Some(stale) = out.stale {
        warn!(
            country = %country.slug,
            as_of = %stale.as_of,
            "active cases derived from an aggregate table older than today"
        );
    }
    if out.appended {
        store.write_series(country, &out.series)?;
    }
    Ok(out.state == UpdateState::Updated)
}

/// Reconcile every configured country against `snapshot`
pub fn run_update(
    config: &Config,
    source: &dyn PageSource,
    store: &dyn SeriesStore,
    snapshot: &AggregateSnapshot,
    today: NaiveDate,
) -> Result<()> {
    let news = NewsParser::new()?;

    let mut failed = 0usize;
    for country in &config.countries {
        match update_country(&news, source, store, snapshot, config, country, today) {
            Ok(true) => {
                info!(country = %country.slug, "series updated");
                println!("Successfully updated: {}", country.slug);
            }
            Ok(false) => println!("No updates: {}", country.slug),
            Err(e) => {
                failed += 1;
                error!(country = %country.slug, "update failed: {:#}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} countries failed to update", failed, config.countries.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{news_page, FixturePages, MemoryStore};
    use crate::types::{AggregateEntry, TimeSeries, TimeSeriesRow};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 5, 28).unwrap()
    }

    #[test]
    fn test_parse_figure() {
        assert_eq!(parse_figure("1,751 new cases"), Some(1751));
        assert_eq!(parse_figure("15 new deaths"), Some(15));
        assert_eq!(parse_figure("1 death"), None);
        assert_eq!(parse_figure(""), None);
    }

    #[test]
    fn test_delta_published_today() {
        let news = NewsParser::new().unwrap();
        let html = news_page("May 28 (GMT)", "1,751 new cases", "15 new deaths");
        assert_eq!(
            news.delta(&html, today()).unwrap(),
            Some(DailyDelta {
                new_cases: Some(1751),
                new_deaths: Some(15)
            })
        );
    }

    #[test]
    fn test_delta_without_new_deaths() {
        let news = NewsParser::new().unwrap();
        let html = news_page("May 28 (GMT)", "1,751 new cases", "Qatar");
        assert_eq!(
            news.delta(&html, today()).unwrap(),
            Some(DailyDelta {
                new_cases: Some(1751),
                new_deaths: None
            })
        );
    }

    #[test]
    fn test_stale_page_has_no_delta() {
        let news = NewsParser::new().unwrap();
        let html = news_page("May 27 (GMT)", "1,751 new cases", "15 new deaths");
        assert_eq!(news.delta(&html, today()).unwrap(), None);
    }

    #[test]
    fn test_unreadable_date_is_an_error() {
        let news = NewsParser::new().unwrap();
        assert!(news.delta("<html><body></body></html>", today()).is_err());
        let html = news_page("yesterday", "1 new case", "");
        assert!(news.delta(&html, today()).is_err());
    }

    fn seeded_store(config: &Config) -> MemoryStore {
        let store = MemoryStore::default();
        for country in &config.countries {
            let mut row = TimeSeriesRow::empty(NaiveDate::from_ymd_opt(2020, 5, 27).unwrap());
            row.total_cases = Some(100);
            row.total_deaths = Some(10);
            store.put(&country.slug, TimeSeries::from_rows(vec![row]));
        }
        store
    }

    #[test]
    fn test_run_update_appends_once() {
        let config = Config {
            countries: vec![Country::new("qatar", "Qatar")],
            ..Config::default()
        };
        let mut pages = FixturePages::default();
        pages.insert(
            &config.countries[0].url(&config.country_url),
            &news_page("May 28 (GMT)", "5 new cases", "1 new death"),
        );
        let store = seeded_store(&config);
        let mut snapshot = AggregateSnapshot::new(today());
        snapshot.entries.insert(
            "Qatar".to_string(),
            AggregateEntry {
                total_cases: 105,
                total_deaths: 10,
                total_recoveries: 50,
                absent: vec![],
            },
        );

        run_update(&config, &pages, &store, &snapshot, today()).unwrap();
        run_update(&config, &pages, &store, &snapshot, today()).unwrap();

        let series = store.get("qatar").unwrap();
        assert_eq!(series.len(), 2);
        let row = series.last().unwrap();
        assert_eq!(row.total_cases, Some(105));
        assert_eq!(row.total_deaths, Some(11));
        assert_eq!(row.active_cases, Some(45));
    }

    #[test]
    fn test_run_update_continues_past_failures() {
        let config = Config {
            countries: vec![Country::new("chile", "Chile"), Country::new("qatar", "Qatar")],
            ..Config::default()
        };
        let mut pages = FixturePages::default();
        pages.insert(
            &config.countries[1].url(&config.country_url),
            &news_page("May 28 (GMT)", "5 new cases", "1 new death"),
        );
        let store = seeded_store(&config);
        let snapshot = AggregateSnapshot::new(today());

        assert!(run_update(&config, &pages, &store, &snapshot, today()).is_err());
        assert_eq!(store.get("chile").unwrap().len(), 1);
        assert_eq!(store.get("qatar").unwrap().len(), 2);
    }
}
