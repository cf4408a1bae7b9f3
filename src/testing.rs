//! Fixtures shared by unit tests

use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::Country;
use crate::fetch::PageSource;
use crate::store::SeriesStore;
use crate::types::TimeSeries;

/// Pages served from memory, keyed by URL
#[derive(Default)]
pub struct FixturePages {
    pages: HashMap<String, String>,
}

impl FixturePages {
    pub fn insert(&mut self, url: &str, html: &str) {
        self.pages.insert(url.to_string(), html.to_string());
    }
}

impl PageSource for FixturePages {
    fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture for {}", url))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    series: RefCell<HashMap<String, TimeSeries>>,
}

impl MemoryStore {
    pub fn get(&self, slug: &str) -> Option<TimeSeries> {
        self.series.borrow().get(slug).cloned()
    }

    pub fn put(&self, slug: &str, series: TimeSeries) {
        self.series.borrow_mut().insert(slug.to_string(), series);
    }
}

impl SeriesStore for MemoryStore {
    fn read_series(&self, country: &Country) -> Result<TimeSeries> {
        self.get(&country.slug)
            .ok_or_else(|| anyhow!("no series for {}", country.slug))
    }

    fn write_series(&self, country: &Country, series: &TimeSeries) -> Result<()> {
        self.put(&country.slug, series.clone());
        Ok(())
    }
}

fn line_chart(id: &str, dates: &[&str], values: &[&str]) -> String {
    format!(
        r#"Highcharts.chart('{id}', {{
    chart: {{ type: 'line' }},
    xAxis: {{ categories: [{dates}] }},
    yAxis: {{ title: {{ text: 'Cases' }} }},
    series: [{{ name: 'Cases', color: '#33CCFF', data: [{values}] }}],
    responsive: {{ rules: [] }}
}});"#,
        id = id,
        dates = spaced_dates(dates),
        values = values.join(","),
    )
}

fn bar_chart(id: &str, dates: &[&str], values: &[&str]) -> String {
    format!(
        r#"Highcharts.chart('{id}', {{
    chart: {{ type: 'column' }},
    xAxis: {{ categories: [{dates}] }},
    yAxis: {{ title: {{ text: 'Daily' }} }},
    series: [{{ name: 'Daily', data: [{values}] }},
             {{ name: '7-day moving average', data: [{values}] }}],
    responsive: {{}}
}});"#,
        id = id,
        dates = spaced_dates(dates),
        values = values.join(","),
    )
}

/// "Mar14" -> "\"Mar 14\"", the way the charts print their axis
fn spaced_dates(dates: &[&str]) -> String {
    dates
        .iter()
        .map(|d| {
            let split = d.find(|c: char| c.is_ascii_digit()).unwrap_or(d.len());
            format!("\"{} {}\"", &d[..split], &d[split..])
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// A country page with five charts in the order the site uses:
/// total cases, daily cases, active cases, total deaths, daily deaths
pub fn chart_page(dates: &[&str], series: &[&[&str]]) -> String {
    let ids = [
        "coronavirus-cases-linear",
        "graph-cases-daily",
        "graph-active-cases-total",
        "coronavirus-deaths-linear",
        "graph-deaths-daily",
    ];
    let mut body = String::new();
    for (i, (id, values)) in ids.iter().zip(series).enumerate() {
        let script = if i == 1 || i == 4 {
            bar_chart(id, dates, values)
        } else {
            line_chart(id, dates, values)
        };
        body.push_str(&format!(
            "<div class=\"col-md-12\"><div id=\"{}\"></div><script>{}</script></div>\n",
            id, script
        ));
    }
    format!("<html><body>{}</body></html>", body)
}

/// The "latest updates" block of a country page
pub fn news_page(date: &str, cases: &str, deaths: &str) -> String {
    format!(
        r#"<html><body>
<div class="news_date"><h4>{date}</h4></div>
<ul><li class="news_li"><strong>{cases}</strong> and <strong>{deaths}</strong> in Qatar</li></ul>
</body></html>"#,
        date = date,
        cases = cases,
        deaths = deaths,
    )
}
