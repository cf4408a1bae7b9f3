//! Run configuration, optionally loaded from a CONL file

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "covid19.conl";

const COUNTRY_URL: &str = "https://www.worldometers.info/coronavirus/country/{slug}/";
const OVERALL_URL: &str = "https://en.wikipedia.org/wiki/COVID-19_pandemic_by_country_and_territory";

/// (slug, display name as it appears in the aggregate table)
const DEFAULT_COUNTRIES: &[(&str, &str)] = &[
    ("us", "United States"),
    ("brazil", "Brazil"),
    ("russia", "Russia"),
    ("spain", "Spain"),
    ("italy", "Italy"),
    ("france", "France"),
    ("germany", "Germany"),
    ("turkey", "Turkey"),
    ("india", "India"),
    ("iran", "Iran"),
    ("peru", "Peru"),
    ("canada", "Canada"),
    ("chile", "Chile"),
    ("china", "China"),
    ("mexico", "Mexico"),
    ("saudi-arabia", "Saudi Arabia"),
    ("pakistan", "Pakistan"),
    ("belgium", "Belgium"),
    ("qatar", "Qatar"),
    ("bangladesh", "Bangladesh"),
    ("belarus", "Belarus"),
    ("ecuador", "Ecuador"),
    ("sweden", "Sweden"),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Country {
    /// URL path segment and file key, e.g. "saudi-arabia"
    pub slug: String,
    /// Name used by the aggregate table, e.g. "Saudi Arabia"
    pub name: String,
}

impl Country {
    pub fn new(slug: &str, name: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
        }
    }

    /// SQL table for this country ("saudi-arabia" -> "saudiarabia_stats")
    pub fn table_name(&self) -> String {
        format!("{}_stats", self.slug.replace('-', ""))
    }

    pub fn url(&self, template: &str) -> String {
        template.replace("{slug}", &self.slug)
    }
}

/// Where to find the totals table and how many footer cells to discard
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub table_id: String,
    pub trailing_cells: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table_id: "thetable".to_string(),
            trailing_cells: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Year injected into chart date tokens, which carry none
    pub year: Option<i32>,
    pub country_url: String,
    pub overall_url: String,
    pub data_dir: PathBuf,
    pub database: PathBuf,
    pub cache_dir: PathBuf,
    pub countries: Vec<Country>,
    pub table: TableLayout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            year: None,
            country_url: COUNTRY_URL.to_string(),
            overall_url: OVERALL_URL.to_string(),
            data_dir: PathBuf::from("Data"),
            database: PathBuf::from("covid19_stats.db"),
            cache_dir: PathBuf::from("cache"),
            countries: DEFAULT_COUNTRIES
                .iter()
                .map(|(slug, name)| Country::new(slug, name))
                .collect(),
            table: TableLayout::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or from `covid19.conl` if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => {
                let p = Path::new(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_conl(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn from_conl(content: &str) -> Result<Self> {
        Ok(serde_conl::from_str(content)?)
    }

    pub fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| Local::now().year())
    }

    /// Countries matching `slug`, or all of them
    pub fn select(&self, slug: Option<&str>) -> Vec<&Country> {
        self.countries
            .iter()
            .filter(|c| slug.map_or(true, |s| c.slug == s))
            .collect()
    }

    pub fn series_path(&self, country: &Country) -> PathBuf {
        self.data_dir
            .join(format!("covid19_{}_stats.csv", country.slug))
    }

    pub fn overall_path(&self) -> PathBuf {
        self.data_dir.join("covid19_overall_stat.csv")
    }
}
