use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Anything that can hand back the text of a page
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP client with a per-day response cache, so a run can be
/// repeated the same day without hitting the sites again.
pub struct CachedClient {
    client: reqwest::blocking::Client,
    cache_dir: Option<PathBuf>,
}

impl CachedClient {
    /// `cache_root` of `None` disables caching
    pub fn new(cache_root: Option<&Path>, day: NaiveDate) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; Covid19StatsScraper/1.0)")
            .build()?;
        let cache_dir = cache_root.map(|root| root.join(day.format("%Y-%m-%d").to_string()));
        Ok(Self { client, cache_dir })
    }

    fn url_to_cache_path(&self, url: &str) -> Option<PathBuf> {
        let cache_dir = self.cache_dir.as_ref()?;
        // Strip query params and protocol, use as path
        let url = url.split('?').next().unwrap_or(url);
        let stripped = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let stripped = stripped.trim_end_matches('/');
        Some(cache_dir.join(stripped).with_extension("html"))
    }
}

impl PageSource for CachedClient {
    fn fetch(&self, url: &str) -> Result<String> {
        let cache_path = self.url_to_cache_path(url);

        if let Some(path) = cache_path.as_ref().filter(|p| p.exists()) {
            debug!(url, path = %path.display(), "page served from cache");
            return fs::read_to_string(path)
                .with_context(|| format!("Failed to read cache: {:?}", path));
        }

        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch: {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status from: {}", url))?;

        let text = response
            .text()
            .with_context(|| format!("Failed to read response: {}", url))?;

        if let Some(path) = cache_path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &text)?;
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_is_per_day() {
        let day = NaiveDate::from_ymd_opt(2020, 5, 28).unwrap();
        let client = CachedClient::new(Some(Path::new("cache")), day).unwrap();
        assert_eq!(
            client.url_to_cache_path("https://www.worldometers.info/coronavirus/country/us/?x=1"),
            Some(PathBuf::from(
                "cache/2020-05-28/www.worldometers.info/coronavirus/country/us.html"
            ))
        );
    }

    #[test]
    fn test_cache_disabled() {
        let day = NaiveDate::from_ymd_opt(2020, 5, 28).unwrap();
        let client = CachedClient::new(None, day).unwrap();
        assert_eq!(client.url_to_cache_path("https://example.com/a"), None);
    }

    #[test]
    fn test_cached_page_is_served_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let day = NaiveDate::from_ymd_opt(2020, 5, 28).unwrap();
        let client = CachedClient::new(Some(dir.path()), day).unwrap();
        let path = dir.path().join("2020-05-28/example.invalid/page.html");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<html>cached</html>").unwrap();

        assert_eq!(
            client.fetch("https://example.invalid/page").unwrap(),
            "<html>cached</html>"
        );
    }
}
