//! Locating chart initialisation scripts on a country page and flattening them
//! into a single marker-friendly line.
//!
//! Known limitation: nothing is escaped. A value that itself contains a quote,
//! slash, colon or bracket is mangled by [`clean`] and there is no way to
//! recover it afterwards.

use anyhow::Result;
use scraper::{Html, Selector};

use crate::error::ExtractError;
use crate::utils::selector;

/// Finds the Nth chart container on a country page and returns its script text
pub struct ChartLocator {
    container: Selector,
    script: Selector,
}

impl ChartLocator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            container: selector("div.col-md-12")?,
            script: selector("script")?,
        })
    }

    /// Raw script text of the chart container at `index` (zero-based)
    pub fn blob(&self, page: &Html, index: usize) -> Result<String, ExtractError> {
        let container = page
            .select(&self.container)
            .nth(index)
            .ok_or(ExtractError::MissingChart { index })?;
        let script = container
            .select(&self.script)
            .next()
            .ok_or(ExtractError::MissingChart { index })?;
        Ok(script.text().collect())
    }
}

/// Strip whitespace, quotes and comment characters; turn structural
/// punctuation into single spaces. No space is emitted right after a comma,
/// so `}, { name` comes out as `,name`.
pub fn clean(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        match c {
            c if c.is_whitespace() => {}
            '\'' | '"' | '\\' | '/' | '*' => {}
            '{' | '}' | '[' | ']' | '(' | ')' | ':' => pending_space = true,
            _ => {
                if pending_space && !out.is_empty() && !out.ends_with(',') {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }

    out
}
