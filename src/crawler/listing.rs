//! Scanning a board listing page for article entries.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Matches both listing entries and the announcement separator so they can
/// be walked in document order.
static ENTRY_OR_SEP_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.r-ent, div.r-list-sep").expect("Invalid selector"));

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("Invalid selector"));

/// One listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Relative link to the article. Deleted articles render without one;
    /// the crawl loop skips those rows but they still count as processed.
    pub href: Option<String>,
}

/// Extract the listing entries to crawl, excluding pinned announcements.
///
/// Announcements sit at the tail of the page after an `r-list-sep` marker;
/// every entry following the marker is dropped.
#[must_use]
pub fn extract_entries(doc: &Html) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    let mut seen_separator = false;

    for node in doc.select(&ENTRY_OR_SEP_SELECTOR) {
        if node.value().classes().any(|c| c == "r-list-sep") {
            seen_separator = true;
            continue;
        }
        if seen_separator {
            continue;
        }
        let href = node
            .select(&LINK_SELECTOR)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(String::from);
        entries.push(ListingEntry { href });
    }

    entries
}
