//! Resolving absolute page numbers from a board's paginated index.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use thiserror::Error;

static NAV_BUTTON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.btn.wide").expect("Invalid selector"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageIndexError {
    /// The "previous page" navigation link is missing or malformed. Without
    /// it the page range cannot be computed, which is fatal for the crawl
    /// invocation.
    #[error("previous page navigation link not found")]
    NavigationNotFound,
}

/// Absolute page numbers for one crawl window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// The board's newest page number.
    pub latest_page: i64,
    /// First page of the requested window.
    pub start_page: i64,
}

/// Compute the page range for a "pages back from latest" request.
///
/// The index page's "previous page" button links to the second-to-latest
/// page; its URL embeds that page number between `index` and `.html`.
///
/// # Errors
///
/// Returns [`PageIndexError::NavigationNotFound`] when the link cannot be
/// located or its number cannot be read.
pub fn resolve_page_range(html: &str, pages_back: i64) -> Result<PageRange, PageIndexError> {
    let doc = Html::parse_document(html);

    let prev_href = doc
        .select(&NAV_BUTTON_SELECTOR)
        .nth(1)
        .and_then(|el| el.value().attr("href"))
        .ok_or(PageIndexError::NavigationNotFound)?;

    let prev_page = embedded_page_number(prev_href).ok_or(PageIndexError::NavigationNotFound)?;

    let latest_page = prev_page + 1;
    Ok(PageRange {
        latest_page,
        start_page: latest_page - (pages_back - 1),
    })
}

/// Digits between `index` and `.html` in a listing URL.
fn embedded_page_number(href: &str) -> Option<i64> {
    let start = href.find("index")? + "index".len();
    let end = href.find(".html")?;
    href.get(start..end)?.parse().ok()
}
