//! Crawling PTT boards into the document store.
//!
//! A crawl run walks listing pages and decides, per article URL, whether to
//! insert, merge, or skip. Pages and articles are processed strictly
//! sequentially with fixed pacing delays; PTT rate-limits aggressively and
//! the sequential design is the politeness contract, not an accident. Do
//! not parallelize fetches within a run.

pub mod fetch;
pub mod listing;
pub mod page_index;
pub mod parser;

use anyhow::Result;
use scraper::Html;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{BoardConfig, Config};
use crate::db::{
    apply_article_update, article_exists, delete_duplicates_by_url, get_comment_count,
    insert_articles, repair_poster_ips, Database, NewArticle,
};
use self::fetch::PttClient;
use self::page_index::PageIndexError;

/// Attempts at locating the index page's navigation link before giving up.
const MAX_RANGE_ATTEMPTS: u32 = 5;

/// Outcome counters for one crawled listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub page: i64,
    pub url: String,
    pub inserted: u64,
    pub updated: u64,
    pub ignored: u64,
}

/// Run the scheduled crawl loop forever.
///
/// Each tick sweeps the latest windows of every configured board, then runs
/// the maintenance passes (poster-IP repair, duplicate deletion).
pub async fn crawl_loop(config: Config, db: Database) {
    let client = match PttClient::new(config.retry_cooldown) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build crawl client: {e:#}");
            return;
        }
    };

    loop {
        for board in &config.boards {
            sweep_board(&client, &db, board, &config).await;
        }
        tokio::time::sleep(config.crawl_interval).await;
    }
}

/// One sweep of a board's latest windows plus maintenance.
async fn sweep_board(client: &PttClient, db: &Database, board: &BoardConfig, config: &Config) {
    let crawler_name = format!("{}_latest", board.name);

    for depth in 1..=config.latest_sweep_pages {
        if let Err(e) = crawl_board(client, db, board, depth, 1, &crawler_name, config).await {
            error!(board = %board.name, depth, "Crawl failed: {e:#}");
        }
    }

    match repair_poster_ips(db.pool(), &board.name).await {
        Ok(repaired) if repaired > 0 => {
            info!(board = %board.name, repaired, "Repaired poster IPs");
        }
        Ok(_) => {}
        Err(e) => error!(board = %board.name, "IP repair failed: {e:#}"),
    }

    match delete_duplicates_by_url(db.pool(), &board.name).await {
        Ok(deleted) if deleted > 0 => {
            info!(board = %board.name, deleted, "Deleted duplicate articles");
        }
        Ok(_) => {}
        Err(e) => error!(board = %board.name, "Duplicate deletion failed: {e:#}"),
    }
}

/// Crawl `pages` listing pages of a board, starting `pages_back` pages
/// before the latest (1 = the latest page itself).
///
/// # Errors
///
/// Fails when the page range cannot be resolved (navigation link missing
/// after retries, or the index page unreachable) or on a database error.
/// Per-article fetch and parse failures are logged and skipped.
pub async fn crawl_board(
    client: &PttClient,
    db: &Database,
    board: &BoardConfig,
    pages_back: i64,
    pages: i64,
    crawler_name: &str,
    config: &Config,
) -> Result<Vec<PageSummary>> {
    if pages > pages_back {
        anyhow::bail!("requested {pages} pages but the window is only {pages_back} pages deep");
    }

    let range = resolve_range_with_retries(client, &board.base_url, pages_back).await?;

    let mut summaries = Vec::new();
    for page in range.start_page..range.start_page + pages {
        let page_url = if page == range.latest_page {
            board.base_url.clone()
        } else {
            numbered_page_url(&board.base_url, page)
        };

        let summary = crawl_page(client, db, board, page, &page_url, config).await?;

        info!(
            crawler = crawler_name,
            current_page_url = %summary.url,
            crawling_data_insert = summary.inserted,
            crawling_data_update = summary.updated,
            crawling_data_ignore = summary.ignored,
            "Finished crawling page"
        );

        summaries.push(summary);
        client.pause(config.page_delay).await;
    }

    Ok(summaries)
}

async fn resolve_range_with_retries(
    client: &PttClient,
    base_url: &str,
    pages_back: i64,
) -> Result<page_index::PageRange> {
    for attempt in 1..=MAX_RANGE_ATTEMPTS {
        let html = client.fetch(base_url).await?;
        match page_index::resolve_page_range(&html, pages_back) {
            Ok(range) => return Ok(range),
            Err(e) => warn!(base_url, attempt, "{e}"),
        }
    }
    Err(PageIndexError::NavigationNotFound.into())
}

/// Walk one listing page's entries, applying the insert/update/skip state
/// machine per article.
async fn crawl_page(
    client: &PttClient,
    db: &Database,
    board: &BoardConfig,
    page: i64,
    page_url: &str,
    config: &Config,
) -> Result<PageSummary> {
    let mut summary = PageSummary {
        page,
        url: page_url.to_string(),
        inserted: 0,
        updated: 0,
        ignored: 0,
    };

    let html = match client.fetch(page_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(page_url, "Listing page fetch failed, skipping page: {e}");
            return Ok(summary);
        }
    };
    // Parse and drop the DOM before the first await below; extracted entries
    // are owned strings.
    let entries = {
        let doc = Html::parse_document(&html);
        listing::extract_entries(&doc)
    };

    let mut pending_inserts: Vec<NewArticle> = Vec::new();
    for entry in entries {
        if let Some(href) = entry.href {
            match article_url(page_url, &href) {
                Ok(article_url) => {
                    process_article(
                        client,
                        db,
                        board,
                        page,
                        article_url.as_str(),
                        &mut pending_inserts,
                        &mut summary,
                    )
                    .await?;
                }
                Err(e) => warn!(page_url, href = %href, "Skipping malformed article link: {e}"),
            }
        }
        client.pause(config.article_delay).await;
    }

    insert_articles(db.pool(), &board.name, &pending_inserts).await?;

    Ok(summary)
}

/// Decide and apply insert / update / skip for one article URL.
async fn process_article(
    client: &PttClient,
    db: &Database,
    board: &BoardConfig,
    page: i64,
    url: &str,
    pending_inserts: &mut Vec<NewArticle>,
    summary: &mut PageSummary,
) -> Result<()> {
    if !article_exists(db.pool(), &board.name, url).await? {
        let Some(parsed) = fetch_and_parse(client, url).await else {
            return Ok(());
        };
        debug!(url, "Insert");
        summary.inserted += 1;
        pending_inserts.push(parsed.into_new_article(url.to_string(), page));
        return Ok(());
    }

    let stored_count = get_comment_count(db.pool(), &board.name, url)
        .await?
        .unwrap_or(0);
    let Some(parsed) = fetch_and_parse(client, url).await else {
        return Ok(());
    };

    if parsed.total_comment_count() == stored_count {
        debug!(url, "Ignore");
        summary.ignored += 1;
        return Ok(());
    }

    debug!(url, "Update");
    apply_article_update(
        db.pool(),
        &board.name,
        url,
        parsed.counters(),
        &parsed.comments,
        stored_count,
    )
    .await?;
    summary.updated += 1;
    Ok(())
}

/// Fetch and parse one article; failures are logged and reported as `None`
/// so the caller can skip just this article.
async fn fetch_and_parse(client: &PttClient, url: &str) -> Option<parser::ParsedArticle> {
    let html = match client.fetch(url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url, "Article fetch failed: {e}");
            return None;
        }
    };
    match parser::parse_article(&html) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(url, "Article parse failed: {e}");
            None
        }
    }
}

fn article_url(page_url: &str, href: &str) -> Result<Url> {
    Ok(Url::parse(page_url)?.join(href)?)
}

/// Numbered listing URL: "…/index.html" → "…/index{page}.html".
fn numbered_page_url(base_url: &str, page: i64) -> String {
    let stem = base_url.strip_suffix(".html").unwrap_or(base_url);
    format!("{stem}{page}.html")
}
