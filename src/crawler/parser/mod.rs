//! Heuristic extraction of structured article records from PTT pages.
//!
//! PTT pages are server-rendered text with a thin HTML skeleton; the posting
//! software has changed its footer formats several times over the years and
//! a handful of historical pages carry corrupted timestamps. The extractors
//! here recover author/title/time, body text, poster IP, and the per-comment
//! fields from those inconsistently formatted pages.

mod comments;
mod content;
mod metadata;

pub use self::comments::CommentTally;
pub use self::metadata::ArticleMeta;

use chrono::NaiveDateTime;
use scraper::Html;
use thiserror::Error;

use crate::constants::TAIPEI_UTC_OFFSET_SECS;
use crate::db::{ArticleCounters, NewArticle, NewComment};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The author/title/time metadata block is missing or truncated.
    /// Nothing else on the page can be trusted, so the whole article is
    /// rejected (but the failure is reported, not raised).
    #[error("article metadata block is incomplete")]
    IncompleteMetadata,
}

/// A fully parsed article, detached from any storage concern.
#[derive(Debug, Clone)]
pub struct ParsedArticle {
    pub author: String,
    pub title: String,
    /// The publish time exactly as echoed on the page; the body extractor
    /// needs it verbatim to find where the body text starts.
    pub raw_time: String,
    pub published_at: i64,
    pub poster_ip: Option<String>,
    pub body_text: Option<String>,
    pub favor_count: i64,
    pub against_count: i64,
    pub neutral_count: i64,
    pub comments: Vec<NewComment>,
}

impl ParsedArticle {
    /// Total comment count; by construction equal to
    /// `favor_count + against_count + neutral_count`.
    #[must_use]
    pub fn total_comment_count(&self) -> i64 {
        self.comments.len() as i64
    }

    #[must_use]
    pub fn counters(&self) -> ArticleCounters {
        ArticleCounters {
            favor_count: self.favor_count,
            against_count: self.against_count,
            neutral_count: self.neutral_count,
            total_comment_count: self.total_comment_count(),
        }
    }

    /// Attach crawl context, producing a record ready for insertion.
    #[must_use]
    pub fn into_new_article(self, url: String, page_index: i64) -> NewArticle {
        NewArticle {
            url,
            page_index,
            author: Some(self.author),
            title: Some(self.title),
            published_at: Some(self.published_at),
            poster_ip: self.poster_ip,
            body_text: self.body_text,
            favor_count: self.favor_count,
            against_count: self.against_count,
            neutral_count: self.neutral_count,
            comments: self.comments,
        }
    }
}

/// Parse a full article page.
///
/// # Errors
///
/// Returns [`ParseError::IncompleteMetadata`] when the metadata block is
/// missing; all other malformations degrade to `None` fields or dropped
/// comments rather than errors.
pub fn parse_article(html: &str) -> Result<ParsedArticle, ParseError> {
    let doc = Html::parse_document(html);

    let meta = metadata::extract_metadata(&doc)?;
    let (body_text, poster_ip) = content::extract_content_and_ip(&doc, &meta.raw_time);
    let tally = comments::extract_comments(&doc, &meta.raw_time, meta.published_local);

    Ok(ParsedArticle {
        author: meta.author,
        title: meta.title,
        raw_time: meta.raw_time,
        published_at: meta.published_at,
        poster_ip,
        body_text,
        favor_count: tally.favor,
        against_count: tally.against,
        neutral_count: tally.neutral,
        comments: tally.comments,
    })
}

/// Convert a Taiwan-local wall-clock time to Unix seconds.
pub(crate) fn to_taipei_timestamp(local: NaiveDateTime) -> i64 {
    local.and_utc().timestamp() - TAIPEI_UTC_OFFSET_SECS
}
