//! Extraction of per-comment records (the "push" lines).
//!
//! A push line renders as reaction glyph, commenter id, comment text, and a
//! trailing "IP month/day HH:MM" fragment. The site only records minute
//! granularity, a few historical pages carry truncated or corrupted time
//! fragments, and an author's signature can embed push lines quoted from
//! another article; each case gets a documented repair or skip below.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::to_taipei_timestamp;
use crate::db::{NewComment, ReactionTag};

static PUSH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.push").expect("Invalid selector"));
static TAG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.push-tag").expect("Invalid selector"));
static USERID_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.push-userid").expect("Invalid selector"));
static CONTENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.push-content").expect("Invalid selector"));
static IPDATETIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.push-ipdatetime").expect("Invalid selector"));

/// Comment time fragment format after reconstruction, e.g. "2023-10-21 01:04".
const COMMENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The site records comment times at minute granularity; timestamps are
/// biased to the end of that minute. Stored data depends on this convention,
/// so it must not change.
const MINUTE_END_BIAS_SECS: i64 = 59;

/// Corrections for specific historical pages whose time fragment is
/// corrupted beyond parsing. A lookup table, not general repair logic.
const KNOWN_TIME_REPAIRS: &[(&str, &str)] = &[("02:l1", "02:10")];

/// Counted reactions plus the extracted comments.
///
/// Counters are tallied only for comments that are actually emitted, so
/// `favor + against + neutral == comments.len()` always holds.
#[derive(Debug, Default)]
pub struct CommentTally {
    pub favor: i64,
    pub against: i64,
    pub neutral: i64,
    pub comments: Vec<NewComment>,
}

/// Extract all comments of an article page.
pub fn extract_comments(
    doc: &Html,
    raw_time: &str,
    published_local: NaiveDateTime,
) -> CommentTally {
    let mut tally = CommentTally::default();
    let mut last_resolved_local: Option<NaiveDateTime> = None;

    for node in doc.select(&PUSH_SELECTOR) {
        // System warning boxes reuse the push markup but are not comments.
        if node.value().classes().any(|c| c == "warning-box") {
            continue;
        }

        let Some(ipdatetime) = first_text(node, &IPDATETIME_SELECTOR) else {
            continue;
        };
        let trimmed = ipdatetime.trim().to_string();
        let tokens: Vec<&str> = trimmed.split(' ').collect();

        // An author's signature sometimes embeds push lines quoted from
        // another article; those render without the full metadata fragment.
        if tokens.len() < 3 {
            continue;
        }

        let Some(commenter_id) = first_text(node, &USERID_SELECTOR) else {
            continue;
        };
        let glyph = first_text(node, &TAG_SELECTOR).unwrap_or_default();
        let reaction = ReactionTag::from_glyph(glyph.trim());

        let mut commenter_ip = None;
        let mut commented_at = None;
        if tokens.len() == 3 {
            commenter_ip = Some(tokens[0].to_string());
            match resolve_comment_time(
                raw_time,
                tokens[1],
                tokens[2],
                last_resolved_local,
                published_local,
            ) {
                Some(local) => {
                    last_resolved_local = Some(local);
                    commented_at = Some(to_taipei_timestamp(local) + MINUTE_END_BIAS_SECS);
                }
                // Unrepairable legacy fragment: drop this single comment,
                // siblings are unaffected.
                None => continue,
            }
        }

        let content = first_text(node, &CONTENT_SELECTOR)
            .unwrap_or_default()
            .trim_matches(|c| c == ':' || c == ' ')
            .to_string();

        match reaction {
            ReactionTag::Agree => tally.favor += 1,
            ReactionTag::Disagree => tally.against += 1,
            ReactionTag::Neutral => tally.neutral += 1,
        }

        tally.comments.push(NewComment {
            commenter_id,
            commenter_ip,
            reaction,
            commented_at,
            content,
        });
    }

    tally
}

/// Reconstruct a comment's Taiwan-local wall-clock time from the article's
/// publish year, the "month/day" token and the "HH:MM" token.
fn resolve_comment_time(
    raw_time: &str,
    month_day: &str,
    time_token: &str,
    last_resolved_local: Option<NaiveDateTime>,
    published_local: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let (month, day) = month_day.split_once('/')?;
    let year = raw_time
        .get(raw_time.len().saturating_sub(4)..)
        .unwrap_or(raw_time);

    let mut time_frag: String = time_token.trim().to_string();

    // Some pages append stray characters to the time; keep the HH:MM head.
    if time_frag.chars().count() != 5 {
        time_frag = time_frag.chars().take(5).collect();
    }
    // A rendering defect can swallow part of the minutes. Borrow the
    // previous resolved comment's time-of-day, else the publish time-of-day.
    if time_frag.chars().count() < 5 {
        time_frag = last_resolved_local
            .unwrap_or(published_local)
            .format("%H:%M")
            .to_string();
    }
    for (bad, good) in KNOWN_TIME_REPAIRS {
        if time_frag == *bad {
            time_frag = (*good).to_string();
        }
    }

    NaiveDateTime::parse_from_str(
        &format!("{year}-{month}-{day} {time_frag}"),
        COMMENT_TIME_FORMAT,
    )
    .ok()
}

fn first_text(node: ElementRef<'_>, selector: &Selector) -> Option<String> {
    node.select(selector)
        .next()
        .map(|el| el.text().collect::<String>())
}
