//! Splitting the page body into user content and poster IP.
//!
//! The posting software marks "end of user content / begin of system
//! metadata" with a footer line, but has emitted several variants of it
//! over the years. Extraction tries a fixed, ordered table of footer
//! delimiters; the first one that splits the page text into exactly two
//! parts wins.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static MAIN_CONTENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div#main-content").expect("Invalid selector"));

/// How the poster IP is recovered from the text after the footer delimiter.
#[derive(Debug, Clone, Copy)]
enum IpRule {
    /// First space-delimited token, trimmed. The footer reads
    /// "…來自: 140.114.57.56 (台灣)".
    FirstToken,
    /// Second space token with its leading character stripped. The edit
    /// footer reads "※ 編輯: user (1.2.3.4 臺灣), …", so the IP arrives
    /// wrapped in an opening parenthesis.
    SecondTokenStripLead,
}

/// Known footer variants, most specific/common first. Order matters: the
/// later plain 發信站 marker is a substring of the first and third entries.
const FOOTER_DELIMITERS: &[(&str, IpRule)] = &[
    (
        "--\n※ 發信站: 批踢踢實業坊(ptt.cc), 來自: ",
        IpRule::FirstToken,
    ),
    ("--\n※ 編輯: ", IpRule::SecondTokenStripLead),
    (
        "--\n\n※ 發信站: 批踢踢實業坊(ptt.cc), 來自: ",
        IpRule::FirstToken,
    ),
    ("※ 發信站: 批踢踢實業坊(ptt.cc), 來自: ", IpRule::FirstToken),
];

/// Extract `(body_text, poster_ip)` from the page.
///
/// Returns `(None, None)` when no delimiter produces exactly two parts or
/// the echoed publish time cannot be located; never fails.
#[must_use]
pub fn extract_content_and_ip(doc: &Html, raw_time: &str) -> (Option<String>, Option<String>) {
    let Some(main) = doc.select(&MAIN_CONTENT_SELECTOR).next() else {
        return (None, None);
    };
    let text: String = main.text().collect();

    for (marker, rule) in FOOTER_DELIMITERS {
        let Some((head, tail)) = split_exactly_once(&text, marker) else {
            continue;
        };

        // Everything up to and including the echoed publish time is the
        // metadata header, not body text.
        let Some((_, body)) = head.split_once(raw_time) else {
            return (None, None);
        };

        let ip = match rule {
            IpRule::FirstToken => tail.split(' ').next().map(str::trim).map(String::from),
            IpRule::SecondTokenStripLead => tail.split(' ').nth(1).map(|token| {
                let mut chars = token.chars();
                chars.next();
                chars.as_str().to_string()
            }),
        };
        let Some(ip) = ip else {
            return (None, None);
        };

        return (Some(body.to_string()), Some(ip));
    }

    (None, None)
}

/// Split on `marker` only when it occurs exactly once.
fn split_exactly_once<'a>(text: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let (head, tail) = text.split_once(marker)?;
    if tail.contains(marker) {
        return None;
    }
    Some((head, tail))
}
