//! Maud page renderers for the dashboard.

mod article;
mod board;
mod home;

pub use self::article::render_article_page;
pub use self::board::{render_board_page, BoardPageData};
pub use self::home::render_home_page;

use chrono::{FixedOffset, TimeZone};

use crate::constants::TAIPEI_UTC_OFFSET_SECS;

/// Render a Unix timestamp as Taiwan-local wall-clock time.
pub(crate) fn format_taipei(ts: Option<i64>) -> String {
    let Some(ts) = ts else {
        return "-".to_string();
    };
    FixedOffset::east_opt(TAIPEI_UTC_OFFSET_SECS as i32)
        .and_then(|offset| offset.timestamp_opt(ts, 0).single())
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}
