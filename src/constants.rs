//! Shared constants used across the application.

/// Pool of realistic browser user agents for crawl requests.
///
/// PTT throttles clients that hammer it with a single identity; the crawler
/// picks one of these at session start and rotates to a fresh one whenever a
/// fetch has to be retried.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.2151.97",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Path of the age-verification consent endpoint, relative to the site origin.
pub const OVER18_CONSENT_PATH: &str = "/ask/over18";

/// Offset of Taiwan time from UTC, in seconds.
///
/// PTT renders all times as Taiwan wall-clock time. Taiwan has not observed
/// daylight saving since 1979, so a fixed offset is sufficient.
pub const TAIPEI_UTC_OFFSET_SECS: i64 = 8 * 3600;

/// Returns a random user agent from the pool.
#[must_use]
pub fn random_user_agent() -> &'static str {
    use rand::seq::SliceRandom;
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}
