use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// A single board to crawl: its logical partition name and index-page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Partition name under which records are stored (e.g. "gossiping").
    pub name: String,
    /// URL of the board's latest index page.
    pub base_url: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Crawler
    pub boards: Vec<BoardConfig>,
    pub crawl_enabled: bool,
    pub crawl_interval: Duration,
    /// How many pages-back windows each sweep walks (depth 1..=N, one page each).
    pub latest_sweep_pages: i64,
    pub article_delay: Duration,
    pub page_delay: Duration,
    pub retry_cooldown: Duration,

    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    pub stats_cache_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            boards: parse_boards(&required_env("BOARDS")?)?,
            crawl_enabled: parse_env_bool("CRAWL_ENABLED", true)?,
            crawl_interval: Duration::from_secs(parse_env_u64("CRAWL_INTERVAL_SECS", 600)?),
            latest_sweep_pages: parse_env_u64("LATEST_SWEEP_PAGES", 4)? as i64,
            article_delay: Duration::from_secs(parse_env_u64("ARTICLE_DELAY_SECS", 4)?),
            page_delay: Duration::from_secs(parse_env_u64("PAGE_DELAY_SECS", 9)?),
            retry_cooldown: Duration::from_secs(parse_env_u64("RETRY_COOLDOWN_SECS", 60)?),

            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/ptt.sqlite")),

            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
            stats_cache_ttl: Duration::from_secs(parse_env_u64("STATS_CACHE_TTL_SECS", 300)?),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boards.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "BOARDS".to_string(),
                message: "at least one board is required".to_string(),
            });
        }
        if self.latest_sweep_pages < 1 {
            return Err(ConfigError::InvalidValue {
                name: "LATEST_SWEEP_PAGES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration for tests: no boards, zero pacing, throwaway paths.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            boards: Vec::new(),
            crawl_enabled: false,
            crawl_interval: Duration::from_secs(600),
            latest_sweep_pages: 1,
            article_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            retry_cooldown: Duration::ZERO,
            database_path: PathBuf::from(":memory:"),
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            stats_cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Parse the `BOARDS` list.
///
/// Accepts comma-separated entries of either `Name` (expanded to the
/// canonical PTT index URL) or `name=url` for an explicit index URL.
fn parse_boards(value: &str) -> Result<Vec<BoardConfig>, ConfigError> {
    let mut boards = Vec::new();
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let board = match entry.split_once('=') {
            Some((name, url)) => BoardConfig {
                name: name.trim().to_lowercase(),
                base_url: url.trim().to_string(),
            },
            None => BoardConfig {
                name: entry.to_lowercase(),
                base_url: format!("https://www.ptt.cc/bbs/{entry}/index.html"),
            },
        };
        if board.name.is_empty() || board.base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "BOARDS".to_string(),
                message: format!("malformed board entry '{entry}'"),
            });
        }
        boards.push(board);
    }
    Ok(boards)
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boards_canonical() {
        let boards = parse_boards("Gossiping,HatePolitics").unwrap();
        assert_eq!(boards.len(), 2);
        assert_eq!(boards[0].name, "gossiping");
        assert_eq!(
            boards[0].base_url,
            "https://www.ptt.cc/bbs/Gossiping/index.html"
        );
        assert_eq!(boards[1].name, "hatepolitics");
    }

    #[test]
    fn test_parse_boards_explicit_url() {
        let boards = parse_boards("test=http://localhost:8080/bbs/Test/index.html").unwrap();
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].name, "test");
        assert_eq!(boards[0].base_url, "http://localhost:8080/bbs/Test/index.html");
    }

    #[test]
    fn test_parse_boards_skips_empty_entries() {
        let boards = parse_boards("Gossiping,,").unwrap();
        assert_eq!(boards.len(), 1);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_env_bool("NONEXISTENT_VAR", true).unwrap());
        assert!(!parse_env_bool("NONEXISTENT_VAR", false).unwrap());
    }

    #[test]
    fn test_validate_requires_boards() {
        let config = Config::for_testing();
        assert!(config.validate().is_err());
    }
}
