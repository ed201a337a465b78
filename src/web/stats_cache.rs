//! Cached aggregate counters for the dashboard and `/api/stats`.
//!
//! Per-board totals are scanned from the articles table; with hundreds of
//! thousands of rows that scan is too slow to run on every page view, so
//! results are cached in memory with a TTL and refreshed on demand.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use anyhow::Result;
use sqlx::SqlitePool;

use crate::db::{self, BoardStats};

/// A snapshot of per-board aggregates.
#[derive(Debug, Clone)]
pub struct CachedStats {
    pub boards: Vec<BoardStats>,
    cached_at: Instant,
}

impl CachedStats {
    /// Check if this cache entry is still valid.
    #[must_use]
    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() < ttl
    }

    #[must_use]
    pub fn total_articles(&self) -> i64 {
        self.boards.iter().map(|b| b.article_count).sum()
    }

    #[must_use]
    pub fn total_comments(&self) -> i64 {
        self.boards.iter().map(|b| b.comment_count).sum()
    }
}

/// Board stats cache with TTL.
pub struct StatsCache {
    cache: RwLock<Option<CachedStats>>,
    ttl: Duration,
}

impl StatsCache {
    /// Create a new stats cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: RwLock::new(None),
            ttl,
        }
    }

    /// Get stats from cache or fetch fresh data if expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh query fails.
    pub async fn get_or_refresh(&self, pool: &SqlitePool) -> Result<CachedStats> {
        {
            let cache = self.cache.read().unwrap();
            if let Some(ref stats) = *cache {
                if stats.is_valid(self.ttl) {
                    return Ok(stats.clone());
                }
            }
        }

        let fresh = CachedStats {
            boards: db::board_stats(pool).await?,
            cached_at: Instant::now(),
        };

        {
            let mut cache = self.cache.write().unwrap();
            *cache = Some(fresh.clone());
        }

        Ok(fresh)
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
