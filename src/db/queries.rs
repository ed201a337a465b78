use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::models::{
    Article, ArticleCounters, BoardStats, Comment, CommenterActivity, HourlyActivity, NewArticle,
    NewComment,
};
use crate::constants::TAIPEI_UTC_OFFSET_SECS;

// ========== Crawl-side store interface ==========

/// Check whether an article with this URL has already been persisted.
pub async fn article_exists(pool: &SqlitePool, board: &str, url: &str) -> Result<bool> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM articles WHERE board = ? AND url = ? LIMIT 1")
            .bind(board)
            .bind(url)
            .fetch_optional(pool)
            .await
            .context("Failed to check article existence")?;

    Ok(row.is_some())
}

/// Insert a batch of freshly parsed articles with their comments.
///
/// Articles and their comments land in one transaction so readers never see
/// an article whose counters disagree with its comment rows.
pub async fn insert_articles(pool: &SqlitePool, board: &str, articles: &[NewArticle]) -> Result<u64> {
    if articles.is_empty() {
        return Ok(0);
    }

    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await.context("Failed to begin insert transaction")?;

    for article in articles {
        let article_id = insert_article_tx(&mut tx, board, article, now).await?;
        insert_comments_tx(&mut tx, article_id, 0, &article.comments).await?;
    }

    tx.commit().await.context("Failed to commit article batch")?;
    Ok(articles.len() as u64)
}

async fn insert_article_tx(
    tx: &mut Transaction<'_, Sqlite>,
    board: &str,
    article: &NewArticle,
    now: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO articles (
            board, url, page_index, author, title, published_at, poster_ip,
            body_text, last_crawled_at, favor_count, against_count,
            neutral_count, total_comment_count
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(board)
    .bind(&article.url)
    .bind(article.page_index)
    .bind(&article.author)
    .bind(&article.title)
    .bind(article.published_at)
    .bind(&article.poster_ip)
    .bind(&article.body_text)
    .bind(now)
    .bind(article.favor_count)
    .bind(article.against_count)
    .bind(article.neutral_count)
    .bind(article.total_comment_count())
    .execute(&mut **tx)
    .await
    .context("Failed to insert article")?;

    Ok(result.last_insert_rowid())
}

async fn insert_comments_tx(
    tx: &mut Transaction<'_, Sqlite>,
    article_id: i64,
    start_position: i64,
    comments: &[NewComment],
) -> Result<()> {
    for (offset, comment) in comments.iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO comments (
                article_id, position, commenter_id, commenter_ip, reaction,
                commented_at, content
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(article_id)
        .bind(start_position + offset as i64)
        .bind(&comment.commenter_id)
        .bind(&comment.commenter_ip)
        .bind(comment.reaction.as_str())
        .bind(comment.commented_at)
        .bind(&comment.content)
        .execute(&mut **tx)
        .await
        .context("Failed to insert comment")?;
    }

    Ok(())
}

/// Get the stored total comment count for an article, if it exists.
pub async fn get_comment_count(pool: &SqlitePool, board: &str, url: &str) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT total_comment_count FROM articles WHERE board = ? AND url = ? ORDER BY id LIMIT 1",
    )
    .bind(board)
    .bind(url)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch comment count")?;

    Ok(row.map(|(n,)| n))
}

/// Apply a merge update to an already-stored article: refresh its counters
/// and append the comments beyond `previous_count`.
///
/// Both steps run in one transaction, so a concurrent reader never observes
/// refreshed counters with stale comments (or the reverse). Already-stored
/// comment rows are never touched.
pub async fn apply_article_update(
    pool: &SqlitePool,
    board: &str,
    url: &str,
    counters: ArticleCounters,
    comments: &[NewComment],
    previous_count: i64,
) -> Result<()> {
    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await.context("Failed to begin merge transaction")?;

    // When duplicates exist, the oldest row is the canonical one.
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM articles WHERE board = ? AND url = ? ORDER BY id LIMIT 1")
            .bind(board)
            .bind(url)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to locate article for merge")?;

    let Some((article_id,)) = row else {
        anyhow::bail!("article not found for merge: {url}");
    };

    sqlx::query(
        r"
        UPDATE articles
        SET last_crawled_at = ?, favor_count = ?, against_count = ?,
            neutral_count = ?, total_comment_count = ?
        WHERE id = ?
        ",
    )
    .bind(now)
    .bind(counters.favor_count)
    .bind(counters.against_count)
    .bind(counters.neutral_count)
    .bind(counters.total_comment_count)
    .bind(article_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update article counters")?;

    let new_comments = comments
        .get(previous_count.max(0) as usize..)
        .unwrap_or_default();
    insert_comments_tx(&mut tx, article_id, previous_count, new_comments).await?;

    tx.commit().await.context("Failed to commit article merge")?;
    Ok(())
}

/// Delete duplicate articles within a board, keeping the oldest row per URL.
///
/// Comment rows follow via the FK cascade.
pub async fn delete_duplicates_by_url(pool: &SqlitePool, board: &str) -> Result<u64> {
    let result = sqlx::query(
        r"
        DELETE FROM articles
        WHERE board = ?1
          AND id NOT IN (
              SELECT MIN(id) FROM articles WHERE board = ?1 GROUP BY url
          )
        ",
    )
    .bind(board)
    .execute(pool)
    .await
    .context("Failed to delete duplicate articles")?;

    Ok(result.rows_affected())
}

/// Repair poster IPs that captured trailing garbage (a footer variant leaks
/// the country annotation after a space); keeps everything before the first
/// space.
pub async fn repair_poster_ips(pool: &SqlitePool, board: &str) -> Result<u64> {
    let result = sqlx::query(
        r"
        UPDATE articles
        SET poster_ip = substr(poster_ip, 1, instr(poster_ip, ' ') - 1)
        WHERE board = ? AND poster_ip LIKE '% %'
        ",
    )
    .bind(board)
    .execute(pool)
    .await
    .context("Failed to repair poster IPs")?;

    Ok(result.rows_affected())
}

// ========== Read-side queries ==========

/// Get an article by its row id.
pub async fn get_article(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    sqlx::query_as("SELECT * FROM articles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch article")
}

/// Get the canonical (oldest) article row for a URL.
pub async fn get_article_by_url(pool: &SqlitePool, board: &str, url: &str) -> Result<Option<Article>> {
    sqlx::query_as("SELECT * FROM articles WHERE board = ? AND url = ? ORDER BY id LIMIT 1")
        .bind(board)
        .bind(url)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch article by url")
}

/// Get an article's comments in insertion order.
pub async fn get_comments_for_article(pool: &SqlitePool, article_id: i64) -> Result<Vec<Comment>> {
    sqlx::query_as("SELECT * FROM comments WHERE article_id = ? ORDER BY position")
        .bind(article_id)
        .fetch_all(pool)
        .await
        .context("Failed to fetch comments")
}

/// Recent articles of a board, newest first.
pub async fn recent_articles(
    pool: &SqlitePool,
    board: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Article>> {
    sqlx::query_as(
        r"
        SELECT * FROM articles
        WHERE board = ?
        ORDER BY published_at IS NULL, published_at DESC
        LIMIT ? OFFSET ?
        ",
    )
    .bind(board)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to fetch recent articles")
}

/// Recent articles across all boards, newest first.
pub async fn recent_articles_all_boards(pool: &SqlitePool, limit: i64) -> Result<Vec<Article>> {
    sqlx::query_as(
        r"
        SELECT * FROM articles
        ORDER BY published_at IS NULL, published_at DESC
        LIMIT ?
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch recent articles")
}

/// Count articles stored for a board.
pub async fn count_articles(pool: &SqlitePool, board: &str) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE board = ?")
        .bind(board)
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;

    Ok(count)
}

/// Search a board's articles by title substring, newest first.
pub async fn search_articles_by_title(
    pool: &SqlitePool,
    board: &str,
    query: &str,
    limit: i64,
) -> Result<Vec<Article>> {
    let pattern = format!(
        "%{}%",
        query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
    );

    sqlx::query_as(
        r"
        SELECT * FROM articles
        WHERE board = ? AND title LIKE ? ESCAPE '\'
        ORDER BY published_at IS NULL, published_at DESC
        LIMIT ?
        ",
    )
    .bind(board)
    .bind(pattern)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to search articles")
}

/// Aggregate counters for every board.
pub async fn board_stats(pool: &SqlitePool) -> Result<Vec<BoardStats>> {
    sqlx::query_as(
        r"
        SELECT
            board,
            COUNT(*) as article_count,
            COALESCE(SUM(total_comment_count), 0) as comment_count,
            COALESCE(SUM(favor_count), 0) as favor_count,
            COALESCE(SUM(against_count), 0) as against_count,
            COALESCE(SUM(neutral_count), 0) as neutral_count
        FROM articles
        GROUP BY board
        ORDER BY board
        ",
    )
    .fetch_all(pool)
    .await
    .context("Failed to fetch board stats")
}

/// Most active commenters within a board.
pub async fn top_commenters(
    pool: &SqlitePool,
    board: &str,
    limit: i64,
) -> Result<Vec<CommenterActivity>> {
    sqlx::query_as(
        r"
        SELECT c.commenter_id, COUNT(*) as comment_count
        FROM comments c
        JOIN articles a ON c.article_id = a.id
        WHERE a.board = ?
        GROUP BY c.commenter_id
        ORDER BY comment_count DESC, c.commenter_id
        LIMIT ?
        ",
    )
    .bind(board)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch top commenters")
}

/// Comment volume per Taiwan-local hour of day for a board.
pub async fn comment_activity_by_hour(pool: &SqlitePool, board: &str) -> Result<Vec<HourlyActivity>> {
    sqlx::query_as(
        r"
        SELECT
            CAST(strftime('%H', c.commented_at + ?, 'unixepoch') AS INTEGER) as hour,
            COUNT(*) as comment_count
        FROM comments c
        JOIN articles a ON c.article_id = a.id
        WHERE a.board = ? AND c.commented_at IS NOT NULL
        GROUP BY hour
        ORDER BY hour
        ",
    )
    .bind(TAIPEI_UTC_OFFSET_SECS)
    .bind(board)
    .fetch_all(pool)
    .await
    .context("Failed to fetch hourly activity")
}

/// A board's most commented articles.
pub async fn top_articles_by_comments(
    pool: &SqlitePool,
    board: &str,
    limit: i64,
) -> Result<Vec<Article>> {
    sqlx::query_as(
        r"
        SELECT * FROM articles
        WHERE board = ?
        ORDER BY total_comment_count DESC, id
        LIMIT ?
        ",
    )
    .bind(board)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch top articles")
}
