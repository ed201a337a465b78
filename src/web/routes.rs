use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::pages::{render_article_page, render_board_page, render_home_page, BoardPageData};
use super::AppState;
use crate::db::{
    comment_activity_by_hour, get_article, get_comments_for_article, recent_articles,
    recent_articles_all_boards, search_articles_by_title, top_commenters,
};

const ARTICLES_PER_PAGE: i64 = 50;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/boards/:board", get(board_listing))
        .route("/boards/:board/articles/:id", get(article_detail))
        .route("/healthz", get(health))
        .route("/api/stats", get(api_stats))
        .route("/api/boards/:board/articles", get(api_articles))
        .route("/api/boards/:board/commenters", get(api_commenters))
        .route("/api/boards/:board/activity", get(api_activity))
}

// ========== HTML Routes ==========

async fn home(State(state): State<AppState>) -> Response {
    let stats = match state.stats.get_or_refresh(state.db.pool()).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Failed to fetch board stats: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let recent = match recent_articles_all_boards(state.db.pool(), 30).await {
        Ok(articles) => articles,
        Err(e) => {
            tracing::error!("Failed to fetch recent articles: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    Html(render_home_page(&stats, &recent).into_string()).into_response()
}

#[derive(Debug, Deserialize)]
struct BoardParams {
    q: Option<String>,
    page: Option<u32>,
}

async fn board_listing(
    State(state): State<AppState>,
    Path(board): Path<String>,
    Query(params): Query<BoardParams>,
) -> Response {
    let query = params.q.unwrap_or_default();
    let page = params.page.unwrap_or(1).max(1);
    let offset = i64::from(page - 1) * ARTICLES_PER_PAGE;

    // Fetch one extra row to know whether an older page exists.
    let result = if query.is_empty() {
        recent_articles(state.db.pool(), &board, ARTICLES_PER_PAGE + 1, offset).await
    } else {
        search_articles_by_title(state.db.pool(), &board, &query, ARTICLES_PER_PAGE).await
    };
    let mut articles = match result {
        Ok(articles) => articles,
        Err(e) => {
            tracing::error!("Failed to fetch board articles: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };
    let has_next = query.is_empty() && articles.len() as i64 > ARTICLES_PER_PAGE;
    articles.truncate(ARTICLES_PER_PAGE as usize);

    let commenters = match top_commenters(state.db.pool(), &board, 10).await {
        Ok(commenters) => commenters,
        Err(e) => {
            tracing::error!("Failed to fetch top commenters: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let data = BoardPageData {
        board: &board,
        articles: &articles,
        top_commenters: &commenters,
        query: &query,
        page,
        has_next,
    };
    Html(render_board_page(&data).into_string()).into_response()
}

async fn article_detail(
    State(state): State<AppState>,
    Path((board, id)): Path<(String, i64)>,
) -> Response {
    let article = match get_article(state.db.pool(), id).await {
        Ok(Some(article)) if article.board == board => article,
        Ok(_) => {
            return (StatusCode::NOT_FOUND, "Article not found").into_response();
        }
        Err(e) => {
            tracing::error!("Failed to fetch article: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let comments = match get_comments_for_article(state.db.pool(), article.id).await {
        Ok(comments) => comments,
        Err(e) => {
            tracing::error!("Failed to fetch comments: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    Html(render_article_page(&article, &comments).into_string()).into_response()
}

// ========== API Routes ==========

async fn health() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

async fn api_stats(State(state): State<AppState>) -> Response {
    match state.stats.get_or_refresh(state.db.pool()).await {
        Ok(stats) => Json(serde_json::json!({
            "total_articles": stats.total_articles(),
            "total_comments": stats.total_comments(),
            "boards": stats.boards,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch stats: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct LimitParams {
    limit: Option<i64>,
}

async fn api_articles(
    State(state): State<AppState>,
    Path(board): Path<String>,
    Query(params): Query<LimitParams>,
) -> Response {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    match recent_articles(state.db.pool(), &board, limit, 0).await {
        Ok(articles) => Json(articles).into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch articles: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

async fn api_commenters(
    State(state): State<AppState>,
    Path(board): Path<String>,
    Query(params): Query<LimitParams>,
) -> Response {
    let limit = params.limit.unwrap_or(20).clamp(1, 200);
    match top_commenters(state.db.pool(), &board, limit).await {
        Ok(commenters) => Json(commenters).into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch commenters: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

async fn api_activity(State(state): State<AppState>, Path(board): Path<String>) -> Response {
    match comment_activity_by_hour(state.db.pool(), &board).await {
        Ok(activity) => Json(activity).into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch activity: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}
