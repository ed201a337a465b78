//! Overview page: per-board aggregates and recent articles.

use maud::{html, Markup, Render};

use super::format_taipei;
use crate::components::{BaseLayout, Table, TableRow};
use crate::db::Article;
use crate::web::stats_cache::CachedStats;

/// Render the overview page.
#[must_use]
pub fn render_home_page(stats: &CachedStats, recent: &[Article]) -> Markup {
    let content = html! {
        h1 { "Overview" }

        section {
            p {
                strong { "Articles:" } " " (stats.total_articles())
                " | "
                strong { "Comments:" } " " (stats.total_comments())
            }
            (render_board_table(stats))
        }

        section {
            h2 { "Recent articles" }
            (render_recent_table(recent))
        }
    };

    BaseLayout::new("Overview").render(content)
}

fn render_board_table(stats: &CachedStats) -> Markup {
    let rows: Vec<Markup> = stats
        .boards
        .iter()
        .map(|board| {
            let link = html! {
                a href=(format!("/boards/{}", board.board)) { (board.board) }
            };
            TableRow::new()
                .cell_markup(link)
                .cell(&board.article_count.to_string())
                .cell(&board.comment_count.to_string())
                .cell(&board.favor_count.to_string())
                .cell(&board.against_count.to_string())
                .cell(&board.neutral_count.to_string())
                .render()
        })
        .collect();

    Table::new(vec!["Board", "Articles", "Comments", "推", "噓", "→"])
        .rows(rows)
        .render()
}

fn render_recent_table(recent: &[Article]) -> Markup {
    let rows: Vec<Markup> = recent
        .iter()
        .map(|article| {
            let title = article.title.as_deref().unwrap_or("(untitled)");
            let link = html! {
                a href=(format!("/boards/{}/articles/{}", article.board, article.id)) { (title) }
            };
            TableRow::new()
                .cell(&article.board)
                .cell_markup(link)
                .cell(article.author.as_deref().unwrap_or("-"))
                .cell(&article.total_comment_count.to_string())
                .cell(&format_taipei(article.published_at))
                .render()
        })
        .collect();

    Table::new(vec!["Board", "Title", "Author", "Comments", "Published"])
        .rows(rows)
        .render()
}
