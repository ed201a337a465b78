//! Per-board article listing with search, pagination, and commenter stats.

use maud::{html, Markup, Render};

use super::format_taipei;
use crate::components::{BaseLayout, Table, TableRow};
use crate::db::{Article, CommenterActivity};

pub struct BoardPageData<'a> {
    pub board: &'a str,
    pub articles: &'a [Article],
    pub top_commenters: &'a [CommenterActivity],
    pub query: &'a str,
    pub page: u32,
    pub has_next: bool,
}

/// Render a board's article listing.
#[must_use]
pub fn render_board_page(data: &BoardPageData<'_>) -> Markup {
    let content = html! {
        h1 { (data.board) }

        form method="get" role="search" {
            input type="search" name="q" placeholder="Search titles" value=(data.query);
            button type="submit" { "Search" }
        }

        (render_article_table(data.articles))

        @if data.query.is_empty() {
            (render_pagination(data.board, data.page, data.has_next))
        }

        @if !data.top_commenters.is_empty() {
            section {
                h2 { "Most active commenters" }
                (render_commenter_table(data.top_commenters))
            }
        }
    };

    BaseLayout::new(data.board).render(content)
}

fn render_article_table(articles: &[Article]) -> Markup {
    let rows: Vec<Markup> = articles
        .iter()
        .map(|article| {
            let title = article.title.as_deref().unwrap_or("(untitled)");
            let link = html! {
                a href=(format!("/boards/{}/articles/{}", article.board, article.id)) { (title) }
            };
            TableRow::new()
                .cell_markup(link)
                .cell(article.author.as_deref().unwrap_or("-"))
                .cell(&article.favor_count.to_string())
                .cell(&article.against_count.to_string())
                .cell(&article.total_comment_count.to_string())
                .cell(&format_taipei(article.published_at))
                .render()
        })
        .collect();

    Table::new(vec!["Title", "Author", "推", "噓", "Comments", "Published"])
        .rows(rows)
        .render()
}

fn render_commenter_table(commenters: &[CommenterActivity]) -> Markup {
    let rows: Vec<Markup> = commenters
        .iter()
        .map(|entry| {
            TableRow::new()
                .cell(&entry.commenter_id)
                .cell(&entry.comment_count.to_string())
                .render()
        })
        .collect();

    Table::new(vec!["Commenter", "Comments"]).rows(rows).render()
}

fn render_pagination(board: &str, page: u32, has_next: bool) -> Markup {
    html! {
        nav {
            ul {
                @if page > 1 {
                    li { a href=(format!("/boards/{board}?page={}", page - 1)) { "‹ Newer" } }
                }
                li { "Page " (page) }
                @if has_next {
                    li { a href=(format!("/boards/{board}?page={}", page + 1)) { "Older ›" } }
                }
            }
        }
    }
}
