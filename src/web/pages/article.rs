//! Article detail page with the full comment list.

use maud::{html, Markup, Render};

use super::format_taipei;
use crate::components::{BaseLayout, Table, TableRow};
use crate::db::{Article, Comment};

/// Render one article with its comments.
#[must_use]
pub fn render_article_page(article: &Article, comments: &[Comment]) -> Markup {
    let title = article.title.as_deref().unwrap_or("(untitled)");

    let content = html! {
        h1 { (title) }
        p {
            a href=(format!("/boards/{}", article.board)) { (article.board) }
            " | " (article.author.as_deref().unwrap_or("-"))
            " | " (format_taipei(article.published_at))
            @if let Some(ref ip) = article.poster_ip {
                " | " (ip)
            }
        }
        p {
            small {
                "推 " (article.favor_count)
                " / 噓 " (article.against_count)
                " / → " (article.neutral_count)
                " | source: " a href=(article.url) { (article.url) }
            }
        }

        @if let Some(ref body) = article.body_text {
            section {
                pre { (body) }
            }
        }

        section {
            h2 { "Comments (" (article.total_comment_count) ")" }
            (render_comment_table(comments))
        }
    };

    BaseLayout::new(title).render(content)
}

fn render_comment_table(comments: &[Comment]) -> Markup {
    let rows: Vec<Markup> = comments
        .iter()
        .map(|comment| {
            TableRow::new()
                .cell(reaction_glyph(&comment.reaction))
                .cell(&comment.commenter_id)
                .cell(&comment.content)
                .cell(comment.commenter_ip.as_deref().unwrap_or("-"))
                .cell(&format_taipei(comment.commented_at))
                .render()
        })
        .collect();

    Table::new(vec!["", "Commenter", "Content", "IP", "Time"])
        .rows(rows)
        .render()
}

fn reaction_glyph(reaction: &str) -> &'static str {
    match reaction {
        "agree" => "推",
        "disagree" => "噓",
        _ => "→",
    }
}
