use serde::{Deserialize, Serialize};

/// One crawled forum post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub board: String,
    pub url: String,
    /// Board page number at the time of the crawl (informational, not unique).
    pub page_index: i64,
    pub author: Option<String>,
    pub title: Option<String>,
    /// Publish time as Unix seconds, already localized to Taiwan time.
    pub published_at: Option<i64>,
    pub poster_ip: Option<String>,
    pub body_text: Option<String>,
    pub last_crawled_at: i64,
    pub favor_count: i64,
    pub against_count: i64,
    pub neutral_count: i64,
    pub total_comment_count: i64,
}

/// One reaction/reply attached to an article, in DOM order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub position: i64,
    pub commenter_id: String,
    pub commenter_ip: Option<String>,
    pub reaction: String,
    /// Comment time as Unix seconds, biased to the end of its minute.
    pub commented_at: Option<i64>,
    pub content: String,
}

/// Per-comment sentiment marker.
///
/// PTT renders three glyphs: 推 (push/agree), → (plain reply), 噓 (boo).
/// Anything else the site ever emits is bucketed as neutral so that the
/// three counters always sum to the comment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTag {
    Agree,
    Neutral,
    Disagree,
}

impl ReactionTag {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agree => "agree",
            Self::Neutral => "neutral",
            Self::Disagree => "disagree",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "agree" => Some(Self::Agree),
            "neutral" => Some(Self::Neutral),
            "disagree" => Some(Self::Disagree),
            _ => None,
        }
    }

    /// Map a raw push-tag glyph to its bucket.
    #[must_use]
    pub fn from_glyph(glyph: &str) -> Self {
        match glyph {
            "推" => Self::Agree,
            "噓" => Self::Disagree,
            _ => Self::Neutral,
        }
    }
}

/// A freshly parsed comment, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub commenter_id: String,
    pub commenter_ip: Option<String>,
    pub reaction: ReactionTag,
    pub commented_at: Option<i64>,
    pub content: String,
}

/// A freshly parsed article ready for insertion.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub url: String,
    pub page_index: i64,
    pub author: Option<String>,
    pub title: Option<String>,
    pub published_at: Option<i64>,
    pub poster_ip: Option<String>,
    pub body_text: Option<String>,
    pub favor_count: i64,
    pub against_count: i64,
    pub neutral_count: i64,
    pub comments: Vec<NewComment>,
}

impl NewArticle {
    /// Total comment count; always the length of `comments`.
    #[must_use]
    pub fn total_comment_count(&self) -> i64 {
        self.comments.len() as i64
    }
}

/// Refreshed counters applied when merging a re-crawled article.
#[derive(Debug, Clone, Copy)]
pub struct ArticleCounters {
    pub favor_count: i64,
    pub against_count: i64,
    pub neutral_count: i64,
    pub total_comment_count: i64,
}

/// Per-board aggregate used by the dashboard and `/api/stats`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BoardStats {
    pub board: String,
    pub article_count: i64,
    pub comment_count: i64,
    pub favor_count: i64,
    pub against_count: i64,
    pub neutral_count: i64,
}

/// A commenter ranked by activity within a board.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommenterActivity {
    pub commenter_id: String,
    pub comment_count: i64,
}

/// Comment volume for one hour of the (Taiwan-local) day.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HourlyActivity {
    pub hour: i64,
    pub comment_count: i64,
}
