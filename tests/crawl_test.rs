//! End-to-end crawl tests against a mocked PTT server.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ptt_board_archiver::config::{BoardConfig, Config};
use ptt_board_archiver::crawler::fetch::{FetchError, NoopSleeper, PttClient};
use ptt_board_archiver::crawler::crawl_board;
use ptt_board_archiver::db::{
    get_article_by_url, get_comments_for_article, Database,
};

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn test_client() -> PttClient {
    PttClient::with_sleeper(Duration::ZERO, Arc::new(NoopSleeper)).expect("client")
}

fn board(server: &MockServer) -> BoardConfig {
    BoardConfig {
        name: "test".to_string(),
        base_url: format!("{}/bbs/Test/index.html", server.uri()),
    }
}

/// Board index page: navigation (previous page = index4 → latest page = 5),
/// two ordinary entries, then a pinned announcement after the separator.
fn index_html(article_hrefs: &[&str], pinned_hrefs: &[&str]) -> String {
    let mut html = String::from(
        r#"<div class="btn-group btn-group-paging">
            <a class="btn wide" href="/bbs/Test/index1.html">最舊</a>
            <a class="btn wide" href="/bbs/Test/index4.html">&lsaquo; 上頁</a>
            <a class="btn wide disabled">下頁 &rsaquo;</a>
            <a class="btn wide" href="/bbs/Test/index.html">最新</a>
        </div>
        <div class="r-list-container action-bar-margin bbs-screen">"#,
    );
    for href in article_hrefs {
        html.push_str(&format!(
            r#"<div class="r-ent"><div class="title"><a href="{href}">a title</a></div></div>"#
        ));
    }
    if !pinned_hrefs.is_empty() {
        html.push_str(r#"<div class="r-list-sep"></div>"#);
        for href in pinned_hrefs {
            html.push_str(&format!(
                r#"<div class="r-ent"><div class="title"><a href="{href}">[公告] pinned</a></div></div>"#
            ));
        }
    }
    html.push_str("</div>");
    html
}

/// An article page with `comment_count` push comments.
fn article_html(title: &str, comment_count: usize) -> String {
    let mut html = format!(
        r#"<div id="main-content" class="bbs-screen bbs-content">
<div class="article-metaline"><span class="article-meta-tag">作者</span><span class="article-meta-value">poster123 (鄉民)</span></div>
<div class="article-metaline"><span class="article-meta-tag">標題</span><span class="article-meta-value">{title}</span></div>
<div class="article-metaline"><span class="article-meta-tag">時間</span><span class="article-meta-value">Fri Oct 20 13:23:57 2023</span></div>
內文第一行

--
※ 發信站: 批踢踢實業坊(ptt.cc), 來自: 140.114.57.56 (台灣)
※ 文章網址: https://example.invalid/article
"#
    );
    for i in 0..comment_count {
        html.push_str(&format!(
            "<div class=\"push\"><span class=\"push-tag\">推 </span><span class=\"push-userid\">user{i}</span><span class=\"push-content\">: comment {i}</span><span class=\"push-ipdatetime\"> 1.2.3.{i} 10/20 14:{i:02}\n</span></div>"
        ));
    }
    html.push_str("</div>");
    html
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_inserts_new_articles_and_skips_announcements() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;
    let config = Config::for_testing();

    mount_page(
        &server,
        "/bbs/Test/index.html",
        index_html(
            &["/bbs/Test/M.100.A.html", "/bbs/Test/M.200.A.html"],
            &["/bbs/Test/M.999.A.html"],
        ),
    )
    .await;
    mount_page(&server, "/bbs/Test/M.100.A.html", article_html("[問卦] first", 2)).await;
    mount_page(&server, "/bbs/Test/M.200.A.html", article_html("[新聞] second", 0)).await;
    // The pinned announcement sits after the separator and must never be
    // fetched.
    Mock::given(method("GET"))
        .and(path("/bbs/Test/M.999.A.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("should not be hit"))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client();
    let board = board(&server);
    let summaries = crawl_board(&client, &db, &board, 1, 1, "test_latest", &config)
        .await
        .unwrap();

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].page, 5);
    assert_eq!(summaries[0].inserted, 2);
    assert_eq!(summaries[0].updated, 0);
    assert_eq!(summaries[0].ignored, 0);

    let first_url = format!("{}/bbs/Test/M.100.A.html", server.uri());
    let stored = get_article_by_url(db.pool(), "test", &first_url)
        .await
        .unwrap()
        .expect("first article stored");
    assert_eq!(stored.title.as_deref(), Some("[問卦] first"));
    assert_eq!(stored.total_comment_count, 2);
    assert_eq!(stored.poster_ip.as_deref(), Some("140.114.57.56"));
    assert_eq!(stored.page_index, 5);
}

#[tokio::test]
async fn test_recrawl_unchanged_articles_is_idempotent() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;
    let config = Config::for_testing();

    mount_page(
        &server,
        "/bbs/Test/index.html",
        index_html(&["/bbs/Test/M.100.A.html"], &[]),
    )
    .await;
    mount_page(&server, "/bbs/Test/M.100.A.html", article_html("[問卦] first", 2)).await;

    let client = test_client();
    let board = board(&server);

    let first = crawl_board(&client, &db, &board, 1, 1, "test_latest", &config)
        .await
        .unwrap();
    assert_eq!(first[0].inserted, 1);

    let url = format!("{}/bbs/Test/M.100.A.html", server.uri());
    let stored = get_article_by_url(db.pool(), "test", &url).await.unwrap().unwrap();
    let comments_before = get_comments_for_article(db.pool(), stored.id).await.unwrap();

    let second = crawl_board(&client, &db, &board, 1, 1, "test_latest", &config)
        .await
        .unwrap();
    assert_eq!(second[0].inserted, 0);
    assert_eq!(second[0].updated, 0);
    assert_eq!(second[0].ignored, 1);

    // Zero writes: same rows, same ids, same crawl timestamp semantics.
    let stored_after = get_article_by_url(db.pool(), "test", &url).await.unwrap().unwrap();
    assert_eq!(stored_after.id, stored.id);
    assert_eq!(stored_after.last_crawled_at, stored.last_crawled_at);
    let comments_after = get_comments_for_article(db.pool(), stored.id).await.unwrap();
    assert_eq!(comments_before.len(), comments_after.len());
    for (before, after) in comments_before.iter().zip(&comments_after) {
        assert_eq!(before.id, after.id);
    }
}

#[tokio::test]
async fn test_recrawl_grown_article_merges_new_comments() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;
    let config = Config::for_testing();

    mount_page(
        &server,
        "/bbs/Test/index.html",
        index_html(&["/bbs/Test/M.100.A.html"], &[]),
    )
    .await;
    mount_page(&server, "/bbs/Test/M.100.A.html", article_html("[問卦] first", 2)).await;

    let client = test_client();
    let board = board(&server);
    crawl_board(&client, &db, &board, 1, 1, "test_latest", &config)
        .await
        .unwrap();

    let url = format!("{}/bbs/Test/M.100.A.html", server.uri());
    let stored = get_article_by_url(db.pool(), "test", &url).await.unwrap().unwrap();
    let comments_before = get_comments_for_article(db.pool(), stored.id).await.unwrap();
    assert_eq!(comments_before.len(), 2);

    // The article grew two more comments since the last pass.
    server.reset().await;
    mount_page(
        &server,
        "/bbs/Test/index.html",
        index_html(&["/bbs/Test/M.100.A.html"], &[]),
    )
    .await;
    mount_page(&server, "/bbs/Test/M.100.A.html", article_html("[問卦] first", 4)).await;

    let summaries = crawl_board(&client, &db, &board, 1, 1, "test_latest", &config)
        .await
        .unwrap();
    assert_eq!(summaries[0].updated, 1);
    assert_eq!(summaries[0].inserted, 0);

    let merged = get_article_by_url(db.pool(), "test", &url).await.unwrap().unwrap();
    assert_eq!(merged.total_comment_count, 4);
    assert_eq!(
        merged.total_comment_count,
        merged.favor_count + merged.against_count + merged.neutral_count
    );

    let comments = get_comments_for_article(db.pool(), merged.id).await.unwrap();
    assert_eq!(comments.len(), 4);
    // The first two rows are untouched; the tail is appended in order.
    for (before, after) in comments_before.iter().zip(&comments) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.content, after.content);
    }
    assert_eq!(comments[2].commenter_id, "user2");
    assert_eq!(comments[3].commenter_id, "user3");
}

#[tokio::test]
async fn test_article_server_error_skips_only_that_article() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;
    let config = Config::for_testing();

    mount_page(
        &server,
        "/bbs/Test/index.html",
        index_html(&["/bbs/Test/M.500.A.html", "/bbs/Test/M.100.A.html"], &[]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/bbs/Test/M.500.A.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/bbs/Test/M.100.A.html", article_html("[問卦] ok", 0)).await;

    let client = test_client();
    let board = board(&server);
    let summaries = crawl_board(&client, &db, &board, 1, 1, "test_latest", &config)
        .await
        .unwrap();

    // The failing article is skipped; the healthy one still lands.
    assert_eq!(summaries[0].inserted, 1);
    let ok_url = format!("{}/bbs/Test/M.100.A.html", server.uri());
    assert!(get_article_by_url(db.pool(), "test", &ok_url).await.unwrap().is_some());
}

#[tokio::test]
async fn test_malformed_article_is_not_persisted() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;
    let config = Config::for_testing();

    mount_page(
        &server,
        "/bbs/Test/index.html",
        index_html(&["/bbs/Test/M.100.A.html"], &[]),
    )
    .await;
    // No metadata block at all.
    mount_page(
        &server,
        "/bbs/Test/M.100.A.html",
        r#"<div id="main-content">broken page</div>"#.to_string(),
    )
    .await;

    let client = test_client();
    let board = board(&server);
    let summaries = crawl_board(&client, &db, &board, 1, 1, "test_latest", &config)
        .await
        .unwrap();

    assert_eq!(summaries[0].inserted, 0);
    let url = format!("{}/bbs/Test/M.100.A.html", server.uri());
    assert!(get_article_by_url(db.pool(), "test", &url).await.unwrap().is_none());
}

#[tokio::test]
async fn test_requesting_more_pages_than_window_fails() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;
    let config = Config::for_testing();

    let client = test_client();
    let board = board(&server);
    let result = crawl_board(&client, &db, &board, 1, 2, "test_latest", &config).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_connection_failure_exhausts_bounded_retries() {
    // Nothing listens on this port; every attempt fails at connect time.
    let client = test_client();
    let result = client.fetch("http://127.0.0.1:9/bbs/Test/index.html").await;

    match result {
        Err(FetchError::Exhausted { attempts, .. }) => assert_eq!(attempts, 5),
        other => panic!("expected Exhausted, got {other:?}"),
    }
}
