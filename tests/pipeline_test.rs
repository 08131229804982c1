use pulp::{
    Browser, Config, ContentBlock, Document,
    handlers::{ContentHandler, FetchContext, GenericHandler, RedditHandler},
};
use serde_json::json;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Magic bytes are enough for format detection; the cache never decodes
// full images.
const PNG_STUB: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

fn test_config() -> Config {
    let mut config = Config::default();
    config.media.thumbnails = false;
    config.network.request_timeout_seconds = 5;
    config
}

fn fetch_ctx(config: &Config) -> FetchContext {
    FetchContext::new(config).unwrap()
}

fn browser_with(config: Config, temp: &TempDir) -> Browser {
    Browser::with_history_path(config, &temp.path().join("history.db")).unwrap()
}

fn post_json(id: &str, subreddit: &str, thumbnail: &str) -> serde_json::Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": format!("Post {}", id),
            "author": "someone",
            "subreddit": subreddit,
            "score": 42,
            "num_comments": 7,
            "permalink": format!("/r/{}/comments/{}/post/", subreddit, id),
            "url": format!("https://example.com/{}", id),
            "thumbnail": thumbnail,
            "selftext": "",
            "is_self": false,
            "created_utc": 1700000000.0,
            "edited": false
        }
    })
}

fn listing_json(children: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "kind": "Listing",
        "data": { "after": null, "before": null, "dist": children.len(), "children": children }
    })
}

#[tokio::test]
async fn generic_handler_converts_html_and_extracts_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                r#"<html><head>
                        <title>Test Page</title>
                        <meta name="description" content="meta desc">
                        <meta property="og:description" content="og desc">
                    </head><body><h1>Hello</h1><p>World</p></body></html>"#,
                "text/html; charset=utf-8",
            ),
        )
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = GenericHandler::new();
    let url = Url::parse(&format!("{}/page", server.uri())).unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(!result.is_error());
    assert_eq!(result.status, 200);
    assert_eq!(result.title, "Test Page");
    assert_eq!(result.summary, "meta desc\nog desc");
    match &result.document {
        Document::Markdown(md) => {
            assert!(md.contains("# Hello"));
            assert!(md.contains("World"));
        }
        other => panic!("expected markdown document, got {:?}", other),
    }
}

#[tokio::test]
async fn generic_handler_wraps_non_html_in_code_block() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("plain payload"),
        )
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = GenericHandler::new();
    let url = Url::parse(&format!("{}/data.txt", server.uri())).unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(!result.is_error());
    assert_eq!(
        result.document,
        Document::Markdown("```\nplain payload\n```".into())
    );
}

#[tokio::test]
async fn generic_handler_follows_redirects_to_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>moved</body></html>"),
        )
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = GenericHandler::new();
    let url = Url::parse(&format!("{}/old", server.uri())).unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(!result.is_error());
    assert!(result.url.ends_with("/new"));
}

#[tokio::test]
async fn generic_handler_network_failure_is_status_zero() {
    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = GenericHandler::new();
    // Nothing listens here.
    let url = Url::parse("http://127.0.0.1:1/unreachable").unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(result.is_error());
    assert_eq!(result.status, 0);
    assert!(result.document.is_empty());
}

#[tokio::test]
async fn generic_handler_keeps_status_of_error_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>not here</body></html>"),
        )
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = GenericHandler::new();
    let url = Url::parse(&format!("{}/gone", server.uri())).unwrap();

    let result = handler.fetch(&url, &ctx).await;
    // The error page is still content; the status records the failure.
    assert!(!result.is_error());
    assert_eq!(result.status, 404);
}

#[tokio::test]
async fn reddit_handler_renders_subreddit_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/rust.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_json(vec![
            post_json("aaa", "rust", "self"),
            post_json("bbb", "rust", "default"),
        ])))
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = RedditHandler::with_api_base(server.uri());
    let url = Url::parse("https://old.reddit.com/r/rust/").unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(!result.is_error());
    assert_eq!(result.status, 200);
    assert_eq!(result.title, "r/rust");
    // Human URL is preserved; the JSON endpoint stays internal.
    assert_eq!(result.url, "https://old.reddit.com/r/rust/");

    let Document::Blocks(blocks) = &result.document else {
        panic!("expected blocks");
    };
    assert_eq!(blocks[0], ContentBlock::Markdown("# r/rust".into()));
    // Two posts, three blocks each (header, footer, divider), plus the page header.
    assert_eq!(blocks.len(), 7);
}

#[tokio::test]
async fn reddit_handler_infers_front_page_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_json(vec![post_json("aaa", "pics", "self")])),
        )
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = RedditHandler::with_api_base(server.uri());
    let url = Url::parse("https://old.reddit.com/").unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(!result.is_error());
    let Document::Blocks(blocks) = &result.document else {
        panic!("expected blocks");
    };
    assert_eq!(blocks[0], ContentBlock::Markdown("# r/pics".into()));
}

#[tokio::test]
async fn reddit_handler_renders_post_thread() {
    let server = MockServer::start().await;
    let payload = json!([
        listing_json(vec![post_json("abc", "rust", "self")]),
        listing_json(vec![])
    ]);
    Mock::given(method("GET"))
        .and(path("/r/rust/comments/abc.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = RedditHandler::with_api_base(server.uri());
    let url = Url::parse("https://old.reddit.com/r/rust/comments/abc/some_title/").unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(!result.is_error());
    assert_eq!(result.title, "Post abc");

    let Document::Blocks(blocks) = &result.document else {
        panic!("expected blocks");
    };
    assert_eq!(blocks.len(), 3);
    match &blocks[0] {
        ContentBlock::Markdown(md) => assert!(md.contains("Post abc")),
        other => panic!("expected markdown, got {:?}", other),
    }
}

#[tokio::test]
async fn reddit_handler_surfaces_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/missing.json"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = RedditHandler::with_api_base(server.uri());
    let url = Url::parse("https://old.reddit.com/r/missing/").unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(result.is_error());
    assert_eq!(result.status, 404);
    assert!(result.error.as_deref().unwrap().contains("404"));
    assert!(result.document.is_empty());
}

#[tokio::test]
async fn reddit_handler_distinguishes_bad_json_from_bad_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/broken.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/odd.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"kind": "Listing", "data": {}})),
        )
        .mount(&server)
        .await;

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = RedditHandler::with_api_base(server.uri());

    let bad_json = handler
        .fetch(&Url::parse("https://old.reddit.com/r/broken/").unwrap(), &ctx)
        .await;
    assert!(bad_json.is_error());
    assert!(
        bad_json
            .error
            .as_deref()
            .unwrap()
            .contains("invalid JSON")
    );

    let bad_shape = handler
        .fetch(&Url::parse("https://old.reddit.com/r/odd/").unwrap(), &ctx)
        .await;
    assert!(bad_shape.is_error());
    assert!(
        bad_shape
            .error
            .as_deref()
            .unwrap()
            .contains("Unexpected response shape")
    );
    assert_ne!(bad_json.error, bad_shape.error);
}

#[tokio::test]
async fn reddit_handler_unresolvable_path_skips_network() {
    let server = MockServer::start().await;
    // No mounted routes: any request would 404 and fail the expectation below.

    let config = test_config();
    let ctx = fetch_ctx(&config);
    let handler = RedditHandler::with_api_base(server.uri());
    let url = Url::parse("https://old.reddit.com/u/someone").unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(result.is_error());
    assert_eq!(result.status, 0);
    assert!(
        result
            .error
            .as_deref()
            .unwrap()
            .contains("Could not determine Reddit JSON endpoint")
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn reddit_thumbnails_are_cached_by_url_hash() {
    let server = MockServer::start().await;
    let thumb_url = format!("{}/thumb.png", server.uri());

    Mock::given(method("GET"))
        .and(path("/r/pics.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_json(vec![post_json("aaa", "pics", &thumb_url)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thumb.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(PNG_STUB),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache_dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.media.thumbnails = true;
    config.media.cache_dir = Some(cache_dir.path().to_path_buf());

    let ctx = fetch_ctx(&config);
    let handler = RedditHandler::with_api_base(server.uri());
    let url = Url::parse("https://old.reddit.com/r/pics/").unwrap();

    let first = handler.fetch(&url, &ctx).await;
    let Document::Blocks(blocks) = &first.document else {
        panic!("expected blocks");
    };
    let image_path = blocks
        .iter()
        .find_map(|block| match block {
            ContentBlock::Image(path) => Some(path.clone()),
            _ => None,
        })
        .expect("listing should include a thumbnail block");
    assert!(image_path.exists());
    assert_eq!(std::fs::read(&image_path).unwrap(), PNG_STUB);

    // Second render reuses the cached file; expect(1) on the mock verifies
    // no second download happens.
    let second = handler.fetch(&url, &ctx).await;
    assert!(!second.is_error());
}

#[tokio::test]
async fn reddit_thumbnail_failure_degrades_to_text_only() {
    let server = MockServer::start().await;
    let thumb_url = format!("{}/thumb.png", server.uri());

    Mock::given(method("GET"))
        .and(path("/r/pics.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_json(vec![post_json("aaa", "pics", &thumb_url)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thumb.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache_dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.media.thumbnails = true;
    config.media.cache_dir = Some(cache_dir.path().to_path_buf());

    let ctx = fetch_ctx(&config);
    let handler = RedditHandler::with_api_base(server.uri());
    let url = Url::parse("https://old.reddit.com/r/pics/").unwrap();

    let result = handler.fetch(&url, &ctx).await;
    assert!(!result.is_error());
    let Document::Blocks(blocks) = &result.document else {
        panic!("expected blocks");
    };
    assert!(
        blocks
            .iter()
            .all(|block| !matches!(block, ContentBlock::Image(_)))
    );
}

#[tokio::test]
async fn pipeline_fetch_stores_tab_and_records_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "<html><head><title>An Article</title></head><body><p>text</p></body></html>",
                "text/html",
            ),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let browser = browser_with(test_config(), &temp);
    let tab = browser.open_tab().await;

    let result = browser
        .resolve_and_fetch(&format!("{}/article", server.uri()), tab)
        .await;
    assert!(!result.is_error());

    let stored = browser.tab_content(tab).await.unwrap();
    assert_eq!(stored.url, result.url);
    assert_eq!(stored.title, "An Article");

    let hits = browser.search_history("article", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "An Article");

    assert_eq!(browser.recent_urls().await, vec![result.url.clone()]);
}

#[tokio::test]
async fn pipeline_repeat_visit_upserts_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body><p>text</p></body></html>"),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let browser = browser_with(test_config(), &temp);
    let tab = browser.open_tab().await;

    let input = format!("{}/article", server.uri());
    browser.resolve_and_fetch(&input, tab).await;
    browser.resolve_and_fetch(&input, tab).await;

    let hits = browser.search_history("", 10).unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn pipeline_closing_other_tab_keeps_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>a</body></html>"),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let browser = browser_with(test_config(), &temp);
    let first = browser.open_tab().await;
    let second = browser.open_tab().await;

    browser
        .resolve_and_fetch(&format!("{}/a", server.uri()), first)
        .await;
    browser.close_tab(second).await;

    let stored = browser.tab_content(first).await.unwrap();
    assert!(stored.url.ends_with("/a"));
    assert!(browser.tab_content(second).await.is_none());
}

#[tokio::test]
async fn pipeline_failed_fetch_replaces_only_that_tab() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>good</body></html>"),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let browser = browser_with(test_config(), &temp);
    let good_tab = browser.open_tab().await;
    let bad_tab = browser.open_tab().await;

    browser
        .resolve_and_fetch(&format!("{}/good", server.uri()), good_tab)
        .await;
    let failed = browser
        .resolve_and_fetch("http://127.0.0.1:1/nope", bad_tab)
        .await;

    assert!(failed.is_error());
    assert!(browser.tab_content(bad_tab).await.unwrap().is_error());
    assert!(!browser.tab_content(good_tab).await.unwrap().is_error());
}

#[tokio::test]
async fn pipeline_dispatches_reddit_domain_without_scheme() {
    // Uses the unresolvable-path case so the reddit handler is exercised
    // through the session without any network traffic.
    let temp = TempDir::new().unwrap();
    let browser = browser_with(test_config(), &temp);
    let tab = browser.open_tab().await;

    let result = browser.resolve_and_fetch("reddit.com/u/someone", tab).await;
    assert!(result.is_error());
    assert_eq!(result.status, 0);
    assert!(
        result
            .error
            .as_deref()
            .unwrap()
            .contains("Could not determine Reddit JSON endpoint")
    );
}
