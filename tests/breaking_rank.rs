// tests/breaking_rank.rs
//
// End-to-end /api/breaking against a local fixture server. The fixture feed
// is generated with publish times relative to "now" so the recency weighting
// is under test control.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use http::{header, Request, StatusCode};
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    routing::get,
    Router,
};
use tower::ServiceExt as _;

use deccan_newsdesk::ai::MockTextService;
use deccan_newsdesk::api::AppState;
use deccan_newsdesk::quotes::MockQuoteSource;
use deccan_newsdesk::studio::RecentPosts;

const BODY_LIMIT: usize = 1024 * 1024;

fn rss_item(title: &str, slug: &str, age_minutes: Option<i64>) -> String {
    let pub_date = age_minutes
        .map(|m| {
            let ts = Utc::now() - chrono::Duration::minutes(m);
            format!("<pubDate>{}</pubDate>", ts.to_rfc2822())
        })
        .unwrap_or_default();
    format!(
        "<item><title>{title}</title><link>https://news.example.com/{slug}</link>{pub_date}</item>"
    )
}

fn breaking_fixture() -> String {
    let items = [
        rss_item("Quiet municipal notice", "notice", Some(180)),
        rss_item("Breaking: dam gates opened", "dam", Some(2)),
        rss_item("Plain fresh headline", "fresh", Some(2)),
        rss_item("Undated archive piece", "archive", None),
        rss_item("Live: assembly session", "assembly", Some(30)),
        rss_item("Old roundup", "roundup", Some(600)),
    ]
    .join("");
    format!("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Mix</title>{items}</channel></rss>")
}

async fn spawn_fixture_server(xml: String) -> String {
    let app = Router::new().route(
        "/feed.rss",
        get(move || {
            let xml = xml.clone();
            async move { ([(header::CONTENT_TYPE, "application/rss+xml")], xml) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        shuttle_axum::axum::serve(listener, app).await.expect("fixture server");
    });
    format!("http://{addr}")
}

fn state_for(base: &str) -> AppState {
    AppState {
        sources: Arc::new(RwLock::new(
            toml::from_str(&format!(
                r#"
                [sources]
                india = ["{base}/feed.rss"]
                international = ["http://127.0.0.1:9/world.rss"]
                "#
            ))
            .expect("test source table"),
        )),
        recent: Arc::new(RecentPosts::new()),
        text: Arc::new(MockTextService::default()),
        quotes: Arc::new(MockQuoteSource { weather: None, gold: None }),
        http: reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("test http client"),
        webhook_secret: None,
        bot_token: None,
    }
}

async fn json_body(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn breaking_ranks_keyword_and_recency_first() {
    let base = spawn_fixture_server(breaking_fixture()).await;
    let app = deccan_newsdesk::router(state_for(&base));

    let resp = app
        .oneshot(Request::builder().uri("/api/breaking").body(Body::empty()).unwrap())
        .await
        .expect("oneshot /api/breaking");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("public, s-maxage=90, stale-while-revalidate=60")
    );

    let v = json_body(resp).await;
    let items = v["items"].as_array().expect("items array");
    assert_eq!(items.len(), 5, "six candidates, top five returned");

    let titles: Vec<&str> = items.iter().map(|i| i["title"].as_str().unwrap()).collect();
    // 2-minute "Breaking" beats the plain 2-minute headline (2/2 vs 1/2).
    assert_eq!(titles[0], "Breaking: dam gates opened");
    assert_eq!(titles[1], "Plain fresh headline");
    // 30-minute "Live" (2/30) beats the 3-hour notice (1/180).
    assert_eq!(titles[2], "Live: assembly session");
    assert_eq!(titles[3], "Quiet municipal notice");
    // undated sinks below everything dated; the 10-hour roundup is cut
    assert_eq!(titles[4], "Old roundup");
    assert!(!titles.contains(&"Undated archive piece"));

    let scores: Vec<f64> = items.iter().map(|i| i["score"].as_f64().unwrap()).collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "scores must be descending: {scores:?}");
    }
}

#[tokio::test]
async fn breaking_with_all_sources_down_is_an_empty_list() {
    let app = deccan_newsdesk::router(state_for("http://127.0.0.1:9"));

    let resp = app
        .oneshot(Request::builder().uri("/api/breaking").body(Body::empty()).unwrap())
        .await
        .expect("oneshot /api/breaking");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["items"].as_array().unwrap().len(), 0);
}
