// tests/webhook_ingest.rs
//
// End-to-end webhook ingestion: a delivery posted to /webhook/telegram lands
// in the recent-posts buffer and comes back from /api/studio.
//
// The always-200 acknowledgment on bad secrets and malformed payloads is the
// documented contract (transport retry suppression), not a bug — the tests
// below pin it deliberately.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use http::{Request, StatusCode};
use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    Router,
};
use tower::ServiceExt as _;

use deccan_newsdesk::ai::MockTextService;
use deccan_newsdesk::api::AppState;
use deccan_newsdesk::config::SourceTable;
use deccan_newsdesk::quotes::MockQuoteSource;
use deccan_newsdesk::studio::RecentPosts;

const BODY_LIMIT: usize = 1024 * 1024;
const SECRET: &str = "hush";

fn test_state() -> AppState {
    AppState {
        sources: Arc::new(RwLock::new(
            toml::from_str("[sources]").expect("empty source table"),
        )),
        recent: Arc::new(RecentPosts::new()),
        text: Arc::new(MockTextService::default()),
        quotes: Arc::new(MockQuoteSource { weather: None, gold: None }),
        http: reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("test http client"),
        webhook_secret: Some(SECRET.to_string()),
        bot_token: None,
    }
}

fn webhook_req(payload: &Json, secret: Option<&str>) -> Request<Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri("/webhook/telegram")
        .header("content-type", "application/json");
    if let Some(s) = secret {
        b = b.header("x-telegram-bot-api-secret-token", s);
    }
    b.body(Body::from(payload.to_string())).expect("build webhook req")
}

async fn json_body(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

async fn studio_items(app: &Router) -> Vec<Json> {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/studio").body(Body::empty()).unwrap())
        .await
        .expect("oneshot /api/studio");
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await["items"].as_array().cloned().unwrap_or_default()
}

fn photo_broadcast() -> Json {
    json!({
        "update_id": 777,
        "channel_post": {
            "message_id": 9001,
            "date": 1_755_000_000u64,
            "caption": "Flood alert\nmore text",
            "photo": [
                { "file_id": "thumb", "width": 90, "height": 60 },
                { "file_id": "full", "width": 1280, "height": 720 }
            ]
        }
    })
}

#[tokio::test]
async fn photo_broadcast_lands_at_the_buffer_head() {
    let state = test_state();
    let app = deccan_newsdesk::router(state);

    let resp = app
        .clone()
        .oneshot(webhook_req(&photo_broadcast(), Some(SECRET)))
        .await
        .expect("oneshot webhook");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["ok"], true);

    let items = studio_items(&app).await;
    assert_eq!(items.len(), 1);
    let head = &items[0];
    assert_eq!(head["id"], 9001);
    assert_eq!(head["kind"], "photo");
    assert_eq!(head["title"], "Flood alert");
    assert_eq!(head["caption"], "Flood alert\nmore text");
    // highest-resolution variant, resolved to a retrieval path
    assert_eq!(head["media_ref"], "/api/studio/file/full");
    assert_eq!(head["tags"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn bad_secret_still_acknowledges_but_ingests_nothing() {
    let state = test_state();
    let app = deccan_newsdesk::router(state);

    let resp = app
        .clone()
        .oneshot(webhook_req(&photo_broadcast(), Some("wrong")))
        .await
        .expect("oneshot webhook");
    // intentional: 200 to the transport, rejection is internal only
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["ok"], true);
    assert!(studio_items(&app).await.is_empty());

    let resp = app
        .clone()
        .oneshot(webhook_req(&photo_broadcast(), None))
        .await
        .expect("oneshot webhook without secret");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(studio_items(&app).await.is_empty());
}

#[tokio::test]
async fn malformed_and_unrecognized_payloads_are_acknowledged_and_ignored() {
    let state = test_state();
    let app = deccan_newsdesk::router(state);

    // not even JSON
    let req = Request::builder()
        .method("POST")
        .uri("/webhook/telegram")
        .header("content-type", "application/json")
        .header("x-telegram-bot-api-secret-token", SECRET)
        .body(Body::from("<< junk >>"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.expect("oneshot junk");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["ok"], true);

    // valid JSON, but neither a broadcast nor a direct message
    let edited = json!({ "update_id": 5, "edited_message": { "message_id": 1, "date": 0 } });
    let resp = app
        .clone()
        .oneshot(webhook_req(&edited, Some(SECRET)))
        .await
        .expect("oneshot edited");
    assert_eq!(resp.status(), StatusCode::OK);

    assert!(studio_items(&app).await.is_empty());
}

#[tokio::test]
async fn newest_delivery_is_first_in_the_studio_read() {
    let state = test_state();
    let app = deccan_newsdesk::router(state);

    for (id, text) in [(1, "first"), (2, "second"), (3, "third")] {
        let payload = json!({
            "update_id": id,
            "message": { "message_id": id, "date": 1_755_000_000u64 + id as u64, "text": text }
        });
        let resp = app
            .clone()
            .oneshot(webhook_req(&payload, Some(SECRET)))
            .await
            .expect("oneshot dm");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let items = studio_items(&app).await;
    let ids: Vec<i64> = items.iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, [3, 2, 1]);
    assert_eq!(items[0]["kind"], "text");
    assert!(items[0].get("media_ref").is_none());
}
