use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use base64::Engine as _;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde_json::json;
use shuttle_axum::axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ai::{build_text_service, DynTextService};
use crate::breaking;
use crate::config::{Category, SourceTable, DEFAULT_SOURCES_CONFIG_PATH};
use crate::feed;
use crate::quotes::{DynQuoteSource, HttpQuoteSource, DEFAULT_LAT, DEFAULT_LON};
use crate::studio::RecentPosts;
use crate::telegram;
use crate::translit;

pub const ENV_STUDIO_SHARED_SECRET: &str = "STUDIO_SHARED_SECRET";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

const FEED_CACHE_CONTROL: &str = "public, s-maxage=120, stale-while-revalidate=60";
const BREAKING_CACHE_CONTROL: &str = "public, s-maxage=90, stale-while-revalidate=60";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("studio_posts_total", "Webhook deliveries ingested into the buffer.");
        describe_counter!(
            "studio_rejected_total",
            "Webhook deliveries rejected internally (bad secret, unusable shape)."
        );
    });
}

#[derive(Clone)]
pub struct AppState {
    pub sources: Arc<RwLock<SourceTable>>,
    pub recent: Arc<RecentPosts>,
    pub text: DynTextService,
    pub quotes: DynQuoteSource,
    pub http: reqwest::Client,
    pub webhook_secret: Option<String>,
    pub bot_token: Option<String>,
}

impl AppState {
    /// Production wiring: real upstreams, env-configured secrets.
    pub fn from_env() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("deccan-newsdesk/0.1")
            .timeout(Duration::from_secs(12))
            .build()
            .expect("reqwest client");

        Self {
            sources: Arc::new(RwLock::new(SourceTable::load_from_file(
                DEFAULT_SOURCES_CONFIG_PATH,
            ))),
            recent: Arc::new(RecentPosts::new()),
            text: build_text_service(),
            quotes: Arc::new(HttpQuoteSource::new()),
            http,
            webhook_secret: std::env::var(ENV_STUDIO_SHARED_SECRET).ok().filter(|s| !s.is_empty()),
            bot_token: std::env::var(ENV_TELEGRAM_BOT_TOKEN).ok().filter(|s| !s.is_empty()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    ensure_metrics_described();

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/feed", get(api_feed))
        .route("/api/breaking", get(api_breaking))
        .route("/api/studio", get(studio_recent))
        .route("/api/studio/file/{file_id}", get(studio_file))
        .route("/webhook/telegram", post(telegram_webhook))
        .route("/api/translate", post(api_translate))
        .route("/api/speak", post(api_speak))
        .route("/api/verify-receipt", post(api_verify_receipt))
        .route("/api/weather", get(api_weather))
        .route("/api/gold", get(api_gold))
        .route("/api/transliterate", get(api_transliterate))
        .route("/admin/reload-sources", post(admin_reload_sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ------------------------------------------------------------
// Error helpers
// ------------------------------------------------------------

fn bad_request(code: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": code }))).into_response()
}

fn upstream_unavailable() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": "upstream_unavailable" })),
    )
        .into_response()
}

// ------------------------------------------------------------
// Feed + breaking pipelines
// ------------------------------------------------------------

async fn api_feed(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let category = Category::from_query(q.get("category").map(String::as_str).unwrap_or_default());
    let urls = {
        let guard = state.sources.read().expect("source table rwlock poisoned");
        guard.urls_for(category)
    };

    let items = feed::aggregate(category, &urls, &state.http, Arc::clone(&state.text)).await;

    (
        [(header::CACHE_CONTROL, FEED_CACHE_CONTROL)],
        Json(json!({ "category": category.as_str(), "items": items })),
    )
        .into_response()
}

async fn api_breaking(State(state): State<AppState>) -> Response {
    let urls = {
        let guard = state.sources.read().expect("source table rwlock poisoned");
        guard.breaking_urls()
    };

    let entries = feed::collect_entries(&state.http, &urls).await;
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let items = breaking::rank(entries, now);

    (
        [(header::CACHE_CONTROL, BREAKING_CACHE_CONTROL)],
        Json(json!({ "items": items })),
    )
        .into_response()
}

// ------------------------------------------------------------
// Studio buffer + webhook ingestion
// ------------------------------------------------------------

async fn studio_recent(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "items": state.recent.snapshot() }))
}

async fn studio_file(State(state): State<AppState>, Path(file_id): Path<String>) -> Response {
    let Some(token) = state.bot_token.as_deref() else {
        return upstream_unavailable();
    };
    match telegram::fetch_file(&state.http, token, &file_id).await {
        Ok((bytes, content_type)) => (
            [(
                header::CONTENT_TYPE,
                content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
            )],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = ?e, %file_id, "file passthrough failed");
            upstream_unavailable()
        }
    }
}

/// Always acknowledges with 200 so the transport never retries, even when
/// the shared secret mismatches or the payload is unusable. Rejections are
/// internal only: a warn log plus `studio_rejected_total`.
async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<serde_json::Value> {
    let ack = Json(json!({ "ok": true }));

    if let Some(expected) = state.webhook_secret.as_deref() {
        let got = headers
            .get("x-telegram-bot-api-secret-token")
            .and_then(|v| v.to_str().ok());
        if got != Some(expected) {
            tracing::warn!("webhook secret mismatch, delivery dropped");
            counter!("studio_rejected_total").increment(1);
            return ack;
        }
    }

    match serde_json::from_slice::<telegram::Update>(&body) {
        Ok(update) => match telegram::classify(update) {
            Some(post) => {
                tracing::debug!(id = post.id, kind = ?post.kind, "studio post ingested");
                state.recent.push(post);
                counter!("studio_posts_total").increment(1);
            }
            None => {
                counter!("studio_rejected_total").increment(1);
            }
        },
        Err(e) => {
            tracing::warn!(error = ?e, "unparseable webhook payload, delivery dropped");
            counter!("studio_rejected_total").increment(1);
        }
    }

    ack
}

// ------------------------------------------------------------
// Text service routes
// ------------------------------------------------------------

#[derive(serde::Deserialize)]
struct TranslateReq {
    #[serde(default)]
    text: String,
    #[serde(default = "default_target_lang")]
    target_lang: String,
}

fn default_target_lang() -> String {
    "Telugu".to_string()
}

async fn api_translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateReq>,
) -> Response {
    if body.text.trim().is_empty() {
        return bad_request("missing_text");
    }
    match state.text.translate(&body.text, &body.target_lang).await {
        Ok(translated) => Json(json!({ "translated": translated })).into_response(),
        Err(e) => {
            tracing::warn!(error = ?e, "translate failed");
            upstream_unavailable()
        }
    }
}

#[derive(serde::Deserialize)]
struct SpeakReq {
    #[serde(default)]
    text: String,
}

async fn api_speak(State(state): State<AppState>, Json(body): Json<SpeakReq>) -> Response {
    if body.text.trim().is_empty() {
        return bad_request("missing_text");
    }
    match state.text.speak(&body.text).await {
        Ok(audio) => ([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response(),
        Err(e) => {
            tracing::warn!(error = ?e, "speech synthesis failed");
            upstream_unavailable()
        }
    }
}

#[derive(serde::Deserialize)]
struct VerifyReceiptReq {
    /// Base64-encoded image bytes.
    #[serde(default)]
    image: String,
    #[serde(default = "default_receipt_mime")]
    mime: String,
}

fn default_receipt_mime() -> String {
    "image/jpeg".to_string()
}

async fn api_verify_receipt(
    State(state): State<AppState>,
    Json(body): Json<VerifyReceiptReq>,
) -> Response {
    if body.image.is_empty() {
        return bad_request("missing_image");
    }
    let bytes = match base64::engine::general_purpose::STANDARD.decode(body.image.as_bytes()) {
        Ok(b) => b,
        Err(_) => return bad_request("bad_base64"),
    };
    match state.text.verify_receipt(&bytes, &body.mime).await {
        Ok(check) => Json(check).into_response(),
        Err(e) => {
            tracing::warn!(error = ?e, "receipt verification failed");
            upstream_unavailable()
        }
    }
}

// ------------------------------------------------------------
// Quote routes
// ------------------------------------------------------------

async fn api_weather(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let lat = q
        .get("lat")
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_LAT);
    let lon = q
        .get("lon")
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_LON);

    match state.quotes.weather(lat, lon).await {
        Some(snap) => Json(json!({ "available": true, "weather": snap })),
        None => Json(json!({ "available": false })),
    }
}

async fn api_gold(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.quotes.gold_rate().await {
        Some(rate) => Json(json!({ "available": true, "gold": rate })),
        None => Json(json!({ "available": false })),
    }
}

// ------------------------------------------------------------
// Transliteration + admin
// ------------------------------------------------------------

async fn api_transliterate(Query(q): Query<HashMap<String, String>>) -> Response {
    let Some(text) = q.get("text").filter(|t| !t.trim().is_empty()) else {
        return bad_request("missing_text");
    };
    Json(json!({ "input": text, "latin": translit::transliterate(text) })).into_response()
}

async fn admin_reload_sources(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let authorized = match state.webhook_secret.as_deref() {
        Some(expected) => headers
            .get("x-studio-secret")
            .and_then(|v| v.to_str().ok())
            .map(|got| got == expected)
            .unwrap_or(false),
        None => false,
    };
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        )
            .into_response();
    }

    let fresh = SourceTable::load_from_file(DEFAULT_SOURCES_CONFIG_PATH);
    match state.sources.write() {
        Ok(mut s) => {
            *s = fresh;
            Json(json!({ "reloaded": true })).into_response()
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal" })),
        )
            .into_response(),
    }
}
