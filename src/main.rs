//! Deccan Newsdesk — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

mod ai;
mod api;
mod breaking;
mod config;
mod feed;
mod metrics;
mod quotes;
mod studio;
mod telegram;
mod translit;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::studio::RECENT_CAPACITY;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - NEWSDESK_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("NEWSDESK_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsdesk=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables STUDIO_SHARED_SECRET / TELEGRAM_BOT_TOKEN / GEMINI_API_KEY
    // from .env so api.rs can pick them up.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // Prometheus recorder + /metrics route
    let prom = crate::metrics::Metrics::init(RECENT_CAPACITY);

    let state = api::AppState::from_env();
    let router = api::router(state).merge(prom.router());

    Ok(router.into())
}
