// src/feed/mod.rs
pub mod dedup;
pub mod fanout;
pub mod rss;

use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::ai::DynTextService;
use crate::config::Category;
use crate::feed::rss::Entry;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_errors_total", "Source fetch/parse/timeout errors.");
        describe_counter!("feed_items_total", "Feed items produced after enrichment.");
        describe_counter!("feed_dedup_total", "Feed items removed as duplicate links.");
        describe_counter!("breaking_rank_runs_total", "Breaking ranker invocations.");
    });
}

/// One enriched article in a `/api/feed` response. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub bullets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<u64>,
    pub source_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Normalize feed text: entity decode, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Fetch and parse one RSS source into its bounded entry prefix.
pub async fn fetch_source(http: reqwest::Client, url: String) -> anyhow::Result<Vec<Entry>> {
    let body = http.get(&url).send().await?.error_for_status()?.text().await?;
    rss::parse_feed(&body, &url)
}

/// Collect the entry union for a set of source URLs, tolerating per-source
/// failures.
pub async fn collect_entries(http: &reqwest::Client, urls: &[String]) -> Vec<Entry> {
    ensure_metrics_described();
    fanout::fetch_all(urls, |u| fetch_source(http.clone(), u)).await
}

/// Full `/api/feed` pipeline for one category: fan-out, per-entry AI
/// enrichment, link dedup.
///
/// Enrichment is best-effort; a failed or empty summary falls back to the
/// entry's own description with no bullets. Pre-dedup order is completion
/// order, which is accepted nondeterminism.
pub async fn aggregate(
    category: Category,
    urls: &[String],
    http: &reqwest::Client,
    text: DynTextService,
) -> Vec<FeedItem> {
    let entries = collect_entries(http, urls).await;

    let mut set = JoinSet::new();
    for entry in entries {
        let text = Arc::clone(&text);
        set.spawn(async move { enrich_entry(entry, text).await });
    }

    let mut items = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(item) => items.push(item),
            Err(e) => tracing::warn!(error = ?e, "enrichment task aborted"),
        }
    }

    let before = items.len();
    let items = dedup::dedup_by_link(items);
    counter!("feed_dedup_total").increment((before - items.len()) as u64);
    counter!("feed_items_total").increment(items.len() as u64);
    tracing::debug!(category = category.as_str(), items = items.len(), "feed aggregated");
    items
}

async fn enrich_entry(entry: Entry, text: DynTextService) -> FeedItem {
    let summary = text.summarize(&entry.link).await;
    let (short_story, bullets) = if summary.short_story.is_empty() {
        (entry.description.clone(), Vec::new())
    } else {
        (summary.short_story, summary.bullets)
    };

    FeedItem {
        title: entry.title,
        link: entry.link,
        summary: short_story,
        bullets,
        published_at: (entry.published_at > 0).then_some(entry.published_at),
        source_domain: entry.source_domain,
        image_url: entry.image_url,
    }
}
