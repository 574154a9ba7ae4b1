//! # Breaking-News Ranker
//!
//! Stateless recency-weighted priority over the India + International source
//! union. Recomputed from scratch per request; nothing is cached here.

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;

use crate::feed::rss::Entry;

/// Headlines returned per request.
pub const TOP_K: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct BreakingItem {
    pub title: String,
    pub link: String,
    pub source_domain: String,
    pub score: f64,
}

/// 2.0 for urgency-keyword titles, 1.0 otherwise.
fn keyword_boost(title: &str) -> f64 {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\b(breaking|live|updates?)\b").unwrap());
    if re.is_match(title) {
        2.0
    } else {
        1.0
    }
}

/// `keyword_boost / max(1, age_minutes)`. A missing publish time counts as
/// effectively infinite age, sinking the item to the bottom.
pub fn score(title: &str, published_at: u64, now: u64) -> f64 {
    let age_minutes = if published_at == 0 {
        u64::MAX
    } else {
        now.saturating_sub(published_at) / 60
    };
    keyword_boost(title) / age_minutes.max(1) as f64
}

/// Score all entries and keep the `TOP_K` best, descending. The sort is
/// stable, so equal scores keep encounter order.
pub fn rank(entries: Vec<Entry>, now: u64) -> Vec<BreakingItem> {
    counter!("breaking_rank_runs_total").increment(1);

    let mut items: Vec<BreakingItem> = entries
        .into_iter()
        .map(|e| BreakingItem {
            score: score(&e.title, e.published_at, now),
            title: e.title,
            link: e.link,
            source_domain: e.source_domain,
        })
        .collect();

    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    items.truncate(TOP_K);
    items
}
