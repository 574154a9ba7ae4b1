// src/feed/dedup.rs
use std::collections::HashSet;

use crate::feed::FeedItem;

/// First-occurrence-preserving uniqueness filter keyed by `link`.
///
/// Order of survivors is the input order; applying it to its own output is
/// a no-op.
pub fn dedup_by_link(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.link.clone()) {
            out.push(item);
        }
    }
    out
}
