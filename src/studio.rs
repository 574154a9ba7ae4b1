//! studio.rs — bounded in-memory store of posts pushed by the newsroom's
//! Telegram channel, read back by the studio frontend.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

/// Capacity of the recent-posts buffer.
pub const RECENT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Photo,
    Video,
}

/// One ingested submission. `media_ref` is the transport's opaque file id;
/// `snapshot()` resolves it to a retrieval path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudioPost {
    pub id: i64,
    pub kind: PostKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    pub title: String,
    pub caption: String,
    pub posted_at: u64,
    pub tags: Vec<String>,
}

/// Fixed-capacity, most-recent-first buffer. The only mutable state shared
/// across requests; owned by `AppState`, mutated solely through `push`.
#[derive(Debug)]
pub struct RecentPosts {
    inner: Mutex<VecDeque<StudioPost>>,
    cap: usize,
}

impl RecentPosts {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(RECENT_CAPACITY)
    }

    /// Prepend a post; evict the oldest entry when over capacity.
    /// Infallible and O(1) amortized.
    pub fn push(&self, post: StudioPost) {
        let mut v = self.inner.lock().expect("recent posts mutex poisoned");
        v.push_front(post);
        while v.len() > self.cap {
            v.pop_back();
        }
    }

    /// Clone of the current contents, most-recent-first, with media refs
    /// resolved to retrieval paths. Never hands out the live deque.
    pub fn snapshot(&self) -> Vec<StudioPost> {
        let v = self.inner.lock().expect("recent posts mutex poisoned");
        v.iter()
            .map(|p| StudioPost {
                media_ref: p.media_ref.as_deref().map(media_path),
                ..p.clone()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("recent posts mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RecentPosts {
    fn default() -> Self {
        Self::new()
    }
}

/// Retrieval path served by the file passthrough route.
pub fn media_path(file_ref: &str) -> String {
    format!("/api/studio/file/{file_ref}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: i64) -> StudioPost {
        StudioPost {
            id,
            kind: PostKind::Text,
            media_ref: None,
            title: format!("post {id}"),
            caption: format!("caption {id}"),
            posted_at: 1_000 + id as u64,
            tags: Vec::new(),
        }
    }

    #[test]
    fn capacity_evicts_oldest() {
        let buf = RecentPosts::new();
        for id in 0..51 {
            buf.push(post(id));
        }
        assert_eq!(buf.len(), RECENT_CAPACITY);
        let snap = buf.snapshot();
        assert_eq!(snap[0].id, 50, "newest at head");
        assert!(!snap.iter().any(|p| p.id == 0), "oldest evicted");
    }

    #[test]
    fn snapshot_is_most_recent_first() {
        let buf = RecentPosts::with_capacity(10);
        for id in 0..3 {
            buf.push(post(id));
        }
        let ids: Vec<i64> = buf.snapshot().iter().map(|p| p.id).collect();
        assert_eq!(ids, [2, 1, 0]);
    }

    #[test]
    fn mutating_a_snapshot_does_not_leak_back() {
        let buf = RecentPosts::new();
        buf.push(post(1));
        let mut snap = buf.snapshot();
        snap[0].title = "tampered".to_string();
        snap.clear();
        assert_eq!(buf.snapshot()[0].title, "post 1");
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn snapshot_resolves_media_refs() {
        let buf = RecentPosts::new();
        buf.push(StudioPost {
            media_ref: Some("AgAD123".to_string()),
            kind: PostKind::Photo,
            ..post(7)
        });
        let snap = buf.snapshot();
        assert_eq!(snap[0].media_ref.as_deref(), Some("/api/studio/file/AgAD123"));
    }
}
