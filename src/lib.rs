// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ai;
pub mod api;
pub mod breaking;
pub mod config;
pub mod feed;
pub mod metrics;
pub mod quotes;
pub mod studio;
pub mod telegram;
pub mod translit;

// ---- Re-exports for stable public API ----
// Convenient router access: `deccan_newsdesk::api::router` or `deccan_newsdesk::router`
pub use crate::api::{router, AppState};
pub use crate::studio::{PostKind, RecentPosts, StudioPost};
