// src/feed/fanout.rs
//! Best-effort concurrent fan-out over a list of source URLs.
//!
//! One task per source, independent timeout per task, failures swallowed at
//! the task boundary. Callers get the concatenation of whatever succeeded;
//! an all-fail round is an empty result, not an error.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use metrics::counter;
use tokio::task::JoinSet;

/// Per-source fetch deadline.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(12);

/// Run `fetch` once per URL concurrently and collect the successful batches.
///
/// Cross-source order is completion order; within one source's batch the
/// original order is preserved. A timeout, fetch error, or task panic only
/// drops that single source.
pub async fn fetch_all<T, F, Fut>(urls: &[String], fetch: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for url in urls {
        let url = url.clone();
        let fut = fetch(url.clone());
        set.spawn(async move {
            match tokio::time::timeout(FETCH_TIMEOUT, fut).await {
                Ok(Ok(items)) => (url, Ok(items)),
                Ok(Err(e)) => (url, Err(e)),
                Err(_) => (url, Err(anyhow::anyhow!("timed out"))),
            }
        });
    }

    let mut out = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(mut items))) => out.append(&mut items),
            Ok((url, Err(e))) => {
                tracing::warn!(error = ?e, source = %url, "source fetch failed");
                counter!("feed_fetch_errors_total").increment(1);
            }
            Err(e) => {
                tracing::warn!(error = ?e, "source task aborted");
                counter!("feed_fetch_errors_total").increment(1);
            }
        }
    }
    out
}
