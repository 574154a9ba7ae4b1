//! # Telegram Inbox
//!
//! Webhook payload models and classification into `StudioPost`s, plus the
//! file-retrieval passthrough against the Bot API.
//!
//! Only channel broadcasts and private direct messages become posts; every
//! other update shape is silently ignored so the transport never retries.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::studio::{PostKind, StudioPost};

/// Derived titles are capped at this many characters.
pub const TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[allow(dead_code)]
    pub update_id: i64,
    /// Channel broadcast.
    pub channel_post: Option<Message>,
    /// Private direct message.
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Unix seconds, assigned by the transport.
    pub date: u64,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// Size variants of one photo, any order.
    pub photo: Option<Vec<PhotoSize>>,
    pub video: Option<Video>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
}

/// Map an update to a post, or `None` for shapes we do not ingest.
///
/// Kind priority is photo > video > text; the caption wins over a separate
/// text body; the title is the first line of the body, truncated.
pub fn classify(update: Update) -> Option<StudioPost> {
    let msg = update.channel_post.or(update.message)?;

    let (kind, media_ref) = if let Some(photo) = msg.photo.filter(|p| !p.is_empty()) {
        let best = photo
            .into_iter()
            .max_by_key(|p| (p.width as u64) * (p.height as u64))?;
        (PostKind::Photo, Some(best.file_id))
    } else if let Some(video) = msg.video {
        (PostKind::Video, Some(video.file_id))
    } else {
        (PostKind::Text, None)
    };

    let body = msg.caption.or(msg.text).unwrap_or_default();
    let title = derive_title(&body);

    Some(StudioPost {
        id: msg.message_id,
        kind,
        media_ref,
        title,
        caption: body,
        posted_at: msg.date,
        tags: Vec::new(),
    })
}

/// First line of the body, at most `TITLE_MAX_CHARS` characters.
pub fn derive_title(body: &str) -> String {
    body.lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect()
}

/// Resolve a file id via getFile and download the bytes.
pub async fn fetch_file(
    http: &reqwest::Client,
    bot_token: &str,
    file_id: &str,
) -> Result<(Vec<u8>, Option<String>)> {
    #[derive(Deserialize)]
    struct GetFileResp {
        ok: bool,
        result: Option<FileInfo>,
    }
    #[derive(Deserialize)]
    struct FileInfo {
        file_path: Option<String>,
    }

    let meta: GetFileResp = http
        .get(format!("https://api.telegram.org/bot{bot_token}/getFile"))
        .query(&[("file_id", file_id)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("getFile response")?;

    let path = meta
        .result
        .filter(|_| meta.ok)
        .and_then(|f| f.file_path)
        .context("file path missing")?;

    let resp = http
        .get(format!("https://api.telegram.org/file/bot{bot_token}/{path}"))
        .send()
        .await?
        .error_for_status()?;
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = resp.bytes().await?.to_vec();
    Ok((bytes, content_type))
}
