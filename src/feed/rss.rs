// src/feed/rss.rs
use anyhow::{Context, Result};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

/// Most-recent entries kept per feed.
pub const MAX_ENTRIES_PER_FEED: usize = 10;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "enclosure", default)]
    enclosure: Vec<Enclosure>,
    #[serde(rename = "media:content", default)]
    media_content: Vec<Enclosure>,
}
#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

/// One article record extracted from a syndication feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Unix seconds; 0 when the feed omits pubDate or it fails to parse.
    pub published_at: u64,
    pub image_url: Option<String>,
    pub source_domain: String,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

/// Host part of a URL, without any leading "www." or port.
pub fn source_domain(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = host.split(':').next().unwrap_or(host);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Parse an RSS document into at most `MAX_ENTRIES_PER_FEED` entries,
/// preserving feed order. Entries without a link are skipped.
pub fn parse_feed(xml: &str, feed_url: &str) -> Result<Vec<Entry>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
    let domain = source_domain(feed_url);

    let mut out = Vec::new();
    for it in rss.channel.item.into_iter().take(MAX_ENTRIES_PER_FEED) {
        let link = match it.link {
            Some(l) if !l.trim().is_empty() => l.trim().to_string(),
            _ => continue,
        };
        let image_url = it
            .enclosure
            .iter()
            .chain(it.media_content.iter())
            .find_map(|e| e.url.clone());

        out.push(Entry {
            title: crate::feed::normalize_text(it.title.as_deref().unwrap_or_default()),
            link,
            description: crate::feed::normalize_text(it.description.as_deref().unwrap_or_default()),
            published_at: it
                .pub_date
                .as_deref()
                .map(parse_rfc2822_to_unix)
                .unwrap_or(0),
            image_url,
            source_domain: domain.clone(),
        });
    }
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
