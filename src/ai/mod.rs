//! AI adapter: provider abstraction for summarization, translation,
//! text-to-speech, and receipt verification.
//!
//! Summarization is best-effort by contract: it never errors and returns an
//! empty `Summary` on any failure, so a broken upstream can only degrade a
//! feed response, never fail it. The remaining operations return `Result`
//! and surface as 4xx/502 at the route boundary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Article text fed to the model is capped at this many characters.
pub const ARTICLE_TEXT_CAP: usize = 8000;

/// Page/article fetch deadline.
const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(12);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ai_calls_total", "Model calls attempted.");
        describe_counter!("ai_failures_total", "Model calls that failed or returned junk.");
    });
}

/// Structured summary for one article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub short_story: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

/// Result of a payment-receipt image check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptCheck {
    #[serde(default)]
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Capability consumed by the feed pipeline and the text routes.
#[async_trait]
pub trait TextService: Send + Sync {
    /// Fetch the article behind `url` and summarize it. Never errors.
    async fn summarize(&self, url: &str) -> Summary;
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
    /// Synthesized speech as audio bytes (MP3).
    async fn speak(&self, text: &str) -> Result<Vec<u8>>;
    async fn verify_receipt(&self, image: &[u8], mime: &str) -> Result<ReceiptCheck>;
    /// Provider name, logged once at startup.
    fn provider_name(&self) -> &'static str;
}

pub type DynTextService = Arc<dyn TextService>;

/// Factory: mock under `AI_TEST_MODE=mock`, Gemini when `GEMINI_API_KEY` is
/// set, disabled otherwise.
pub fn build_text_service() -> DynTextService {
    let service: DynTextService =
        if std::env::var("AI_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
            Arc::new(MockTextService::default())
        } else {
            match std::env::var("GEMINI_API_KEY") {
                Ok(key) if !key.is_empty() => Arc::new(GeminiService::new(key, None)),
                _ => Arc::new(DisabledTextService),
            }
        };
    tracing::info!(provider = service.provider_name(), "text service selected");
    service
}

// ------------------------------------------------------------
// Markup stripping
// ------------------------------------------------------------

/// Reduce an HTML page to plain text: drop script/style/comment blocks,
/// collapse remaining tags to whitespace, squeeze whitespace, cap length.
pub fn strip_markup(html: &str) -> String {
    static RE_DROP: OnceCell<regex::Regex> = OnceCell::new();
    let re_drop = RE_DROP.get_or_init(|| {
        regex::Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<!--.*?-->")
            .unwrap()
    });
    let mut out = re_drop.replace_all(html, " ").to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = html_escape::decode_html_entities(&out).to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > ARTICLE_TEXT_CAP {
        out = out.chars().take(ARTICLE_TEXT_CAP).collect();
    }
    out
}

/// Parse model output as JSON, tolerating code fences and prose around the
/// object: everything outside the outermost braces is discarded.
fn parse_loose_json<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

// ------------------------------------------------------------
// Gemini provider
// ------------------------------------------------------------

pub struct GeminiService {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiService {
    /// `model_override`: pass Some("gemini-2.0-flash") to override; that is
    /// also the default.
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("deccan-newsdesk/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(PAGE_FETCH_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or("gemini-2.0-flash").to_string(),
        }
    }

    /// One generateContent call; `parts` lets callers attach inline media.
    async fn generate(&self, parts: Vec<serde_json::Value>) -> Result<String> {
        ensure_metrics_described();
        counter!("ai_calls_total").increment(1);

        #[derive(Deserialize)]
        struct Resp {
            candidates: Option<Vec<Candidate>>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: CandidateContent,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            parts: Vec<CandidatePart>,
        }
        #[derive(Deserialize)]
        struct CandidatePart {
            text: Option<String>,
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = serde_json::json!({ "contents": [{ "parts": parts }] });

        let resp = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            counter!("ai_failures_total").increment(1);
            bail!("model endpoint returned {}", resp.status());
        }

        let parsed: Resp = resp.json().await.context("model response json")?;
        let text = parsed
            .candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .unwrap_or_default();
        if text.is_empty() {
            counter!("ai_failures_total").increment(1);
            bail!("model returned no text");
        }
        Ok(text)
    }

    async fn fetch_article_text(&self, url: &str) -> Result<String> {
        let page = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(strip_markup(&page))
    }
}

#[async_trait]
impl TextService for GeminiService {
    async fn summarize(&self, url: &str) -> Summary {
        let article = match self.fetch_article_text(url).await {
            Ok(t) if !t.is_empty() => t,
            Ok(_) => return Summary::default(),
            Err(e) => {
                tracing::warn!(error = ?e, %url, "article fetch failed");
                return Summary::default();
            }
        };

        let prompt = format!(
            "You are a news desk assistant. Summarize the article text below in a neutral tone. \
             Return ONLY strict JSON shaped as {{\"short_story\": \"2-3 sentences\", \
             \"bullets\": [\"point\", \"point\", \"point\"]}} with no other text.\n\n{article}"
        );
        match self.generate(vec![serde_json::json!({ "text": prompt })]).await {
            Ok(raw) => parse_loose_json::<Summary>(&raw).unwrap_or_else(|| {
                counter!("ai_failures_total").increment(1);
                tracing::warn!(%url, "unparseable summary, falling back");
                Summary::default()
            }),
            Err(e) => {
                tracing::warn!(error = ?e, %url, "summarize call failed");
                Summary::default()
            }
        }
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let prompt = format!(
            "Translate the following text to {target_lang}. Return only the translation, \
             nothing else.\n\n{text}"
        );
        let out = self.generate(vec![serde_json::json!({ "text": prompt })]).await?;
        Ok(out.trim().to_string())
    }

    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        // Unofficial but stable TTS endpoint; returns MP3 bytes directly.
        let resp = self
            .http
            .get("https://translate.google.com/translate_tts")
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", "te"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn verify_receipt(&self, image: &[u8], mime: &str) -> Result<ReceiptCheck> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let prompt = "You are verifying a payment receipt screenshot. Return ONLY strict JSON \
                      {\"ok\": bool, \"amount\": string?, \"time\": string?, \"gateway\": string?, \
                      \"txid\": string?, \"reason\": string?}. Set ok=false with a reason if the \
                      image is not a genuine payment receipt.";
        let raw = self
            .generate(vec![
                serde_json::json!({ "text": prompt }),
                serde_json::json!({ "inline_data": { "mime_type": mime, "data": encoded } }),
            ])
            .await?;
        parse_loose_json::<ReceiptCheck>(&raw).context("unparseable verification result")
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Disabled + mock services
// ------------------------------------------------------------

/// Used when no API key is configured: summaries degrade to feed
/// descriptions, the Result operations report the capability as missing.
pub struct DisabledTextService;

#[async_trait]
impl TextService for DisabledTextService {
    async fn summarize(&self, _url: &str) -> Summary {
        Summary::default()
    }
    async fn translate(&self, _text: &str, _target_lang: &str) -> Result<String> {
        bail!("text service disabled")
    }
    async fn speak(&self, _text: &str) -> Result<Vec<u8>> {
        bail!("text service disabled")
    }
    async fn verify_receipt(&self, _image: &[u8], _mime: &str) -> Result<ReceiptCheck> {
        bail!("text service disabled")
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic service for tests and local runs.
#[derive(Clone)]
pub struct MockTextService {
    pub summary: Summary,
}

impl Default for MockTextService {
    fn default() -> Self {
        Self {
            summary: Summary {
                short_story: "Mock summary.".to_string(),
                bullets: vec!["point one".to_string(), "point two".to_string()],
            },
        }
    }
}

#[async_trait]
impl TextService for MockTextService {
    async fn summarize(&self, _url: &str) -> Summary {
        self.summary.clone()
    }
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        Ok(format!("[{target_lang}] {text}"))
    }
    async fn speak(&self, _text: &str) -> Result<Vec<u8>> {
        Ok(vec![0x49, 0x44, 0x33]) // "ID3"
    }
    async fn verify_receipt(&self, _image: &[u8], _mime: &str) -> Result<ReceiptCheck> {
        Ok(ReceiptCheck {
            ok: true,
            amount: Some("100.00".to_string()),
            gateway: Some("mockpay".to_string()),
            ..ReceiptCheck::default()
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_removes_script_style_and_comments() {
        let html = r#"<html><head><style>.x{color:red}</style>
            <script>var a = "<b>nope</b>";</script></head>
            <body><!-- hidden --><h1>Head</h1><p>Body &amp; more</p></body></html>"#;
        assert_eq!(strip_markup(html), "Head Body & more");
    }

    #[test]
    fn strip_markup_caps_length() {
        let html = format!("<p>{}</p>", "a".repeat(20_000));
        assert_eq!(strip_markup(&html).chars().count(), ARTICLE_TEXT_CAP);
    }

    #[test]
    fn loose_json_tolerates_fences() {
        let raw = "```json\n{\"short_story\": \"s\", \"bullets\": [\"b\"]}\n```";
        let s: Summary = parse_loose_json(raw).unwrap();
        assert_eq!(s.short_story, "s");
        assert_eq!(s.bullets, ["b"]);
    }

    #[test]
    fn loose_json_rejects_junk() {
        assert!(parse_loose_json::<Summary>("no object here").is_none());
        assert!(parse_loose_json::<Summary>("} backwards {").is_none());
    }

    #[test]
    fn provider_names_identify_each_service() {
        assert_eq!(MockTextService::default().provider_name(), "mock");
        assert_eq!(DisabledTextService.provider_name(), "disabled");
        assert_eq!(GeminiService::new("k".to_string(), None).provider_name(), "gemini");
    }

    #[tokio::test]
    async fn disabled_service_degrades_not_errors_for_summaries() {
        let s = DisabledTextService.summarize("https://e.com/a").await;
        assert_eq!(s, Summary::default());
        assert!(DisabledTextService.translate("hi", "te").await.is_err());
    }
}
