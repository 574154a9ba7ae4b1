//! # Quote Sources
//!
//! Weather and gold-rate snapshots from external APIs. Both are single
//! best-effort fetches: any upstream problem maps to `None`, which the
//! routes render as an "unavailable" marker rather than an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default coordinates when the query omits them (Hyderabad).
pub const DEFAULT_LAT: f64 = 17.385;
pub const DEFAULT_LON: f64 = 78.4867;

/// Grams per troy ounce, for converting upstream bullion quotes.
const GRAMS_PER_OZT: f64 = 31.1035;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    /// Day maximum, °C.
    pub high: f64,
    /// Day minimum, °C.
    pub low: f64,
    /// Precipitation probability, percent.
    pub pop: f64,
    /// WMO weather code.
    pub code: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoldPair {
    /// Rupees per gram, 24 karat.
    pub g24: f64,
    /// Rupees per gram, 22 karat.
    pub g22: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoldRate {
    pub current: GoldPair,
    pub tomorrow_estimate: GoldPair,
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn weather(&self, lat: f64, lon: f64) -> Option<WeatherSnapshot>;
    async fn gold_rate(&self) -> Option<GoldRate>;
}

pub type DynQuoteSource = Arc<dyn QuoteSource>;

/// Real upstreams: Open-Meteo daily forecast and a bullion quote API.
pub struct HttpQuoteSource {
    http: reqwest::Client,
    /// USD→INR conversion for the bullion quote; env `GOLD_USD_INR`.
    usd_inr: f64,
}

impl HttpQuoteSource {
    pub fn new() -> Self {
        let usd_inr = std::env::var("GOLD_USD_INR")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(84.0);
        let http = reqwest::Client::builder()
            .user_agent("deccan-newsdesk/0.1")
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self { http, usd_inr }
    }

    /// INR per gram for 24k and 22k from a USD-per-ounce spot price.
    fn gold_pair_from_spot(&self, usd_per_ozt: f64) -> GoldPair {
        let g24 = usd_per_ozt / GRAMS_PER_OZT * self.usd_inr;
        GoldPair {
            g24: round2(g24),
            g22: round2(g24 * 22.0 / 24.0),
        }
    }
}

impl Default for HttpQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn weather(&self, lat: f64, lon: f64) -> Option<WeatherSnapshot> {
        #[derive(Deserialize)]
        struct Resp {
            daily: Daily,
        }
        #[derive(Deserialize)]
        struct Daily {
            temperature_2m_max: Vec<f64>,
            temperature_2m_min: Vec<f64>,
            precipitation_probability_max: Vec<f64>,
            weather_code: Vec<i32>,
        }

        let resp = self
            .http
            .get("https://api.open-meteo.com/v1/forecast")
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_probability_max,weather_code"
                        .to_string(),
                ),
                ("forecast_days", "1".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let parsed: Resp = resp.json().await.ok()?;

        Some(WeatherSnapshot {
            high: *parsed.daily.temperature_2m_max.first()?,
            low: *parsed.daily.temperature_2m_min.first()?,
            pop: *parsed.daily.precipitation_probability_max.first()?,
            code: *parsed.daily.weather_code.first()?,
        })
    }

    async fn gold_rate(&self) -> Option<GoldRate> {
        #[derive(Deserialize)]
        struct Resp {
            price: f64,
        }

        let resp = self
            .http
            .get("https://api.gold-api.com/price/XAU")
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let parsed: Resp = resp.json().await.ok()?;
        if !(parsed.price.is_finite() && parsed.price > 0.0) {
            return None;
        }

        let current = self.gold_pair_from_spot(parsed.price);
        // The upstream offers no forward quote; carry the spot forward as
        // tomorrow's estimate.
        Some(GoldRate {
            current,
            tomorrow_estimate: current,
        })
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Fixed-answer source for tests.
pub struct MockQuoteSource {
    pub weather: Option<WeatherSnapshot>,
    pub gold: Option<GoldRate>,
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn weather(&self, _lat: f64, _lon: f64) -> Option<WeatherSnapshot> {
        self.weather.clone()
    }
    async fn gold_rate(&self) -> Option<GoldRate> {
        self.gold.clone()
    }
}
