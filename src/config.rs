//! # Source Table
//!
//! Category-keyed RSS source lists. Loaded once from `config/sources.toml`
//! at startup with a built-in seed as fallback; immutable afterwards except
//! through the admin reload route.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

pub const DEFAULT_SOURCES_CONFIG_PATH: &str = "config/sources.toml";

/// Feed categories served by `/api/feed`. Unrecognized query values fall
/// back to `India` rather than producing a client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Hyderabad,
    Telangana,
    India,
    International,
    Sports,
    Gadgets,
    Health,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Hyderabad,
        Category::Telangana,
        Category::India,
        Category::International,
        Category::Sports,
        Category::Gadgets,
        Category::Health,
    ];

    /// Case-insensitive lookup; anything unknown maps to India.
    pub fn from_query(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "hyderabad" => Category::Hyderabad,
            "telangana" => Category::Telangana,
            "international" => Category::International,
            "sports" => Category::Sports,
            "gadgets" => Category::Gadgets,
            "health" => Category::Health,
            _ => Category::India,
        }
    }

    /// Canonical display name, as echoed by `/api/feed`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hyderabad => "Hyderabad",
            Category::Telangana => "Telangana",
            Category::India => "India",
            Category::International => "International",
            Category::Sports => "Sports",
            Category::Gadgets => "Gadgets",
            Category::Health => "Health",
        }
    }

    /// Lowercase key used in `config/sources.toml`.
    pub fn table_key(&self) -> &'static str {
        match self {
            Category::Hyderabad => "hyderabad",
            Category::Telangana => "telangana",
            Category::India => "india",
            Category::International => "international",
            Category::Sports => "sports",
            Category::Gadgets => "gadgets",
            Category::Health => "health",
        }
    }
}

/// Ordered source URLs per category.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceTable {
    #[serde(default)]
    sources: HashMap<String, Vec<String>>,
}

impl SourceTable {
    /// Load the table from a TOML file.
    /// Falls back to `default_seed()` on any read/parse error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Source URLs for one category, in configured order.
    pub fn urls_for(&self, category: Category) -> Vec<String> {
        self.sources
            .get(category.table_key())
            .cloned()
            .unwrap_or_default()
    }

    /// Union of the India and International lists, India first.
    /// This is the input set for the breaking-news ranker.
    pub fn breaking_urls(&self) -> Vec<String> {
        let mut urls = self.urls_for(Category::India);
        urls.extend(self.urls_for(Category::International));
        urls
    }

    /// Built-in seed used when no config file is present.
    pub(crate) fn default_seed() -> Self {
        let mut sources = HashMap::new();
        for (cat, urls) in [
            (
                "hyderabad",
                vec![
                    "https://www.thehindu.com/news/cities/Hyderabad/feeder/default.rss",
                    "https://telanganatoday.com/hyderabad/feed",
                ],
            ),
            (
                "telangana",
                vec![
                    "https://telanganatoday.com/telangana/feed",
                    "https://www.thehansindia.com/rss/telangana",
                ],
            ),
            (
                "india",
                vec![
                    "https://feeds.feedburner.com/ndtvnews-india-news",
                    "https://www.thehindu.com/news/national/feeder/default.rss",
                ],
            ),
            (
                "international",
                vec!["https://feeds.bbci.co.uk/news/world/rss.xml"],
            ),
            (
                "sports",
                vec!["https://feeds.bbci.co.uk/sport/rss.xml"],
            ),
            (
                "gadgets",
                vec!["https://www.gadgets360.com/rss/news"],
            ),
            (
                "health",
                vec!["https://www.thehindu.com/sci-tech/health/feeder/default.rss"],
            ),
        ] {
            sources.insert(
                cat.to_string(),
                urls.into_iter().map(str::to_string).collect(),
            );
        }
        Self { sources }
    }
}
