//! News feed data model.
//!
//! Articles are ephemeral: fetched per session, keyed by URL, never
//! persisted. The feed endpoint returns one list per provider.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fixed set of feed providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsSource {
    #[serde(rename = "Google News")]
    GoogleNews,
    #[serde(rename = "Anthropic")]
    Anthropic,
    #[serde(rename = "Openai")]
    Openai,
}

impl std::fmt::Display for NewsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NewsSource::GoogleNews => "Google News",
            NewsSource::Anthropic => "Anthropic",
            NewsSource::Openai => "OpenAI",
        };
        f.write_str(name)
    }
}

/// A single news article. The URL is the identity used for dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub description: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub subcategory_id: Option<String>,
    #[serde(rename = "news_from")]
    pub source: NewsSource,
}

/// Response payload of the feed endpoint: one article list per provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodayNews {
    #[serde(default)]
    pub google: Vec<Article>,
    #[serde(default)]
    pub anthropic: Vec<Article>,
    #[serde(default)]
    pub openai: Vec<Article>,
}

impl TodayNews {
    pub fn is_empty(&self) -> bool {
        self.google.is_empty() && self.anthropic.is_empty() && self.openai.is_empty()
    }

    pub fn total(&self) -> usize {
        self.google.len() + self.anthropic.len() + self.openai.len()
    }

    /// All articles across providers, deduplicated by URL (first
    /// occurrence wins, provider order google/anthropic/openai).
    pub fn articles(&self) -> Vec<&Article> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.google
            .iter()
            .chain(self.anthropic.iter())
            .chain(self.openai.iter())
            .filter(|article| seen.insert(article.url.as_str()))
            .collect()
    }
}

/// What the feed view should show. Fetch failure is the error path and
/// never reaches this classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// The user has not picked any topics yet
    NoCategories,
    /// Topics are set but nothing matched today
    NoContent,
    /// There are articles to show
    Ready,
}

/// Classify a successful fetch for display.
///
/// An empty feed with categories set is "no content today", never "no
/// categories": the two empty states carry different calls to action.
pub fn classify_feed(has_categories: bool, news: &TodayNews) -> FeedStatus {
    if !has_categories {
        FeedStatus::NoCategories
    } else if news.is_empty() {
        FeedStatus::NoContent
    } else {
        FeedStatus::Ready
    }
}
