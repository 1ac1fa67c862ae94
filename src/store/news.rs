//! News feed collection.
//!
//! Articles in `news.json`, newest first. An item may cross-link a calendar
//! event via `event_id`; the link is resolved at render time and simply
//! dangles if the event was deleted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{ids_equal, read_or_default, write_pretty};
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(deserialize_with = "super::de::lenient_string")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Free-text category, normalized to upper-case on save
    #[serde(default)]
    pub category: String,

    /// ISO date string, e.g. "2024-06-01"
    #[serde(default)]
    pub date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// External link; takes precedence over `event_id` when both are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Optional reference to an event in the calendar
    #[serde(
        default,
        deserialize_with = "super::de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_id: Option<String>,
}

/// Normalize a category the way the feed displays it
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[derive(Debug)]
pub struct NewsStore {
    path: PathBuf,
    items: Vec<NewsItem>,
}

impl NewsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: Vec::new(),
        }
    }

    /// Load the feed sorted newest first
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut items: Vec<NewsItem> = read_or_default(&path).await;
        items.sort_by(|a, b| b.date.cmp(&a.date));
        info!("Loaded {} news items from {}", items.len(), path.display());
        Self { path, items }
    }

    pub async fn save(&self) -> Result<()> {
        write_pretty(&self.path, &self.items).await
    }

    /// All items, newest first
    pub fn all(&self) -> &[NewsItem] {
        &self.items
    }

    pub fn find(&self, id: &str) -> Option<&NewsItem> {
        self.items.iter().find(|n| ids_equal(&n.id, id))
    }

    pub fn upsert(&mut self, item: NewsItem) {
        match self.items.iter_mut().find(|n| ids_equal(&n.id, &item.id)) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
        self.items.sort_by(|a, b| b.date.cmp(&a.date));
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| !ids_equal(&n.id, id));
        self.items.len() != before
    }
}

pub type SharedNewsStore = Arc<tokio::sync::RwLock<NewsStore>>;

pub fn create_shared_news_store(store: NewsStore) -> SharedNewsStore {
    Arc::new(tokio::sync::RwLock::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_normalization() {
        assert_eq!(normalize_category("  race report "), "RACE REPORT");
        assert_eq!(normalize_category("News"), "NEWS");
    }

    #[test]
    fn test_feed_orders_newest_first() {
        let mut store = NewsStore::new("unused.json");
        store.upsert(NewsItem {
            id: "a".to_string(),
            date: "2024-01-01".to_string(),
            ..Default::default()
        });
        store.upsert(NewsItem {
            id: "b".to_string(),
            date: "2024-06-01".to_string(),
            ..Default::default()
        });

        let ids: Vec<&str> = store.all().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_numeric_event_reference_upgrades() {
        let item: NewsItem = serde_json::from_value(serde_json::json!({
            "id": 5,
            "title": "Podium at Spa",
            "event_id": 1717000000
        }))
        .unwrap();

        assert_eq!(item.id, "5");
        assert_eq!(item.event_id.as_deref(), Some("1717000000"));
    }
}
