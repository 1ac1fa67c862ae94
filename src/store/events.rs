//! Event calendar collection.
//!
//! Persisted as a JSON array in `events.json`, kept sorted ascending by the
//! raw `date` string on every load. Date values are ISO-8601 local datetime
//! text without a timezone; the calendar query layer relies on that text
//! being lexicographically comparable, so the sort here must use plain
//! string order too.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{ids_equal, read_or_default, write_pretty};
use crate::error::Result;

/// A scheduled or past race event as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(deserialize_with = "super::de::lenient_string")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub series: String,

    #[serde(default)]
    pub track: String,

    /// ISO-8601 local datetime text, e.g. "2024-06-01T19:00"
    #[serde(default)]
    pub date: String,

    /// Scheduled length in decimal hours, as entered in the admin form
    #[serde(
        default,
        deserialize_with = "super::de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<String>,

    #[serde(default)]
    pub league: String,

    #[serde(default)]
    pub car_class: String,

    #[serde(default)]
    pub car_model: String,

    #[serde(default)]
    pub description: String,

    /// Twitch stream link shown while the event is live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Lineup: driver ids as strings
    #[serde(default, deserialize_with = "super::de::lenient_string_vec")]
    pub drivers: Vec<String>,

    /// Free-text result summary, filled in after the race
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Event {
    /// Scheduled duration in hours; unparsable or missing values default to 1
    pub fn duration_hours(&self) -> f64 {
        self.duration
            .as_deref()
            .and_then(|d| d.trim().parse().ok())
            .unwrap_or(1.0)
    }

    /// Whether the given driver id is in the lineup (string comparison)
    pub fn has_driver(&self, driver_id: &str) -> bool {
        self.drivers.iter().any(|d| ids_equal(d, driver_id))
    }
}

/// The full event collection plus its file location
#[derive(Debug)]
pub struct EventStore {
    path: PathBuf,
    events: Vec<Event>,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            events: Vec::new(),
        }
    }

    /// Load the collection sorted ascending by date (empty dates first)
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut events: Vec<Event> = read_or_default(&path).await;
        events.sort_by(|a, b| a.date.cmp(&b.date));
        info!("Loaded {} events from {}", events.len(), path.display());
        Self { path, events }
    }

    pub async fn save(&self) -> Result<()> {
        write_pretty(&self.path, &self.events).await
    }

    /// All events, ascending by date
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    pub fn find(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| ids_equal(&e.id, id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| ids_equal(&e.id, id))
    }

    /// Replace by id or append, then restore date order
    pub fn upsert(&mut self, event: Event) {
        match self.events.iter_mut().find(|e| ids_equal(&e.id, &event.id)) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
        self.events.sort_by(|a, b| a.date.cmp(&b.date));
    }

    /// Remove by id; news items referencing the event keep their dangling
    /// `event_id` (no referential integrity on delete).
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| !ids_equal(&e.id, id));
        self.events.len() != before
    }
}

pub type SharedEventStore = Arc<tokio::sync::RwLock<EventStore>>;

pub fn create_shared_event_store(store: EventStore) -> SharedEventStore {
    Arc::new(tokio::sync::RwLock::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, date: &str) -> Event {
        Event {
            id: id.to_string(),
            date: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_keeps_date_order() {
        let mut store = EventStore::new("unused.json");
        store.upsert(event("2", "2024-06-01T10:00"));
        store.upsert(event("1", "2024-01-01T10:00"));
        store.upsert(event("3", ""));

        let ids: Vec<&str> = store.all().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"], "empty dates sort first");
    }

    #[test]
    fn test_duration_defaults_to_one_hour() {
        let mut e = event("1", "2024-01-01T10:00");
        assert_eq!(e.duration_hours(), 1.0);

        e.duration = Some("2.5".to_string());
        assert_eq!(e.duration_hours(), 2.5);

        e.duration = Some("soon".to_string());
        assert_eq!(e.duration_hours(), 1.0);
    }

    #[test]
    fn test_lineup_membership_is_string_compared() {
        let e: Event = serde_json::from_value(serde_json::json!({
            "id": "1",
            "drivers": [42, "99"]
        }))
        .unwrap();

        assert!(e.has_driver("42"));
        assert!(e.has_driver("99"));
        assert!(!e.has_driver("7"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::load(dir.path().join("events.json")).await;
        assert!(store.all().is_empty());
    }
}
