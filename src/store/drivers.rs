//! Driver roster collection.
//!
//! Persisted as a JSON array in `drivers.json`. The oldest files were a bare
//! array of iRacing customer ids; those are upgraded to full records at the
//! load boundary and written back in upgraded form on the next save.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::{ids_equal, read_or_default, write_pretty};
use crate::error::Result;

/// A team driver as stored on disk.
///
/// Everything except `id` and `name` is optional; rating fields are only
/// written by the rating sync and default to absent for manual-only drivers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Driver {
    #[serde(deserialize_with = "super::de::lenient_string")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    /// iRacing customer id linking to the rating source; absent for
    /// manual-only drivers.
    #[serde(
        default,
        deserialize_with = "super::de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub iracing_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(
        default,
        deserialize_with = "super::de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitch: Option<String>,

    /// Free-text rig/hardware description shown on the profile page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rig: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Uploaded by the driver, awaiting admin moderation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_image_url: Option<String>,

    /// Password for the driver self-service portal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    // Rating fields, refreshed by the admin-triggered sync only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir_sports: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sr_sports: Option<String>,

    // Present in older files; carried through load/save, never written here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir_formula: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sr_formula: Option<String>,
}

impl Driver {
    /// Build the placeholder record a legacy bare-integer entry upgrades to
    pub fn from_legacy_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            iracing_id: Some(id.to_string()),
            name: format!("Driver {}", id),
            ..Default::default()
        }
    }

    /// iRacing customer id as a number, if the driver has a usable one
    pub fn numeric_iracing_id(&self) -> Option<i64> {
        self.iracing_id.as_deref()?.trim().parse().ok()
    }
}

/// The full driver collection plus its file location
#[derive(Debug)]
pub struct DriverStore {
    path: PathBuf,
    drivers: Vec<Driver>,
}

impl DriverStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            drivers: Vec::new(),
        }
    }

    /// Load the collection, upgrading legacy bare-id entries.
    ///
    /// A file that cannot be parsed at all yields an empty roster (logged,
    /// never fatal). The upgraded form is persisted by the next save since
    /// every save rewrites the whole collection.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let raw: Vec<serde_json::Value> = read_or_default(&path).await;
        let drivers = upgrade_records(raw);
        info!("Loaded {} drivers from {}", drivers.len(), path.display());
        Self { path, drivers }
    }

    pub async fn save(&self) -> Result<()> {
        write_pretty(&self.path, &self.drivers).await
    }

    pub fn all(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Locate a driver by string-normalized id
    pub fn find(&self, id: &str) -> Option<&Driver> {
        self.drivers.iter().find(|d| ids_equal(&d.id, id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Driver> {
        self.drivers.iter_mut().find(|d| ids_equal(&d.id, id))
    }

    /// Replace the record with the same id, or append a new one
    pub fn upsert(&mut self, driver: Driver) {
        match self.drivers.iter_mut().find(|d| ids_equal(&d.id, &driver.id)) {
            Some(existing) => *existing = driver,
            None => self.drivers.push(driver),
        }
    }

    /// Remove by id; returns whether a record was dropped.
    ///
    /// Event lineups referencing the driver are left untouched (no
    /// referential integrity on delete).
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.drivers.len();
        self.drivers.retain(|d| !ids_equal(&d.id, id));
        self.drivers.len() != before
    }

    /// All drivers sorted by display name, for roster navigation
    pub fn sorted_by_name(&self) -> Vec<&Driver> {
        let mut all: Vec<&Driver> = self.drivers.iter().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

/// Upgrade raw JSON records into `Driver` structs.
///
/// Bare numbers (and numeric strings) become placeholder records with
/// `iracing_id = id`; objects parse as-is. Running this over already
/// upgraded records is a no-op, so the migration is idempotent. A record
/// that is neither is dropped with a warning rather than failing the load.
fn upgrade_records(raw: Vec<serde_json::Value>) -> Vec<Driver> {
    let mut drivers = Vec::with_capacity(raw.len());
    for value in raw {
        match value {
            serde_json::Value::Number(n) => drivers.push(Driver::from_legacy_id(&n.to_string())),
            serde_json::Value::String(s) if s.trim().parse::<i64>().is_ok() => {
                drivers.push(Driver::from_legacy_id(s.trim()))
            }
            serde_json::Value::Object(_) => match serde_json::from_value::<Driver>(value) {
                Ok(d) => drivers.push(d),
                Err(e) => warn!("Skipping unreadable driver record: {}", e),
            },
            other => warn!("Skipping unrecognized driver entry: {}", other),
        }
    }
    drivers
}

pub type SharedDriverStore = Arc<tokio::sync::RwLock<DriverStore>>;

pub fn create_shared_driver_store(store: DriverStore) -> SharedDriverStore {
    Arc::new(tokio::sync::RwLock::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(raw: serde_json::Value) -> DriverStore {
        let records: Vec<serde_json::Value> = serde_json::from_value(raw).unwrap();
        DriverStore {
            path: PathBuf::from("unused.json"),
            drivers: upgrade_records(records),
        }
    }

    #[test]
    fn test_legacy_int_list_upgrade() {
        let store = store_with(serde_json::json!([42, 716131]));

        assert_eq!(store.len(), 2);
        let d = store.find("42").unwrap();
        assert_eq!(d.id, "42");
        assert_eq!(d.iracing_id.as_deref(), Some("42"));
        assert_eq!(d.name, "Driver 42");
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let once = upgrade_records(vec![serde_json::json!(42)]);
        let twice = upgrade_records(vec![serde_json::to_value(&once[0]).unwrap()]);

        assert_eq!(once.len(), 1);
        assert_eq!(twice.len(), 1);
        assert_eq!(
            serde_json::to_value(&once[0]).unwrap(),
            serde_json::to_value(&twice[0]).unwrap()
        );
    }

    #[test]
    fn test_find_tolerates_numeric_storage() {
        let store = store_with(serde_json::json!([{"id": 123, "name": "Alex"}]));

        // Same record whether the caller holds "123" from a URL or a
        // formatted integer from an old cross-reference.
        assert!(store.find("123").is_some());
        assert_eq!(store.find(&123.to_string()).unwrap().name, "Alex");
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut store = store_with(serde_json::json!([{"id": "1", "name": "Old"}]));
        store.upsert(Driver {
            id: "1".to_string(),
            name: "New".to_string(),
            ..Default::default()
        });

        assert_eq!(store.len(), 1);
        assert_eq!(store.find("1").unwrap().name, "New");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = store_with(serde_json::json!([{"id": "1", "name": "A"}]));
        assert!(!store.remove("2"));
        assert!(store.remove("1"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_load_save_roundtrip_persists_upgrade() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drivers.json");
        tokio::fs::write(&path, "[42, 43]").await.unwrap();

        let store = DriverStore::load(&path).await;
        store.save().await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let reparsed: Vec<serde_json::Value> = serde_json::from_str(&written).unwrap();
        assert!(reparsed.iter().all(|v| v.is_object()));
        assert_eq!(reparsed[0]["id"], "42");
    }

    #[test]
    fn test_legacy_formula_fields_survive_rewrite() {
        let store = store_with(serde_json::json!([
            {"id": "1", "name": "Alex", "ir_formula": 1280, "sr_formula": "D 2.1"}
        ]));

        let reserialized = serde_json::to_value(store.find("1").unwrap()).unwrap();
        assert_eq!(reserialized["ir_formula"], 1280);
        assert_eq!(reserialized["sr_formula"], "D 2.1");
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drivers.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = DriverStore::load(&path).await;
        assert!(store.is_empty());
    }
}
