//! Flat-file JSON persistence.
//!
//! One pretty-printed JSON document per collection (drivers, events, news,
//! site config, car catalog). Every mutation loads the whole collection,
//! changes it in memory and rewrites the file. A missing file is an empty
//! collection; an unparsable file is logged and treated as empty so a
//! corrupt document never takes a page down.
//!
//! Concurrent writers are last-write-wins. The shared `RwLock` wrappers only
//! serialize file access within this process so two saves cannot interleave
//! into a half-written document.

pub mod cars;
pub(crate) mod de;
pub mod drivers;
pub mod events;
pub mod news;
pub mod site;

pub use cars::{create_shared_car_catalog, CarCatalog, SharedCarCatalog};
pub use drivers::{create_shared_driver_store, Driver, DriverStore, SharedDriverStore};
pub use events::{create_shared_event_store, Event, EventStore, SharedEventStore};
pub use news::{create_shared_news_store, normalize_category, NewsItem, NewsStore, SharedNewsStore};
pub use site::{
    create_shared_site_config, Hero, NavLink, SharedSiteConfig, SiteConfig, SiteConfigStore,
};

use crate::error::{Result, SiteError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// Generate a fresh entity id from the current unix time.
///
/// Matches the persisted id format of existing records. Two creations within
/// the same second collide; accepted for a small team site.
pub fn fresh_id() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Read a JSON document, degrading to the default value.
///
/// Missing file => default. Unparsable file => warn and default, so callers
/// never fail on a corrupt collection.
pub(crate) async fn read_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!("Corrupt collection {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Write a JSON document atomically (temp file + rename).
pub(crate) async fn write_pretty<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    let content = serde_json::to_string_pretty(value)?;

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &content)
        .await
        .map_err(|e| SiteError::StoreSave {
            path: path.display().to_string(),
            source: e,
        })?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| SiteError::StoreSave {
            path: path.display().to_string(),
            source: e,
        })?;

    Ok(())
}

/// Id equality contract: compare as strings on both sides.
///
/// Legacy data may hold the same id as an integer in one place and a string
/// in another, so `123 == "123"` must hold everywhere ids are compared.
pub fn ids_equal(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}
