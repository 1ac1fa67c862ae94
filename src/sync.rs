//! Rating sync.
//!
//! Admin-triggered batch refresh of driver rating fields from the external
//! rating source. Per-driver failures are collected and skipped, never
//! aborting the batch; there is no retry or backoff.
//!
//! The batch runs in three phases so a slow or hung rating source never
//! stalls page renders: snapshot the sync targets under a read lock, fetch
//! every driver's stats with no lock held, then take the write lock once to
//! apply the results and save.

use tracing::{info, warn};

use crate::rating::{CareerStat, RatingProvider};
use crate::store::{Driver, SharedDriverStore};

/// Category preference for the displayed rating: sports car first, then
/// formula. First match wins; categories are never merged.
const CATEGORY_PREFERENCE: [i64; 2] = [2, 1];

/// How many per-driver error messages the report keeps
const ERROR_SAMPLE_LIMIT: usize = 5;

/// Outcome of one sync run
#[derive(Debug)]
pub struct SyncReport {
    /// Which provider served the batch
    pub provider: &'static str,
    /// Drivers whose rating fields were refreshed
    pub updated: usize,
    /// Drivers without a resolvable numeric external id (not errors)
    pub skipped: usize,
    /// Bounded sample of per-driver error messages
    pub errors: Vec<String>,
    /// Total error count, including those not sampled
    pub error_count: usize,
}

impl SyncReport {
    fn new(provider: &'static str) -> Self {
        Self {
            provider,
            updated: 0,
            skipped: 0,
            errors: Vec::new(),
            error_count: 0,
        }
    }

    fn record_error(&mut self, message: String) {
        self.error_count += 1;
        if self.errors.len() < ERROR_SAMPLE_LIMIT {
            self.errors.push(message);
        }
    }

    /// One-line summary for the admin notice
    pub fn summary(&self) -> String {
        let mut s = format!(
            "{} driver(s) updated via {} ({} skipped)",
            self.updated, self.provider, self.skipped
        );
        if self.error_count > 0 {
            s.push_str(&format!(
                "; {} error(s): {}",
                self.error_count,
                self.errors.join(" | ")
            ));
        }
        s
    }
}

/// Pick the preferred category from a stats response
pub fn select_career_stat(stats: &[CareerStat]) -> Option<&CareerStat> {
    CATEGORY_PREFERENCE
        .iter()
        .find_map(|id| stats.iter().find(|s| s.category_id == *id))
}

/// Overwrite the rating display fields only; everything else is untouched
fn apply_stat(driver: &mut Driver, stat: &CareerStat) {
    driver.ir_sports = Some(stat.irating);
    driver.sr_sports = Some(format!("{} {}", stat.license_class, stat.safety_rating));
}

/// Refresh rating fields for every driver with a numeric iRacing id.
///
/// The store lock is never held across a provider call, so concurrent
/// readers are unaffected by source latency. The collection is saved once
/// at the end if at least one driver changed; a failed save is reported as
/// an error, not a panic.
pub async fn sync_ratings(store: &SharedDriverStore, provider: &dyn RatingProvider) -> SyncReport {
    let mut report = SyncReport::new(provider.name());

    let targets: Vec<(String, i64)> = {
        let drivers = store.read().await;
        drivers
            .all()
            .iter()
            .filter_map(|d| match d.numeric_iracing_id() {
                Some(cust_id) => Some((d.id.clone(), cust_id)),
                None => {
                    report.skipped += 1;
                    None
                }
            })
            .collect()
    };

    let mut results: Vec<(String, CareerStat)> = Vec::new();
    for (driver_id, cust_id) in targets {
        match provider.career_stats(cust_id).await {
            Ok(stats) => match select_career_stat(&stats) {
                Some(stat) => results.push((driver_id, stat.clone())),
                None => report.skipped += 1,
            },
            Err(e) => {
                warn!("Rating fetch failed for driver {}: {}", driver_id, e);
                report.record_error(format!("driver {}: {}", driver_id, e));
            }
        }
    }

    if !results.is_empty() {
        let mut drivers = store.write().await;
        for (driver_id, stat) in &results {
            // Deleted while the fetch was in flight: drop the result
            if let Some(driver) = drivers.find_mut(driver_id) {
                apply_stat(driver, stat);
                report.updated += 1;
            }
        }

        if report.updated > 0 {
            if let Err(e) = drivers.save().await {
                warn!("Could not persist synced ratings: {}", e);
                report.record_error(format!("save failed: {}", e));
            }
        }
    }

    info!("Rating sync finished: {}", report.summary());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SiteError};
    use crate::rating::RecentRace;
    use crate::store::{create_shared_driver_store, DriverStore};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    struct FixedProvider(Vec<CareerStat>);

    #[async_trait]
    impl RatingProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn career_stats(&self, _cust_id: i64) -> Result<Vec<CareerStat>> {
            Ok(self.0.clone())
        }
        async fn recent_races(&self, _cust_id: i64) -> Result<Vec<RecentRace>> {
            Ok(Vec::new())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl RatingProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn career_stats(&self, cust_id: i64) -> Result<Vec<CareerStat>> {
            Err(SiteError::RatingRequest {
                message: format!("no data for {}", cust_id),
            })
        }
        async fn recent_races(&self, _cust_id: i64) -> Result<Vec<RecentRace>> {
            Ok(Vec::new())
        }
    }

    /// Signals when a fetch starts and blocks until the test releases it
    struct StalledProvider {
        entered: Arc<Notify>,
        release: Arc<Semaphore>,
    }

    #[async_trait]
    impl RatingProvider for StalledProvider {
        fn name(&self) -> &'static str {
            "stalled"
        }
        async fn career_stats(&self, _cust_id: i64) -> Result<Vec<CareerStat>> {
            self.entered.notify_one();
            let _permit = self.release.acquire().await.unwrap();
            Ok(vec![stat(2, 1500)])
        }
        async fn recent_races(&self, _cust_id: i64) -> Result<Vec<RecentRace>> {
            Ok(Vec::new())
        }
    }

    fn stat(category_id: i64, irating: i64) -> CareerStat {
        CareerStat {
            category_id,
            category: String::new(),
            irating,
            license_class: "B".to_string(),
            safety_rating: 3.0,
        }
    }

    fn driver(id: &str, iracing_id: Option<&str>) -> Driver {
        Driver {
            id: id.to_string(),
            name: format!("Driver {}", id),
            iracing_id: iracing_id.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    async fn store_with(drivers: Vec<Driver>) -> (tempfile::TempDir, SharedDriverStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DriverStore::new(dir.path().join("drivers.json"));
        for d in drivers {
            store.upsert(d);
        }
        (dir, create_shared_driver_store(store))
    }

    #[test]
    fn test_category_preference_sports_car_first() {
        let stats = vec![stat(1, 1280), stat(2, 1350)];
        assert_eq!(select_career_stat(&stats).unwrap().irating, 1350);

        let formula_only = vec![stat(1, 1280), stat(3, 999)];
        assert_eq!(select_career_stat(&formula_only).unwrap().irating, 1280);

        let oval_only = vec![stat(3, 999)];
        assert!(select_career_stat(&oval_only).is_none());
    }

    #[tokio::test]
    async fn test_sync_updates_only_rating_fields() {
        let mut d = driver("1", Some("716131"));
        d.nickname = Some("Apex".to_string());
        let (_dir, store) = store_with(vec![d]).await;

        let report = sync_ratings(&store, &FixedProvider(vec![stat(2, 1500)])).await;

        assert_eq!(report.updated, 1);
        assert_eq!(report.error_count, 0);
        let drivers = store.read().await;
        let synced = drivers.find("1").unwrap();
        assert_eq!(synced.ir_sports, Some(1500));
        assert_eq!(synced.sr_sports.as_deref(), Some("B 3"));
        assert_eq!(synced.nickname.as_deref(), Some("Apex"), "other fields untouched");
        assert_eq!(synced.name, "Driver 1");
    }

    #[tokio::test]
    async fn test_manual_driver_skipped_without_error() {
        let (_dir, store) =
            store_with(vec![driver("1", None), driver("2", Some("abc"))]).await;

        let report = sync_ratings(&store, &FixedProvider(vec![stat(2, 1500)])).await;

        assert_eq!(report.updated, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.error_count, 0);
        assert_eq!(store.read().await.len(), 2, "sync never removes drivers");
    }

    #[tokio::test]
    async fn test_failures_bounded_and_batch_continues() {
        let drivers: Vec<Driver> = (1..=8)
            .map(|i| driver(&i.to_string(), Some(&format!("{}00", i))))
            .collect();
        let (_dir, store) = store_with(drivers).await;

        let report = sync_ratings(&store, &FailingProvider).await;

        assert_eq!(report.updated, 0);
        assert_eq!(report.error_count, 8);
        assert_eq!(report.errors.len(), 5, "bounded sample");
        assert_eq!(store.read().await.len(), 8);
    }

    #[tokio::test]
    async fn test_nothing_saved_when_nothing_updated() {
        let (dir, store) = store_with(vec![driver("1", None)]).await;
        let _ = sync_ratings(&store, &FixedProvider(vec![stat(2, 1500)])).await;

        // No save means the file was never created
        assert!(!dir.path().join("drivers.json").exists());
    }

    #[tokio::test]
    async fn test_store_readable_while_fetch_in_flight() {
        let (_dir, store) = store_with(vec![driver("1", Some("716131"))]).await;
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Semaphore::new(0));
        let provider = StalledProvider {
            entered: entered.clone(),
            release: release.clone(),
        };

        let sync_store = store.clone();
        let batch = tokio::spawn(async move { sync_ratings(&sync_store, &provider).await });

        // Wait until the provider call is in flight, then a page render
        // must still get the store without queueing behind the sync.
        entered.notified().await;
        let readers = tokio::time::timeout(Duration::from_secs(1), store.read())
            .await
            .expect("store read blocked during rating fetch");
        assert_eq!(readers.len(), 1);
        drop(readers);

        release.add_permits(1);
        let report = batch.await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(store.read().await.find("1").unwrap().ir_sports, Some(1500));
    }
}
