//! External rating source.
//!
//! The iRacing statistics service is an unreliable, optional collaborator.
//! Everything the site consumes goes through the `RatingProvider` trait;
//! `connect` walks a ranked list of providers and returns the first one
//! that initializes, so the site keeps working in demo mode with no
//! credentials configured.

mod iracing;
mod mock;

pub use iracing::IracingClient;
pub use mock::MockProvider;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::settings::Settings;

/// One career-stat category as returned by the source
#[derive(Debug, Clone, Deserialize)]
pub struct CareerStat {
    #[serde(default)]
    pub category_id: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub irating: i64,
    #[serde(default)]
    pub license_class: String,
    #[serde(default)]
    pub safety_rating: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TrackRef {
    #[serde(default)]
    track_name: String,
}

/// One recent race for the driver detail page
#[derive(Debug, Clone, Deserialize)]
pub struct RecentRace {
    #[serde(default)]
    pub session_start_time: String,
    #[serde(default)]
    pub series_name: String,
    #[serde(default)]
    track: TrackRef,
    #[serde(default)]
    pub start_position: i64,
    #[serde(default)]
    pub finish_position: i64,
    #[serde(default)]
    pub incidents: i64,
    #[serde(default)]
    pub strength_of_field: i64,
}

impl RecentRace {
    pub fn track_name(&self) -> &str {
        &self.track.track_name
    }

    /// Positions gained (positive) or lost over the race
    pub fn position_delta(&self) -> i64 {
        self.start_position - self.finish_position
    }

    /// Session start formatted for display, e.g. "27.10.2023 18:00"
    pub fn formatted_date(&self) -> String {
        let raw = self.session_start_time.trim_end_matches('Z');
        match chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            Ok(dt) => dt.format("%d.%m.%Y %H:%M").to_string(),
            Err(_) => self.session_start_time.clone(),
        }
    }
}

/// Capability interface every provider implements
#[async_trait]
pub trait RatingProvider: Send + Sync {
    /// Short name surfaced in sync diagnostics
    fn name(&self) -> &'static str;

    /// Career stats per category for an iRacing customer id
    async fn career_stats(&self, cust_id: i64) -> Result<Vec<CareerStat>>;

    /// Most recent races, newest first
    async fn recent_races(&self, cust_id: i64) -> Result<Vec<RecentRace>>;
}

/// Connect to the best available provider.
///
/// Ranked order: real Data API client (when credentials are configured),
/// then the static mock. A failed login is logged and falls through rather
/// than failing the caller.
pub async fn connect(settings: &Settings) -> Box<dyn RatingProvider> {
    if settings.has_iracing_credentials() {
        let email = settings.iracing_email.as_deref().unwrap_or_default();
        let password = settings.iracing_password.as_deref().unwrap_or_default();

        match IracingClient::connect(email, password).await {
            Ok(client) => {
                info!("Rating provider: {}", client.name());
                return Box::new(client);
            }
            Err(e) => {
                warn!("iRacing login failed, falling back to mock: {}", e);
            }
        }
    } else {
        info!("No iRacing credentials configured, using mock provider");
    }

    Box::new(MockProvider::new())
}
