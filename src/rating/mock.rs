//! Static mock provider, the last rung of the provider chain.
//!
//! Returns fixed demo data so every page renders without credentials or
//! network access.

use async_trait::async_trait;

use super::{CareerStat, RatingProvider, RecentRace};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RatingProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn career_stats(&self, _cust_id: i64) -> Result<Vec<CareerStat>> {
        Ok(vec![
            CareerStat {
                category_id: 2,
                category: "Sports Car".to_string(),
                irating: 1350,
                license_class: "C".to_string(),
                safety_rating: 3.45,
            },
            CareerStat {
                category_id: 1,
                category: "Formula".to_string(),
                irating: 1280,
                license_class: "D".to_string(),
                safety_rating: 2.10,
            },
            CareerStat {
                category_id: 3,
                category: "Oval".to_string(),
                irating: 1100,
                license_class: "R".to_string(),
                safety_rating: 2.50,
            },
        ])
    }

    async fn recent_races(&self, _cust_id: i64) -> Result<Vec<RecentRace>> {
        let races = serde_json::json!([
            {
                "session_start_time": "2023-10-27T18:00:00Z",
                "series_name": "Global Mazda MX-5 Cup",
                "track": {"track_name": "Lime Rock Park"},
                "start_position": 5,
                "finish_position": 2,
                "incidents": 0,
                "strength_of_field": 1450
            },
            {
                "session_start_time": "2023-10-26T20:30:00Z",
                "series_name": "Ferrari GT3 Challenge",
                "track": {"track_name": "Spa Francorchamps"},
                "start_position": 12,
                "finish_position": 10,
                "incidents": 4,
                "strength_of_field": 1600
            }
        ]);
        Ok(serde_json::from_value(races)?)
    }
}
