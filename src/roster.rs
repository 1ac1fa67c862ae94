//! Driver roster views.
//!
//! `enrich` turns a stored driver record into the display-ready structure
//! every driver-facing page consumes. It is a pure function: rating fields
//! fall back to a `-` placeholder, the stored record is never touched.
//! Live rating data only enters the stored record through the explicit
//! admin-triggered sync, never on page render.

use crate::store::Driver;

const PLACEHOLDER: &str = "-";

/// Display-ready driver, decoupled from the persisted shape
#[derive(Debug, Clone)]
pub struct DriverView {
    pub id: String,
    pub name: String,
    pub nickname: Option<String>,
    pub role: Option<String>,
    pub number: Option<String>,
    pub nationality: Option<String>,
    pub twitch: Option<String>,
    pub rig: Option<String>,
    pub image_url: Option<String>,
    /// Sports-car iRating / safety rating, `-` when never synced.
    /// Only the pair the sync writes is surfaced here.
    pub ir_sports: String,
    pub sr_sports: String,
}

/// Build the display view for one stored record
pub fn enrich(driver: &Driver) -> DriverView {
    DriverView {
        id: driver.id.clone(),
        name: driver.name.clone(),
        nickname: driver.nickname.clone(),
        role: driver.role.clone(),
        number: driver.number.clone(),
        nationality: driver.nationality.clone(),
        twitch: driver.twitch.clone(),
        rig: driver.rig.clone(),
        image_url: driver.image_url.clone(),
        ir_sports: driver
            .ir_sports
            .map(|v| v.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        sr_sports: driver
            .sr_sports
            .clone()
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
    }
}

/// Enriched views for the whole roster, in store order
pub fn enriched_roster(drivers: &[Driver]) -> Vec<DriverView> {
    drivers.iter().map(enrich).collect()
}

/// Enriched views for an event lineup, in lineup order.
///
/// Ids are compared as strings on both sides; lineup entries referencing a
/// deleted driver are silently dropped.
pub fn lineup_views(drivers: &[Driver], lineup: &[String]) -> Vec<DriverView> {
    lineup
        .iter()
        .filter_map(|id| {
            drivers
                .iter()
                .find(|d| crate::store::ids_equal(&d.id, id))
                .map(enrich)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_defaults_rating_placeholders() {
        let driver = Driver {
            id: "1".to_string(),
            name: "Alex".to_string(),
            ..Default::default()
        };

        let view = enrich(&driver);
        assert_eq!(view.ir_sports, "-");
        assert_eq!(view.sr_sports, "-");
    }

    #[test]
    fn test_enrich_passes_synced_ratings_through() {
        let driver = Driver {
            id: "1".to_string(),
            ir_sports: Some(1350),
            sr_sports: Some("C 3.45".to_string()),
            ..Default::default()
        };

        let view = enrich(&driver);
        assert_eq!(view.ir_sports, "1350");
        assert_eq!(view.sr_sports, "C 3.45");
    }

    #[test]
    fn test_enrich_does_not_mutate_record() {
        let driver = Driver {
            id: "1".to_string(),
            ..Default::default()
        };
        let before = serde_json::to_value(&driver).unwrap();
        let _ = enrich(&driver);
        assert_eq!(before, serde_json::to_value(&driver).unwrap());
    }

    #[test]
    fn test_lineup_drops_dangling_references() {
        let drivers = vec![Driver {
            id: "42".to_string(),
            name: "Alex".to_string(),
            ..Default::default()
        }];
        let lineup = vec!["42".to_string(), "999".to_string()];

        let views = lineup_views(&drivers, &lineup);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].name, "Alex");
    }
}
