//! Car catalog, read-only.
//!
//! `cars.json` maps a car class to its models and feeds the admin event
//! form. Edited by hand, never written by the site.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::read_or_default;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarCatalog(pub BTreeMap<String, Vec<String>>);

impl CarCatalog {
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        read_or_default(&path.into()).await
    }

    pub fn classes(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

pub type SharedCarCatalog = Arc<CarCatalog>;

pub fn create_shared_car_catalog(catalog: CarCatalog) -> SharedCarCatalog {
    Arc::new(catalog)
}
