//! Site configuration singleton.
//!
//! One mutable JSON object in `site_config.json`: hero section, ordered
//! navigation and social links. No history, no versioning.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use super::{read_or_default, write_pretty};
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hero {
    #[serde(default)]
    pub badge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavLink {
    pub text: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Socials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub hero: Hero,
    #[serde(default = "default_navigation")]
    pub navigation: Vec<NavLink>,
    #[serde(default)]
    pub socials: Socials,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            hero: Hero::default(),
            navigation: default_navigation(),
            socials: Socials::default(),
        }
    }
}

fn default_navigation() -> Vec<NavLink> {
    [
        ("Home", "/"),
        ("Team", "/team"),
        ("Calendar", "/calendar"),
        ("News", "/news"),
    ]
    .into_iter()
    .map(|(text, link)| NavLink {
        text: text.to_string(),
        link: link.to_string(),
    })
    .collect()
}

/// The singleton document plus its file location
#[derive(Debug)]
pub struct SiteConfigStore {
    path: PathBuf,
    pub config: SiteConfig,
}

impl SiteConfigStore {
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = read_or_default(&path).await;
        Self { path, config }
    }

    pub async fn save(&self) -> Result<()> {
        write_pretty(&self.path, &self.config).await
    }
}

pub type SharedSiteConfig = Arc<tokio::sync::RwLock<SiteConfigStore>>;

pub fn create_shared_site_config(store: SiteConfigStore) -> SharedSiteConfig {
    Arc::new(tokio::sync::RwLock::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_navigation_present() {
        let config = SiteConfig::default();
        assert_eq!(config.navigation.len(), 4);
        assert_eq!(config.navigation[0].link, "/");
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: SiteConfig =
            serde_json::from_value(serde_json::json!({"hero": {"badge": "SEASON 5"}})).unwrap();
        assert_eq!(config.hero.badge, "SEASON 5");
        assert!(!config.navigation.is_empty());
    }
}
