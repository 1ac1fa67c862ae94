//! iRacing Data API client.
//!
//! Hand-rolled HTTP client for the members-ng endpoints. Login posts the
//! documented credential hash (base64 of sha256(password + lowercase
//! email))) to `/auth` and relies on the cookie store for the session.
//! Data endpoints usually respond with a `{"link": ...}` indirection to a
//! presigned payload; `fetch` follows that one hop.

use async_trait::async_trait;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{CareerStat, RatingProvider, RecentRace};
use crate::error::{Result, SiteError};

const BASE_URL: &str = "https://members-ng.iracing.com";
// The service rejects the default reqwest agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct IracingClient {
    http: reqwest::Client,
    base_url: String,
}

/// Credential hash the auth endpoint expects
fn encode_credentials(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(email.to_lowercase().as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

impl IracingClient {
    /// Log in and return a ready client, or an auth error
    pub async fn connect(email: &str, password: &str) -> Result<Self> {
        Self::connect_to(BASE_URL, email, password).await
    }

    async fn connect_to(base_url: &str, email: &str, password: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;

        let response = http
            .post(format!("{}/auth", base_url))
            .json(&serde_json::json!({
                "email": email,
                "password": encode_credentials(email, password),
            }))
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        if !status.is_success() {
            return Err(SiteError::RatingAuth {
                message: format!("auth endpoint returned {}", status),
            });
        }

        // authcode 0 means rejected credentials even with HTTP 200
        if body.get("authcode").and_then(|v| v.as_i64()) == Some(0) {
            let message = body
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("credentials rejected")
                .to_string();
            return Err(SiteError::RatingAuth { message });
        }

        debug!("iRacing login ok for {}", email);
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// GET a data endpoint, following the `link` indirection if present
    async fn fetch(&self, path: &str, cust_id: i64) -> Result<serde_json::Value> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("cust_id", cust_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiteError::RatingRequest {
                message: format!("{} returned {}", path, status),
            });
        }

        let body: serde_json::Value = response.json().await?;
        if let Some(link) = body.get("link").and_then(|v| v.as_str()) {
            let linked = self.http.get(link).send().await?;
            return Ok(linked.json().await?);
        }
        Ok(body)
    }
}

#[async_trait]
impl RatingProvider for IracingClient {
    fn name(&self) -> &'static str {
        "iracing-data-api"
    }

    async fn career_stats(&self, cust_id: i64) -> Result<Vec<CareerStat>> {
        let body = self.fetch("/data/stats/member_career", cust_id).await?;
        let stats = body.get("stats").cloned().unwrap_or(serde_json::json!([]));
        serde_json::from_value(stats).map_err(|e| SiteError::RatingRequest {
            message: format!("unexpected member_career payload: {}", e),
        })
    }

    async fn recent_races(&self, cust_id: i64) -> Result<Vec<RecentRace>> {
        let body = self
            .fetch("/data/stats/member_recent_races", cust_id)
            .await?;
        let races = body.get("races").cloned().unwrap_or(serde_json::json!([]));
        serde_json::from_value(races).map_err(|e| SiteError::RatingRequest {
            message: format!("unexpected member_recent_races payload: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_hash_is_stable_and_lowercases_email() {
        let a = encode_credentials("Driver@Example.com", "hunter2");
        let b = encode_credentials("driver@example.com", "hunter2");
        assert_eq!(a, b);
        // 32 bytes of sha256, base64 with padding
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn test_recent_race_payload_shape() {
        let race: RecentRace = serde_json::from_value(serde_json::json!({
            "session_start_time": "2023-10-27T18:00:00Z",
            "series_name": "Global Mazda MX-5 Cup",
            "track": {"track_name": "Lime Rock Park"},
            "start_position": 5,
            "finish_position": 2,
            "incidents": 0,
            "strength_of_field": 1450
        }))
        .unwrap();

        assert_eq!(race.track_name(), "Lime Rock Park");
        assert_eq!(race.position_delta(), 3);
        assert_eq!(race.formatted_date(), "27.10.2023 18:00");
    }
}
