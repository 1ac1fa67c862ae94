//! Session auth for the admin back office and driver portal.
//!
//! Every request resolves to an explicit principal (admin or a specific
//! driver) from a session cookie; handlers receive the principal instead of
//! reading ambient global state. Sessions live in memory and expire after
//! 24 hours.

use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Who is making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Admin,
    /// Driver portal login, carries the driver id
    Driver(String),
}

#[derive(Debug, Clone)]
struct Session {
    principal: Principal,
    expires_at: u64,
}

impl Session {
    fn new(principal: Principal) -> Self {
        Self {
            principal,
            expires_at: now_secs() + 86400,
        }
    }

    fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

const COOKIE_NAME: &str = "pitwall_session";

/// Session store - maps session tokens to principals
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session for a principal and return the token
    pub async fn login(&self, principal: Principal) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(token.clone(), Session::new(principal));
        token
    }

    /// Resolve the principal for a request, dropping expired sessions
    pub async fn principal(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = session_token(headers)?;
        let sessions = self.sessions.read().await;
        sessions.get(&token).and_then(|s| {
            if s.is_expired() {
                None
            } else {
                Some(s.principal.clone())
            }
        })
    }

    pub async fn logout(&self, headers: &HeaderMap) {
        if let Some(token) = session_token(headers) {
            self.sessions.write().await.remove(&token);
        }
    }

    pub async fn cleanup_expired(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired());
    }
}

pub type SharedSessionStore = Arc<SessionStore>;

pub fn create_session_store() -> SharedSessionStore {
    Arc::new(SessionStore::new())
}

/// Extract the session token from request cookies
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let cookie = cookie.trim();
            cookie
                .strip_prefix(COOKIE_NAME)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|token| token.to_string())
        })
}

/// Cookie that carries a fresh session
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400",
        COOKIE_NAME, token
    )
}

/// Cookie that clears the session
pub fn logout_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", COOKIE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("other=1; {}={}", COOKIE_NAME, token).parse().unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_login_then_resolve_principal() {
        let store = SessionStore::new();
        let token = store.login(Principal::Admin).await;

        let principal = store.principal(&headers_with(&token)).await;
        assert_eq!(principal, Some(Principal::Admin));
    }

    #[tokio::test]
    async fn test_driver_principal_carries_id() {
        let store = SessionStore::new();
        let token = store.login(Principal::Driver("42".to_string())).await;

        match store.principal(&headers_with(&token)).await {
            Some(Principal::Driver(id)) => assert_eq!(id, "42"),
            other => panic!("unexpected principal: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_token_is_anonymous() {
        let store = SessionStore::new();
        assert_eq!(store.principal(&headers_with("nope")).await, None);
        assert_eq!(store.principal(&HeaderMap::new()).await, None);
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let store = SessionStore::new();
        let token = store.login(Principal::Admin).await;
        let headers = headers_with(&token);

        store.logout(&headers).await;
        assert_eq!(store.principal(&headers).await, None);
    }
}
