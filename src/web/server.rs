//! Router assembly and shared request state.

use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

use super::{admin, pages::NextChip, portal, public};
use crate::calendar;
use crate::logging::SharedLogBuffer;
use crate::rating::RatingProvider;
use crate::settings::Settings;
use crate::store::{
    SharedCarCatalog, SharedDriverStore, SharedEventStore, SharedNewsStore, SharedSiteConfig,
    SiteConfig,
};
use crate::web::auth::SharedSessionStore;

/// Shared state for all web handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub drivers: SharedDriverStore,
    pub events: SharedEventStore,
    pub news: SharedNewsStore,
    pub site: SharedSiteConfig,
    pub cars: SharedCarCatalog,
    pub rating: Arc<dyn RatingProvider>,
    pub sessions: SharedSessionStore,
    pub log_buffer: SharedLogBuffer,
}

impl AppState {
    /// Snapshot of the site configuration for rendering
    pub async fn site_config(&self) -> SiteConfig {
        self.site.read().await.config.clone()
    }

    /// Current/next event chip shown in the public layout on every page
    pub async fn next_chip(&self) -> Option<NextChip> {
        let events = self.events.read().await;
        let current = calendar::resolve_current_or_next(events.all(), calendar::local_now())?;
        Some(NextChip {
            id: current.event.id.clone(),
            title: current.event.title.clone(),
            date: current.event.date.clone(),
            is_live: current.is_live,
        })
    }
}

/// Notice passed along on redirects
#[derive(Debug, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

/// Assemble the full site router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(public::home))
        .route("/team", get(public::team))
        .route("/driver/:id", get(public::driver_detail))
        .route("/calendar", get(public::calendar_page))
        .route("/event/:id", get(public::event_detail))
        .route("/event-info", get(public::event_info_redirect))
        .route("/news", get(public::news_feed))
        .nest("/admin", admin::router())
        .nest("/portal", portal::router())
        .nest_service(
            "/uploads",
            ServeDir::new(state.settings.upload_dir.clone()),
        )
        .with_state(state)
}

/// Bind and serve until shutdown
pub async fn start_web_server(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Site listening on http://{}", addr);
    info!("Admin back office at http://{}/admin", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
