mod calendar;
mod error;
mod logging;
mod rating;
mod roster;
mod settings;
mod store;
mod sync;
mod web;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::logging::{create_log_buffer, LogCaptureLayer};
use crate::settings::Settings;
use crate::store::{
    create_shared_car_catalog, create_shared_driver_store, create_shared_event_store,
    create_shared_news_store, create_shared_site_config, CarCatalog, DriverStore, EventStore,
    NewsStore, SiteConfigStore,
};
use crate::web::{create_session_store, start_web_server, AppState};

/// Team community site: public pages, admin back office and driver portal
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// HTTP port (overrides the PORT environment variable)
    #[arg(long)]
    port: Option<u16>,

    /// Data directory holding the JSON collections (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut settings = Settings::from_env();
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        settings.upload_dir = data_dir.join("uploads");
        settings.data_dir = data_dir;
    }

    let log_buffer = create_log_buffer(1000);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(LogCaptureLayer::new(log_buffer.clone()))
        .init();

    info!("Data directory: {}", settings.data_dir.display());
    tokio::fs::create_dir_all(&settings.data_dir).await?;
    tokio::fs::create_dir_all(&settings.upload_dir).await?;

    let drivers = DriverStore::load(settings.data_dir.join("drivers.json")).await;
    let events = EventStore::load(settings.data_dir.join("events.json")).await;
    let news = NewsStore::load(settings.data_dir.join("news.json")).await;
    let site = SiteConfigStore::load(settings.data_dir.join("site_config.json")).await;
    let cars = CarCatalog::load(settings.data_dir.join("cars.json")).await;

    let rating: Arc<dyn rating::RatingProvider> = Arc::from(rating::connect(&settings).await);

    let state = AppState {
        settings: Arc::new(settings),
        drivers: create_shared_driver_store(drivers),
        events: create_shared_event_store(events),
        news: create_shared_news_store(news),
        site: create_shared_site_config(site),
        cars: create_shared_car_catalog(cars),
        rating,
        sessions: create_session_store(),
        log_buffer,
    };

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            sessions.cleanup_expired().await;
        }
    });

    start_web_server(state).await
}
