// Main entry point - Dependency injection and refresh loop
use std::sync::Arc;

use anyhow::Context;
use dashboard_srv::application::dashboard_service::DashboardService;
use dashboard_srv::infrastructure::broadcast_bus::BroadcastBus;
use dashboard_srv::infrastructure::config::load_app_config;
use dashboard_srv::infrastructure::document_source::load_raw_document;
use dashboard_srv::presentation::console::{render_document, summary_line, watch_refreshes};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let app_config = load_app_config()?;

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&app_config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| app_config.dashboard.path.clone())
        .context("No dashboard given: pass a path or set dashboard.path")?;

    // Wire the refresh bus into the service
    let bus = Arc::new(BroadcastBus::new(app_config.refresh.bus_capacity));
    let service = DashboardService::new(bus.clone());

    let raw = load_raw_document(&path).await?;
    let mut document = service.create_document(&raw);
    tracing::info!("Loaded {}", summary_line(&document));
    println!("{}", render_document(&document)?);

    let interval = app_config
        .refresh
        .interval
        .clone()
        .or_else(|| document.refresh().map(str::to_string));
    let Some(interval) = interval else {
        return Ok(());
    };

    let events = bus.events();
    document
        .set_refresh_interval(Some(interval.as_str()))
        .with_context(|| format!("Cannot refresh '{}'", document.title()))?;

    let title = document.title().to_string();
    tokio::select! {
        ticks = watch_refreshes(events, &title) => {
            tracing::info!("Refresh stream closed after {} ticks", ticks);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    document.cancel_refresh();
    Ok(())
}
