// Console rendering of dashboards and refresh ticks
use crate::application::dashboard_service::DashboardDocument;
use crate::application::refresh_bus::DashboardEvent;
use futures::stream::{Stream, StreamExt};

/// Pretty JSON of the normalized document.
pub fn render_document(document: &DashboardDocument) -> anyhow::Result<String> {
    let value = document.to_json()?;
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn summary_line(document: &DashboardDocument) -> String {
    let model = document.model();
    format!(
        "'{}' (schema v{}, {} rows, {} panels, refresh {})",
        model.title,
        model.version,
        model.rows.len(),
        model.panel_count(),
        document.refresh().unwrap_or("off")
    )
}

/// Log every refresh until the stream ends. Returns the number of ticks seen.
pub async fn watch_refreshes<S>(events: S, title: &str) -> usize
where
    S: Stream<Item = DashboardEvent>,
{
    futures::pin_mut!(events);

    let mut ticks = 0;
    while let Some(event) = events.next().await {
        match event {
            DashboardEvent::Refresh => {
                ticks += 1;
                tracing::info!(
                    "[{}] Refresh #{} for '{}'",
                    chrono::Local::now().format("%H:%M:%S"),
                    ticks,
                    title
                );
            }
        }
    }

    ticks
}
