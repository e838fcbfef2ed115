// Broadcast bus - tokio broadcast channel behind the RefreshBus trait
use crate::application::refresh_bus::{DashboardEvent, RefreshBus};
use futures::stream::Stream;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct BroadcastBus {
    sender: broadcast::Sender<DashboardEvent>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    /// Subscribe now and yield events until every sender is gone. A slow
    /// subscriber skips the refreshes it missed instead of failing.
    pub fn events(&self) -> impl Stream<Item = DashboardEvent> + Send + use<> {
        let mut rx = self.sender.subscribe();

        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Refresh subscriber lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

impl RefreshBus for BroadcastBus {
    fn publish(&self, event: DashboardEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for {:?}", event);
        }
    }
}
