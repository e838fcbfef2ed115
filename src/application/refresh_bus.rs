// Publish/subscribe collaborator used to announce refresh ticks

/// Events broadcast on behalf of a dashboard document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Zero-payload signal: every subscriber should reload its data.
    Refresh,
}

pub trait RefreshBus: Send + Sync {
    /// Broadcast an event to all current subscribers. Must not block.
    fn publish(&self, event: DashboardEvent);
}
