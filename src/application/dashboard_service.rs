// Dashboard service - Use case for creating live dashboard documents
use crate::application::refresh_bus::RefreshBus;
use crate::application::refresh_scheduler::{RefreshScheduler, SchedulerError, SchedulerState};
use crate::domain::dashboard::DashboardModel;
use crate::domain::schema;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct DashboardService {
    bus: Arc<dyn RefreshBus>,
}

impl DashboardService {
    pub fn new(bus: Arc<dyn RefreshBus>) -> Self {
        Self { bus }
    }

    /// Build a document from any historical schema version. Never fails.
    pub fn create_document(&self, raw: &Value) -> DashboardDocument {
        let model = schema::normalize(raw);

        tracing::debug!(
            "Created dashboard '{}' ({} rows, {} panels)",
            model.title,
            model.rows.len(),
            model.panel_count()
        );

        DashboardDocument {
            model,
            scheduler: RefreshScheduler::new(self.bus.clone()),
        }
    }
}

/// A normalized dashboard plus its refresh timer. Dropping the document
/// cancels the timer.
#[derive(Debug)]
pub struct DashboardDocument {
    model: DashboardModel,
    scheduler: RefreshScheduler,
}

impl DashboardDocument {
    pub fn model(&self) -> &DashboardModel {
        &self.model
    }

    /// Plain field access. Invariants are not re-checked after edits.
    pub fn model_mut(&mut self) -> &mut DashboardModel {
        &mut self.model
    }

    pub fn title(&self) -> &str {
        &self.model.title
    }

    pub fn version(&self) -> u32 {
        self.model.version
    }

    pub fn refresh(&self) -> Option<&str> {
        self.model.refresh.as_ref().and_then(Value::as_str)
    }

    /// Start, replace or (with `None`/"") stop auto refresh. A rejected
    /// interval stops any running refresh and clears `refresh`.
    pub fn set_refresh_interval(&mut self, interval: Option<&str>) -> Result<Option<Duration>, SchedulerError> {
        let interval = interval.filter(|interval| !interval.is_empty());

        match self.scheduler.set_interval(interval) {
            Ok(period) => {
                self.model.refresh = interval.map(Value::from);
                Ok(period)
            }
            Err(e) => {
                self.model.refresh = None;
                Err(e)
            }
        }
    }

    pub fn cancel_refresh(&mut self) {
        self.scheduler.cancel();
    }

    pub fn is_refreshing(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    pub fn scheduler_state(&self) -> &SchedulerState {
        self.scheduler.state()
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(&self.model)
    }
}
