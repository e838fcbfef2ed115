// Refresh scheduler - a single self-rearming timer per dashboard document
use crate::application::refresh_bus::{DashboardEvent, RefreshBus};
use crate::domain::interval::{IntervalError, parse_interval};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Cannot schedule refresh: {0}")]
    UnparseableInterval(#[from] IntervalError),

    #[error("Cannot schedule refresh outside a tokio runtime")]
    NoRuntime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled { interval: String, period: Duration },
}

/// Shared with the timer task. A tick publishes only while its ticket equals
/// `generation`; cancelling bumps the generation under the same lock.
#[derive(Debug, Default)]
struct TimerSlot {
    generation: u64,
}

/// Owns at most one pending timer. Each tick publishes
/// [`DashboardEvent::Refresh`] and re-arms with the same period until the
/// scheduler is cancelled, restarted or dropped.
pub struct RefreshScheduler {
    bus: Arc<dyn RefreshBus>,
    slot: Arc<Mutex<TimerSlot>>,
    timer: Option<JoinHandle<()>>,
    state: SchedulerState,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("state", &self.state)
            .field("has_timer", &self.timer.is_some())
            .finish()
    }
}

impl RefreshScheduler {
    pub fn new(bus: Arc<dyn RefreshBus>) -> Self {
        Self {
            bus,
            slot: Arc::new(Mutex::new(TimerSlot::default())),
            timer: None,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self.state, SchedulerState::Scheduled { .. })
    }

    /// Replace any pending timer with one ticking every `interval`.
    ///
    /// On error nothing is armed and the scheduler ends up idle, even if it
    /// was running before.
    pub fn start(&mut self, interval: &str) -> Result<Duration, SchedulerError> {
        let armed = parse_interval(interval)
            .map_err(SchedulerError::from)
            .and_then(|period| {
                Handle::try_current()
                    .map(|runtime| (period, runtime))
                    .map_err(|_| SchedulerError::NoRuntime)
            });

        let (period, runtime) = match armed {
            Ok(armed) => armed,
            Err(e) => {
                tracing::warn!("Refusing to schedule refresh '{}': {}", interval, e);
                self.cancel();
                return Err(e);
            }
        };

        self.rearm(&runtime, period);
        self.state = SchedulerState::Scheduled {
            interval: interval.to_string(),
            period,
        };
        tracing::info!("Refresh scheduled every {:?} ({})", period, interval);

        Ok(period)
    }

    /// `None` or an empty interval cancels; anything else behaves as [`start`](Self::start).
    pub fn set_interval(&mut self, interval: Option<&str>) -> Result<Option<Duration>, SchedulerError> {
        match interval.filter(|interval| !interval.is_empty()) {
            Some(interval) => self.start(interval).map(Some),
            None => {
                self.cancel();
                Ok(None)
            }
        }
    }

    /// Stop the pending timer, if any. Safe to call repeatedly. Once this
    /// returns no further tick from the old timer is published.
    pub fn cancel(&mut self) {
        self.disarm();

        if let SchedulerState::Scheduled { interval, .. } =
            std::mem::replace(&mut self.state, SchedulerState::Idle)
        {
            tracing::info!("Refresh cancelled ({})", interval);
        }
    }

    /// Cancel-then-arm. The old ticket is invalidated before the new timer
    /// exists, so two timers are never live at once.
    fn rearm(&mut self, runtime: &Handle, period: Duration) {
        self.disarm();
        self.arm(runtime, period);
    }

    fn arm(&mut self, runtime: &Handle, period: Duration) {
        let ticket = lock(&self.slot).generation;
        let slot = Arc::clone(&self.slot);
        let bus = Arc::clone(&self.bus);

        self.timer = Some(runtime.spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if !fire(&slot, ticket, bus.as_ref()) {
                    break;
                }
            }
        }));
    }

    fn disarm(&mut self) {
        lock(&self.slot).generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Publish one refresh if `ticket` is still current. Returns whether the
/// timer should re-arm.
fn fire(slot: &Mutex<TimerSlot>, ticket: u64, bus: &dyn RefreshBus) -> bool {
    let slot = lock(slot);
    if slot.generation != ticket {
        return false;
    }

    tracing::debug!("Refresh tick (timer {})", ticket);
    bus.publish(DashboardEvent::Refresh);
    true
}

fn lock(slot: &Mutex<TimerSlot>) -> MutexGuard<'_, TimerSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
