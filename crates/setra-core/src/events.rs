use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::refresh::RefreshState;

/// Every auto-refresh state change produces an Event.
/// The CLI prints them; the driver reacts to `RefreshCycleCompleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    RefreshStarted {
        interval_ms: u64,
        at: DateTime<Utc>,
    },
    RefreshPaused {
        /// Progress frozen at the moment of pausing (0.0 ..= 1.0).
        progress: f64,
        at: DateTime<Utc>,
    },
    /// Resuming always begins a fresh cycle.
    RefreshResumed {
        at: DateTime<Utc>,
    },
    RefreshCycleCompleted {
        /// 1-based count of cycles completed by this coordinator.
        cycle: u64,
        at: DateTime<Utc>,
    },
    RefreshStopped {
        at: DateTime<Utc>,
    },
    RefreshSnapshot {
        state: RefreshState,
        progress: f64,
        interval_ms: u64,
        cycle_started_at: Option<DateTime<Utc>>,
        remaining_ms: Option<u64>,
        cycles_completed: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::RefreshStarted { at, .. }
            | Event::RefreshPaused { at, .. }
            | Event::RefreshResumed { at }
            | Event::RefreshCycleCompleted { at, .. }
            | Event::RefreshStopped { at }
            | Event::RefreshSnapshot { at, .. } => *at,
        }
    }
}

/// Epoch milliseconds to a UTC timestamp, clamping out-of-range values to the epoch.
pub(crate) fn datetime_from_ms(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_default()
}
