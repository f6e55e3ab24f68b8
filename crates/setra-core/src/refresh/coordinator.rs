//! Auto-refresh coordinator.
//!
//! A wall-clock state machine with no internal thread: the caller (or
//! [`AutoRefresh`](super::AutoRefresh)) is responsible for calling `tick()`
//! when a cycle may be due.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped --start--> Running --toggle--> Paused --toggle--> Running (cycle restarts at 0)
//! Running | Paused --stop--> Stopped (persisted state cleared)
//! ```
//!
//! Progress is never stored as a counter while running. It is recomputed from
//! the cycle start timestamp, which is persisted together with the pause flag
//! so a fresh coordinator over the same store picks up where the last one was.
//!
//! Only one coordinator may drive a store at a time. A live driver keeps an
//! owner heartbeat in the store; [`RefreshCoordinator::is_driven`] reports it
//! so other processes can stay read-only.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::ValidationError;
use crate::events::{datetime_from_ms, Event};
use crate::storage::{keys, KvStore};

/// A heartbeat older than this no longer marks the store as owned.
pub const OWNER_LEASE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshState {
    Stopped,
    Running,
    Paused,
}

pub struct RefreshCoordinator {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    interval_ms: u64,
    state: RefreshState,
    /// Epoch ms at which the current cycle began.
    cycle_started_ms: u64,
    /// Progress captured when pausing; only meaningful while paused.
    frozen_progress: f64,
    cycles_completed: u64,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("interval_ms", &self.interval_ms)
            .field("state", &self.state)
            .field("cycle_started_ms", &self.cycle_started_ms)
            .field("frozen_progress", &self.frozen_progress)
            .field("cycles_completed", &self.cycles_completed)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Build a coordinator, restoring pause flag and cycle start from `store`.
    ///
    /// With nothing persisted the coordinator starts `Running` with a fresh
    /// cycle. Unreadable storage is logged and treated as empty.
    ///
    /// # Errors
    /// Returns an error if `interval` is zero.
    pub fn new(
        interval: Duration,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ValidationError> {
        let interval_ms = interval.as_millis() as u64;
        if interval_ms == 0 {
            return Err(ValidationError::InvalidValue {
                field: "interval".into(),
                message: "must be at least one millisecond".into(),
            });
        }

        let now = clock.now_ms();
        let mut coordinator = Self {
            store,
            clock,
            interval_ms,
            state: RefreshState::Running,
            cycle_started_ms: now,
            frozen_progress: 0.0,
            cycles_completed: 0,
        };
        coordinator.restore(now);
        Ok(coordinator)
    }

    fn restore(&mut self, now: u64) {
        let paused = self.read(keys::REFRESH_PAUSED).as_deref() == Some("true");
        let started = self
            .read(keys::REFRESH_START_TIME)
            .and_then(|v| v.trim().parse::<u64>().ok())
            // a start time in the future means the clock moved backwards
            .filter(|&ms| ms <= now);
        let saved_progress = self
            .read(keys::REFRESH_PROGRESS)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 1.0));

        self.cycle_started_ms = started.unwrap_or(now);
        if paused {
            self.state = RefreshState::Paused;
            self.frozen_progress = saved_progress
                .unwrap_or_else(|| self.elapsed_fraction(now));
        } else {
            self.state = RefreshState::Running;
        }

        debug!(
            state = ?self.state,
            cycle_started_ms = self.cycle_started_ms,
            restored = started.is_some(),
            "auto-refresh coordinator restored"
        );
        self.persist();
    }

    /// Whether a live driver holds `store`, judged by its heartbeat at `now_ms`.
    pub fn is_driven(store: &dyn KvStore, now_ms: u64) -> bool {
        match store.get(keys::REFRESH_OWNER) {
            Ok(Some(raw)) => raw
                .trim()
                .parse::<u64>()
                .is_ok_and(|beat| beat.abs_diff(now_ms) < OWNER_LEASE.as_millis() as u64),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "auto-refresh owner unreadable");
                false
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn is_paused(&self) -> bool {
        self.state == RefreshState::Paused
    }

    pub fn cycle_started_ms(&self) -> u64 {
        self.cycle_started_ms
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// 0.0 ..= 1.0 progress through the current cycle.
    ///
    /// Frozen while paused, zero while stopped.
    pub fn progress(&self) -> f64 {
        match self.state {
            RefreshState::Running => self.elapsed_fraction(self.clock.now_ms()),
            RefreshState::Paused => self.frozen_progress,
            RefreshState::Stopped => 0.0,
        }
    }

    /// Time left until the current cycle is due. `None` unless running.
    pub fn remaining(&self) -> Option<Duration> {
        if self.state != RefreshState::Running {
            return None;
        }
        let elapsed = self.clock.now_ms().saturating_sub(self.cycle_started_ms);
        Some(Duration::from_millis(self.interval_ms.saturating_sub(elapsed)))
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let started = (self.state != RefreshState::Stopped)
            .then(|| datetime_from_ms(self.cycle_started_ms));
        Event::RefreshSnapshot {
            state: self.state,
            progress: self.progress(),
            interval_ms: self.interval_ms,
            cycle_started_at: started,
            remaining_ms: self.remaining().map(|d| d.as_millis() as u64),
            cycles_completed: self.cycles_completed,
            at: self.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin cycling from a stopped coordinator. No-op otherwise.
    pub fn start(&mut self) -> Option<Event> {
        if self.state != RefreshState::Stopped {
            return None;
        }
        self.state = RefreshState::Running;
        self.begin_cycle();
        Some(Event::RefreshStarted {
            interval_ms: self.interval_ms,
            at: self.now(),
        })
    }

    /// Freeze progress, or restart the cycle at zero when already paused.
    ///
    /// Pausing does not complete an overdue cycle: progress freezes at 1.0
    /// and resuming starts over. Drivers call [`tick`](Self::tick) first so
    /// the due refresh still runs.
    pub fn toggle_pause(&mut self) -> Option<Event> {
        match self.state {
            RefreshState::Running => {
                self.frozen_progress = self.progress();
                self.state = RefreshState::Paused;
                self.persist();
                Some(Event::RefreshPaused {
                    progress: self.frozen_progress,
                    at: self.now(),
                })
            }
            RefreshState::Paused => {
                self.state = RefreshState::Running;
                self.begin_cycle();
                Some(Event::RefreshResumed { at: self.now() })
            }
            RefreshState::Stopped => None,
        }
    }

    /// Stop cycling and remove every persisted entry.
    pub fn stop(&mut self) -> Option<Event> {
        if self.state == RefreshState::Stopped {
            return None;
        }
        self.state = RefreshState::Stopped;
        self.frozen_progress = 0.0;
        for key in [
            keys::REFRESH_PAUSED,
            keys::REFRESH_PROGRESS,
            keys::REFRESH_START_TIME,
        ] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to clear auto-refresh state");
            }
        }
        Some(Event::RefreshStopped { at: self.now() })
    }

    /// Call when a cycle may be due. Returns `Some(Event::RefreshCycleCompleted)`
    /// and starts the next cycle once the interval has elapsed.
    ///
    /// A late tick completes one cycle only; the next cycle starts at the tick.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state != RefreshState::Running {
            return None;
        }
        let now = self.clock.now_ms();
        if now.saturating_sub(self.cycle_started_ms) < self.interval_ms {
            return None;
        }
        self.cycles_completed += 1;
        self.cycle_started_ms = now;
        self.persist();
        Some(Event::RefreshCycleCompleted {
            cycle: self.cycles_completed,
            at: datetime_from_ms(now),
        })
    }

    /// Tick, and run `action` if a cycle completed.
    ///
    /// A failing action is logged; it never stops the coordinator.
    pub fn run_due<F, E>(&mut self, action: F) -> Option<Event>
    where
        F: FnOnce() -> Result<(), E>,
        E: Display,
    {
        let event = self.tick()?;
        if let Err(e) = action() {
            warn!(cycles = self.cycles_completed, error = %e, "refresh action failed; continuing");
        }
        Some(event)
    }

    /// Mark the store as driven by this coordinator until [`OWNER_LEASE`] passes.
    pub(crate) fn heartbeat(&self) {
        let now = self.clock.now_ms().to_string();
        if let Err(e) = self.store.set(keys::REFRESH_OWNER, &now) {
            warn!(error = %e, "failed to record auto-refresh owner");
        }
    }

    pub(crate) fn release(&self) {
        if let Err(e) = self.store.remove(keys::REFRESH_OWNER) {
            warn!(error = %e, "failed to release auto-refresh owner");
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_cycle(&mut self) {
        self.cycle_started_ms = self.clock.now_ms();
        self.frozen_progress = 0.0;
        self.persist();
    }

    fn elapsed_fraction(&self, now: u64) -> f64 {
        let elapsed = now.saturating_sub(self.cycle_started_ms) as f64;
        (elapsed / self.interval_ms as f64).clamp(0.0, 1.0)
    }

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        datetime_from_ms(self.clock.now_ms())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "auto-refresh storage unreadable; using defaults");
                None
            }
        }
    }

    /// Write pause flag, cycle start and progress. Failures degrade to
    /// in-memory state.
    fn persist(&self) {
        let entries = [
            (keys::REFRESH_PAUSED, self.is_paused().to_string()),
            (keys::REFRESH_START_TIME, self.cycle_started_ms.to_string()),
            (keys::REFRESH_PROGRESS, self.progress().to_string()),
        ];
        for (key, value) in entries {
            if let Err(e) = self.store.set(key, &value) {
                warn!(key, error = %e, "failed to persist auto-refresh state");
            }
        }
    }
}
