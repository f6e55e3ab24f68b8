//! Tokio driver for [`RefreshCoordinator`].
//!
//! One spawned task per driver sleeps until the current cycle is due, ticks
//! the coordinator and spawns the refresh action without awaiting it. Pause,
//! resume and stop wake the task so it re-reads the coordinator state. While
//! alive the task renews the store's owner heartbeat, so other processes can
//! see the store is being driven.
//!
//! The task is aborted on [`AutoRefresh::stop`] and when the handle is
//! dropped, so no refresh can fire after the owner is gone.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::coordinator::{RefreshCoordinator, RefreshState};
use crate::clock::Clock;
use crate::events::Event;
use crate::storage::KvStore;

/// Upper bound on a single sleep; also the owner heartbeat period.
const HEARTBEAT_EVERY: Duration = Duration::from_secs(1);

type RefreshFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type RefreshAction = Box<dyn Fn(u64) -> RefreshFuture + Send + Sync>;

struct Shared {
    coordinator: Mutex<RefreshCoordinator>,
    wake: Notify,
    action: RefreshAction,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RefreshCoordinator> {
        // a panic while holding the lock cannot leave the coordinator half-updated
        self.coordinator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn the refresh for a completed cycle without awaiting it.
    fn dispatch(&self, fired: Option<Event>) {
        if let Some(Event::RefreshCycleCompleted { cycle, .. }) = fired {
            debug!(cycle, "auto-refresh cycle completed");
            tokio::spawn((self.action)(cycle));
        }
    }
}

/// Running auto-refresh loop. Owns its timer task.
pub struct AutoRefresh {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    /// Start cycling `action` every `interval`, restoring state from `store`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if `interval` is zero.
    pub fn start<F, Fut, E>(
        action: F,
        interval: Duration,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, crate::error::ValidationError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let coordinator = RefreshCoordinator::new(interval, store, clock)?;
        Ok(Self::spawn(coordinator, action))
    }

    /// Drive an existing coordinator. A stopped coordinator is started first;
    /// a paused one stays paused.
    pub fn spawn<F, Fut, E>(mut coordinator: RefreshCoordinator, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        coordinator.start();
        coordinator.heartbeat();
        info!(
            interval_ms = coordinator.interval().as_millis() as u64,
            state = ?coordinator.state(),
            "auto-refresh started"
        );
        let action: RefreshAction = Box::new(move |cycle: u64| -> RefreshFuture {
            let refresh = action();
            Box::pin(async move {
                if let Err(e) = refresh.await {
                    warn!(cycle, error = %e, "refresh action failed; continuing");
                }
            })
        });
        let shared = Arc::new(Shared {
            coordinator: Mutex::new(coordinator),
            wake: Notify::new(),
            action,
        });
        let task = tokio::spawn(run_loop(Arc::clone(&shared)));
        Self {
            shared,
            task: Some(task),
        }
    }

    pub fn state(&self) -> RefreshState {
        self.shared.lock().state()
    }

    pub fn progress(&self) -> f64 {
        self.shared.lock().progress()
    }

    pub fn snapshot(&self) -> Event {
        self.shared.lock().snapshot()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.shared.lock().cycles_completed()
    }

    /// Pause or resume. A cycle that is already due completes first and its
    /// refresh is dispatched, so pausing never swallows a refresh.
    pub fn toggle_pause(&self) -> Option<Event> {
        let (due, event) = {
            let mut coordinator = self.shared.lock();
            let due = coordinator.tick();
            (due, coordinator.toggle_pause())
        };
        self.shared.dispatch(due);
        self.shared.wake.notify_one();
        event
    }

    /// Stop cycling, clear persisted state and cancel the timer task.
    pub fn stop(&mut self) -> Option<Event> {
        let event = {
            let mut coordinator = self.shared.lock();
            let event = coordinator.stop();
            coordinator.release();
            event
        };
        if let Some(task) = self.task.take() {
            task.abort();
        }
        event
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.shared.lock().release();
        }
    }
}

async fn run_loop(shared: Arc<Shared>) {
    loop {
        let wait = {
            let coordinator = shared.lock();
            let wait = match coordinator.state() {
                RefreshState::Stopped => break,
                RefreshState::Paused => HEARTBEAT_EVERY,
                RefreshState::Running => coordinator
                    .remaining()
                    .unwrap_or_default()
                    .min(HEARTBEAT_EVERY),
            };
            coordinator.heartbeat();
            wait
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                let fired = shared.lock().tick();
                shared.dispatch(fired);
            }
            _ = shared.wake.notified() => {}
        }
    }
    debug!("auto-refresh loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, TokioClock};
    use crate::storage::{keys, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_millis(5_000);

    fn counting_action(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn() -> std::future::Ready<Result<(), String>> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        settle().await;
    }

    fn start(counter: &Arc<AtomicUsize>, store: &MemoryStore) -> AutoRefresh {
        AutoRefresh::start(
            counting_action(counter),
            INTERVAL,
            Arc::new(store.clone()),
            Arc::new(TokioClock::anchored_at(1_700_000_000_000)),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let _refresh = start(&counter, &MemoryStore::new());

        sleep_ms(4_990).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        sleep_ms(20).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        sleep_ms(10_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_scenario() {
        let counter = Arc::new(AtomicUsize::new(0));
        let refresh = start(&counter, &MemoryStore::new());

        sleep_ms(2_000).await;
        assert!(matches!(refresh.toggle_pause(), Some(Event::RefreshPaused { .. })));
        assert!((refresh.progress() - 0.4).abs() < 1e-9);

        sleep_ms(7_000).await;
        assert!((refresh.progress() - 0.4).abs() < 1e-9);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert!(matches!(refresh.toggle_pause(), Some(Event::RefreshResumed { .. })));
        assert_eq!(refresh.progress(), 0.0);

        sleep_ms(4_990).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        sleep_ms(20).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_timer() {
        let counter = Arc::new(AtomicUsize::new(0));
        let store = MemoryStore::new();
        let mut refresh = start(&counter, &store);

        sleep_ms(1_000).await;
        assert!(refresh.stop().is_some());
        assert!(store.is_empty());

        sleep_ms(60_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(refresh.state(), RefreshState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_timer() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let _refresh = start(&counter, &MemoryStore::new());
            sleep_ms(1_000).await;
        }
        sleep_ms(60_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_action_keeps_cycling() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&attempts);
        let _refresh = AutoRefresh::start(
            move || {
                seen.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("503 Service Unavailable") }
            },
            INTERVAL,
            Arc::new(MemoryStore::new()),
            Arc::new(TokioClock::new()),
        )
        .unwrap();

        sleep_ms(15_010).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_action_does_not_delay_next_cycle() {
        let started = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&started);
        let _refresh = AutoRefresh::start(
            move || {
                seen.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<(), String>(())
                }
            },
            INTERVAL,
            Arc::new(MemoryStore::new()),
            Arc::new(TokioClock::new()),
        )
        .unwrap();

        sleep_ms(10_010).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restored_paused_state_never_fires() {
        let store = MemoryStore::new();
        store.set(crate::storage::keys::REFRESH_PAUSED, "true").unwrap();
        store.set(crate::storage::keys::REFRESH_PROGRESS, "0.75").unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let refresh = start(&counter, &store);

        assert_eq!(refresh.state(), RefreshState::Paused);
        assert_eq!(refresh.progress(), 0.75);
        sleep_ms(30_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pausing_an_overdue_cycle_still_refreshes() {
        let clock = ManualClock::new(0);
        let counter = Arc::new(AtomicUsize::new(0));
        let coordinator = RefreshCoordinator::new(
            INTERVAL,
            Arc::new(MemoryStore::new()),
            Arc::new(clock.clone()),
        )
        .unwrap();
        let refresh = AutoRefresh::spawn(coordinator, counting_action(&counter));

        // wall clock passes the deadline before the timer task gets to tick
        clock.advance(6_000);
        match refresh.toggle_pause() {
            Some(Event::RefreshPaused { progress, .. }) => assert_eq!(progress, 0.0),
            other => panic!("expected pause, got {other:?}"),
        }
        settle().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(refresh.cycles_completed(), 1);
        assert_eq!(refresh.state(), RefreshState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn live_driver_holds_the_store() {
        let clock = TokioClock::anchored_at(1_700_000_000_000);
        let store = MemoryStore::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let refresh = AutoRefresh::start(
            counting_action(&counter),
            INTERVAL,
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
        )
        .unwrap();

        assert!(RefreshCoordinator::is_driven(&store, clock.now_ms()));
        sleep_ms(30_000).await;
        assert!(RefreshCoordinator::is_driven(&store, clock.now_ms()));

        drop(refresh);
        assert!(!RefreshCoordinator::is_driven(&store, clock.now_ms()));
        assert_eq!(store.get(keys::REFRESH_OWNER).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_heartbeat_is_not_an_owner() {
        let store = MemoryStore::new();
        store.set(keys::REFRESH_OWNER, "1700000000000").unwrap();
        assert!(RefreshCoordinator::is_driven(&store, 1_700_000_002_000));
        assert!(!RefreshCoordinator::is_driven(&store, 1_700_000_010_000));
        store.set(keys::REFRESH_OWNER, "garbage").unwrap();
        assert!(!RefreshCoordinator::is_driven(&store, 1_700_000_000_000));
    }

    #[tokio::test(start_paused = true)]
    async fn second_coordinator_sees_the_driven_store() {
        let clock = TokioClock::anchored_at(1_700_000_000_000);
        let store = MemoryStore::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let refresh = AutoRefresh::start(
            counting_action(&counter),
            INTERVAL,
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
        )
        .unwrap();
        sleep_ms(2_000).await;

        // a second process must stay read-only and ask the owner instead
        assert!(RefreshCoordinator::is_driven(&store, clock.now_ms()));
        assert!(matches!(refresh.toggle_pause(), Some(Event::RefreshPaused { .. })));
        sleep_ms(10_000).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(store.get(keys::REFRESH_PAUSED).unwrap().as_deref(), Some("true"));
    }
}
