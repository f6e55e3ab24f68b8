//! Dashboard auto-refresh: every cycle invalidates the dashboard datasets and
//! refetches them into the shared [`QueryCache`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use super::driver::AutoRefresh;
use crate::api::{ApiClient, QueryCache};
use crate::clock::Clock;
use crate::error::{CoreError, ValidationError};
use crate::storage::KvStore;

pub const METRICS_KEY: &str = "dashboard-metrics";
pub const TIMESERIES_KEY: &str = "dashboard-timeseries";
pub const CONVERSATIONS_KEY: &str = "dashboard-conversations";

/// Datasets invalidated on every dashboard cycle.
pub const DASHBOARD_QUERY_KEYS: [&str; 3] = [METRICS_KEY, TIMESERIES_KEY, CONVERSATIONS_KEY];

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5_000);

pub struct DashboardRefresh {
    api: ApiClient,
    cache: Arc<Mutex<QueryCache>>,
    clock: Arc<dyn Clock>,
    period: String,
}

impl DashboardRefresh {
    pub fn new(api: ApiClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            cache: Arc::new(Mutex::new(QueryCache::new())),
            clock,
            period: "30d".into(),
        }
    }

    /// Timeseries window requested on each refetch (`7d`, `30d`, `90d`).
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = period.into();
        self
    }

    pub fn cache(&self) -> Arc<Mutex<QueryCache>> {
        Arc::clone(&self.cache)
    }

    fn lock_cache(&self) -> MutexGuard<'_, QueryCache> {
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Mark every dashboard dataset stale.
    pub fn invalidate(&self) -> usize {
        let mut cache = self.lock_cache();
        DASHBOARD_QUERY_KEYS
            .iter()
            .map(|key| cache.invalidate(key))
            .sum()
    }

    /// Fetch all dashboard datasets concurrently and store what arrived.
    ///
    /// Datasets that fetched successfully are cached even when another one
    /// failed; the first failure is returned.
    pub async fn refetch(&self) -> Result<(), CoreError> {
        let (metrics, timeseries, conversations) = tokio::join!(
            self.api.dashboard_metrics(),
            self.api.dashboard_timeseries(&self.period),
            self.api.dashboard_conversations(),
        );
        let now = self.clock.now_ms();

        let metrics = metrics.map(serde_json::to_value);
        let timeseries = timeseries.map(serde_json::to_value);
        let conversations = conversations.map(serde_json::to_value);

        let mut first_error: Option<CoreError> = None;
        let mut cache = self.lock_cache();
        for (key, result) in [
            (METRICS_KEY, metrics),
            (TIMESERIES_KEY, timeseries),
            (CONVERSATIONS_KEY, conversations),
        ] {
            match result {
                Ok(Ok(value)) => cache.insert(key, value, now),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e.into());
                }
                Err(e) => {
                    first_error.get_or_insert(e.into());
                }
            }
        }
        drop(cache);

        debug!(failed = first_error.is_some(), "dashboard datasets refetched");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run this dashboard's refresh on an auto-refresh loop.
    ///
    /// # Errors
    /// Returns an error if `interval` is zero.
    pub fn start(
        self: Arc<Self>,
        interval: Duration,
        store: Arc<dyn KvStore>,
    ) -> Result<AutoRefresh, ValidationError> {
        let clock = Arc::clone(&self.clock);
        AutoRefresh::start(
            move || {
                let this = Arc::clone(&self);
                this.invalidate();
                async move { this.refetch().await }
            },
            interval,
            store,
            clock,
        )
    }
}
