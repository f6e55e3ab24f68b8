pub mod access;
pub mod auth;
pub mod chats;
pub mod config;
pub mod metrics;
pub mod refresh;
pub mod users;
pub mod watch;

use std::sync::Arc;

use serde::Serialize;
use setra_core::access::RecordingNavigator;
use setra_core::{
    AccessGate, AccessPolicy, ApiClient, Clock, Config, FileStore, KvStore, MemoryStore,
    SessionHolder, SystemClock,
};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Config, storage and clock shared by every command.
pub struct Console {
    pub config: Config,
    pub store: Arc<dyn KvStore>,
    pub clock: Arc<dyn Clock>,
}

impl Console {
    /// Falls back to in-memory storage when the data dir is unusable.
    pub fn open() -> Self {
        let store: Arc<dyn KvStore> = match FileStore::open() {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "storage unavailable; state will not persist");
                Arc::new(MemoryStore::new())
            }
        };
        Self {
            config: Config::load_or_default(),
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn session(&self) -> Result<SessionHolder, Box<dyn std::error::Error>> {
        let api = ApiClient::from_config(&self.config.api)?;
        Ok(SessionHolder::new(
            Arc::clone(&self.store),
            api,
            Arc::clone(&self.clock),
        ))
    }

    /// Restore the persisted session and run the page guard for `path`.
    ///
    /// Anonymous sessions are refused with the sign-in page as the redirect,
    /// signed-in users without the page's roles with their fallback page.
    pub async fn guarded(
        &self,
        path: &str,
    ) -> Result<SessionHolder, Box<dyn std::error::Error>> {
        let mut session = self.session()?;
        let snapshot = session.restore().await;
        let mut gate = AccessGate::new(Arc::new(AccessPolicy::default()));
        let mut navigator = RecordingNavigator::at(path);
        gate.require_path(path, &snapshot, &mut navigator)?;
        Ok(session)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `a,b , c` -> `["a", "b", "c"]`
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
