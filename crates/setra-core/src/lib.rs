//! # SETRA Core Library
//!
//! Client-side coordination logic for the SETRA support console. The backend
//! owns all business data; this crate decides when to refresh it and who may
//! see which page.
//!
//! ## Architecture
//!
//! - **Auto-refresh**: a wall-clock state machine ([`RefreshCoordinator`])
//!   with persisted pause/progress state, driven on tokio by [`AutoRefresh`]
//! - **Access control**: an ordered role-destination policy and a route gate
//!   that redirects at most once per session resolution
//! - **Session**: bearer token lifecycle and the resolved user
//! - **Collaborators**: REST client, key-value storage, TOML configuration and
//!   transcript export
//!
//! ## Key Components
//!
//! - [`RefreshCoordinator`] / [`AutoRefresh`]: polling coordinator
//! - [`AccessGate`] / [`AccessPolicy`]: access control gate
//! - [`SessionHolder`]: identity source read by both
//! - [`ApiClient`]: support backend client
//! - [`Config`]: console configuration

pub mod access;
pub mod api;
pub mod clock;
pub mod error;
pub mod events;
pub mod export;
pub mod refresh;
pub mod session;
pub mod storage;

pub use access::{AccessGate, AccessPolicy, Capability, Decision, Navigator};
pub use api::{ApiClient, QueryCache};
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use error::{
    AccessError, ApiError, ConfigError, CoreError, SessionError, StorageError, ValidationError,
};
pub use events::Event;
pub use refresh::{AutoRefresh, DashboardRefresh, RefreshCoordinator, RefreshState};
pub use session::{Identity, SessionHolder, SessionSnapshot, User};
pub use storage::{Config, FileStore, KvStore, MemoryStore};
